//! Feature domain: references, the lookup contract and store initialisation.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{
    income_feature_refs, parse_feature_list, FeatureRef, FeatureStore, ENTITY_KEY,
    EVENT_TIMESTAMP,
};
pub use repo_fs::TableFeatureStore;
