//! Income classifier serving with sliding-window drift monitoring, plus the
//! batch inference pipeline.
pub mod common;
pub mod data;
pub mod features;
pub mod registry;
pub mod inference;
pub mod evaluation;
pub mod pipeline;
pub mod api;

pub use common::{AppCfg, MonitorCode, MonitorError, MonitorResult};
