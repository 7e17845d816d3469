//! Feature references and the feature-store lookup contract.

use std::fmt;
use std::str::FromStr;

use crate::common::error::{MonitorError, MonitorResult};
use crate::data::domain::{Frame, Value};

/// Entity key column the income features are joined on.
pub const ENTITY_KEY: &str = "user_id";
/// Timestamp column carried by historical entity frames.
pub const EVENT_TIMESTAMP: &str = "event_timestamp";

/// `view:field` reference to a single feature.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FeatureRef {
    pub view: String,
    pub field: String,
}

impl FeatureRef {
    pub fn new(view: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            field: field.into(),
        }
    }
}

impl FromStr for FeatureRef {
    type Err = MonitorError;

    fn from_str(raw: &str) -> MonitorResult<Self> {
        let raw = raw.trim();
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(view), Some(field), None) if !view.is_empty() && !field.is_empty() => {
                Ok(Self::new(view, field))
            }
            _ => Err(MonitorError::invalid(format!(
                "feature reference '{raw}' must look like view:field"
            ))),
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.view, self.field)
    }
}

/// The features the income classifier was trained on.
pub fn income_feature_refs() -> Vec<FeatureRef> {
    [
        ("demographic", "Sex"),
        ("demographic", "Native_country"),
        ("demographic", "Race"),
        ("relationship", "Relationship"),
        ("relationship", "Marital-Status"),
        ("occupation", "Workclass"),
        ("occupation", "Education"),
        ("occupation", "Occupation"),
    ]
    .into_iter()
    .map(|(view, field)| FeatureRef::new(view, field))
    .collect()
}

/// Parse a comma separated list such as `demographic:Sex,occupation:Education`.
pub fn parse_feature_list(raw: &str) -> MonitorResult<Vec<FeatureRef>> {
    let refs = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<MonitorResult<Vec<FeatureRef>>>()?;
    if refs.is_empty() {
        return Err(MonitorError::invalid("feature list is empty"));
    }
    Ok(refs)
}

/// Lookup of named features for entity keys.
///
/// Results carry the entity key column first, then one column per requested
/// feature named by its field.
pub trait FeatureStore: Send + Sync {
    fn online_features(&self, refs: &[FeatureRef], entity_keys: &[Value]) -> MonitorResult<Frame>;

    /// Enrich every row of `entities` (which must carry the entity key) with features.
    fn historical_features(&self, entities: &Frame, refs: &[FeatureRef]) -> MonitorResult<Frame>;
}
