//! Retrieval capabilities consumed by the core.
//!
//! The transport and the query engine behind it are opaque: a backend turns a
//! composed query into rows and lists the values a field can take.

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{AnalyticsQuery, DimensionField, ResultRow};

/// Unified interface for every retrieval backend.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn submit_query(&self, query: &AnalyticsQuery) -> Result<Vec<ResultRow>>;
    async fn fetch_field_options(&self, field: DimensionField) -> Result<Vec<SelectOption>>;
}

/// One entry of a remote option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

impl SelectOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// Option endpoints answer either with bare names (`"iFood"`) or with
// `{id, name}` objects whose id may be numeric.
impl<'de> Deserialize<'de> for SelectOption {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(SelectOption::new(s.clone(), s)),
            other => {
                #[derive(Deserialize)]
                struct Full {
                    id: Value,
                    name: String,
                }
                let full = Full::deserialize(other).map_err(de::Error::custom)?;
                let id = match full.id {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => {
                        return Err(de::Error::custom(format!(
                            "option id must be a string or number, got {other}"
                        )))
                    }
                };
                Ok(SelectOption { id, name: full.name })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_option_from_bare_name() {
        let options: Vec<SelectOption> = serde_json::from_str(r#"["iFood", "Rappi"]"#).unwrap();
        assert_eq!(options[0], SelectOption::new("iFood", "iFood"));
        assert_eq!(options[1].name, "Rappi");
    }

    #[test]
    fn test_select_option_with_numeric_id() {
        let options: Vec<SelectOption> =
            serde_json::from_str(r#"[{"id": 7, "name": "Loja Centro"}]"#).unwrap();
        assert_eq!(options[0], SelectOption::new("7", "Loja Centro"));
    }

    #[test]
    fn test_select_option_rejects_object_id() {
        let parsed: std::result::Result<Vec<SelectOption>, _> =
            serde_json::from_str(r#"[{"id": {"x": 1}, "name": "bad"}]"#);
        assert!(parsed.is_err());
    }
}
