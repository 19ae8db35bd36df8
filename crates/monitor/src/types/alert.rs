use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health::HealthClassification;

/// Alert severity as understood by the webhook sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl From<HealthClassification> for AlertLevel {
    fn from(class: HealthClassification) -> Self {
        match class {
            HealthClassification::Healthy => Self::Info,
            HealthClassification::Warning => Self::Warning,
            HealthClassification::Critical => Self::Critical,
        }
    }
}

/// Monitoring alert. Identified only by its content; no dedup key.
///
/// Serializes to the sink's wire format:
/// `{"level","title","message","timestamp"(RFC3339),"metadata"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_wire_format() {
        let alert = Alert::new(AlertLevel::Warning, "Low Health Factor Detected", "hf 1.05")
            .with_metadata("user", "0xabc");
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["level"], "WARNING");
        assert_eq!(json["title"], "Low Health Factor Detected");
        assert_eq!(json["metadata"]["user"], "0xabc");
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "timestamp {ts} is not RFC3339");
    }

    #[test]
    fn test_empty_metadata_omitted() {
        let alert = Alert::new(AlertLevel::Info, "t", "m");
        let json = serde_json::to_value(&alert).unwrap();
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_level_from_classification() {
        assert_eq!(AlertLevel::from(HealthClassification::Critical), AlertLevel::Critical);
        assert_eq!(AlertLevel::from(HealthClassification::Warning), AlertLevel::Warning);
        assert_eq!(AlertLevel::Critical.as_str(), "CRITICAL");
    }
}
