use crate::labels::LabelRecord;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Retention window stamped as `ttl` on event-triggered records (7 days)
pub const RECORD_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Timestamp layout for `timestamp`: ISO-8601, second precision, Zulu
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One persisted label result, keyed by `filename`
///
/// Items are write-once: nothing mutates an item after it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Object key of the analyzed image
    pub filename: String,
    /// Labels in the order the service returned them
    pub labels: Vec<LabelRecord>,
    /// Record creation time
    pub timestamp: String,
    /// Context tag (branch, stage or trigger)
    pub branch: String,
    /// Epoch-seconds expiry, event-triggered records only
    pub ttl: Option<i64>,
}

/// Build an item for `key`, created at `created_at`
pub fn build_item(
    key: &str,
    labels: Vec<LabelRecord>,
    branch: &str,
    created_at: DateTime<Utc>,
) -> Item {
    Item {
        filename: key.to_string(),
        labels,
        timestamp: created_at.format(TIMESTAMP_FORMAT).to_string(),
        branch: branch.to_string(),
        ttl: None,
    }
}

/// Build an item that expires [`RECORD_TTL_SECS`] after `created_at`
pub fn build_expiring_item(
    key: &str,
    labels: Vec<LabelRecord>,
    branch: &str,
    created_at: DateTime<Utc>,
) -> Item {
    Item {
        ttl: Some(created_at.timestamp() + RECORD_TTL_SECS),
        ..build_item(key, labels, branch, created_at)
    }
}

/// Float rendering of an [`Item`], for logs only
#[derive(Debug, Serialize)]
pub struct DisplayItem<'a> {
    filename: &'a str,
    labels: Vec<crate::labels::DisplayLabel>,
    timestamp: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<i64>,
}

impl Item {
    /// Display form with confidences as floats
    pub fn display(&self) -> DisplayItem<'_> {
        DisplayItem {
            filename: &self.filename,
            labels: self.labels.iter().map(LabelRecord::display).collect(),
            timestamp: &self.timestamp,
            branch: &self.branch,
            ttl: self.ttl,
        }
    }

    /// Display form as pretty JSON
    pub fn display_json(&self) -> String {
        serde_json::to_string_pretty(&self.display()).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Encode as DynamoDB attributes
    ///
    /// Confidences are written as `N` from their decimal text, so the stored
    /// number is exactly the rounded value.
    pub fn to_attributes(&self) -> HashMap<String, AttributeValue> {
        let labels = self
            .labels
            .iter()
            .map(|label| {
                AttributeValue::M(HashMap::from([
                    ("Name".to_string(), AttributeValue::S(label.name.clone())),
                    (
                        "Confidence".to_string(),
                        AttributeValue::N(label.confidence.to_string()),
                    ),
                ]))
            })
            .collect();

        let mut attributes = HashMap::from([
            ("filename".to_string(), AttributeValue::S(self.filename.clone())),
            ("labels".to_string(), AttributeValue::L(labels)),
            ("timestamp".to_string(), AttributeValue::S(self.timestamp.clone())),
            ("branch".to_string(), AttributeValue::S(self.branch.clone())),
        ]);

        if let Some(ttl) = self.ttl {
            attributes.insert("ttl".to_string(), AttributeValue::N(ttl.to_string()));
        }

        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn shoe() -> LabelRecord {
        LabelRecord {
            name: "Shoe".to_string(),
            confidence: Decimal::new(9124, 2),
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap()
    }

    #[test]
    fn test_build_item_fields() {
        let item = build_item("rekognition-input/a.jpg", vec![shoe()], "main", created_at());

        assert_eq!(item.filename, "rekognition-input/a.jpg");
        assert_eq!(item.labels, vec![shoe()]);
        assert_eq!(item.timestamp, "2024-01-15T10:30:45Z");
        assert_eq!(item.branch, "main");
        assert_eq!(item.ttl, None);
    }

    #[test]
    fn test_build_item_is_pure() {
        let a = build_item("a.jpg", vec![shoe()], "main", created_at());
        let b = build_item("a.jpg", vec![shoe()], "main", created_at());
        assert_eq!(a, b);
    }

    #[test]
    fn test_timestamp_drops_subseconds() {
        let now = Utc::now();
        let item = build_item("a.jpg", vec![], "main", now);

        assert_eq!(item.timestamp.len(), "YYYY-MM-DDTHH:MM:SSZ".len());
        assert!(item.timestamp.ends_with('Z'));
        assert_eq!(&item.timestamp[4..5], "-");
        assert_eq!(&item.timestamp[10..11], "T");
        let parsed = DateTime::parse_from_rfc3339(&item.timestamp).unwrap();
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn test_expiring_item_ttl() {
        let item = build_expiring_item("a.jpg", vec![], "Lambda", created_at());

        assert_eq!(item.ttl, Some(created_at().timestamp() + 604_800));
        assert!(item.labels.is_empty());
        assert_eq!(item.timestamp, "2024-01-15T10:30:45Z");
    }

    #[test]
    fn test_to_attributes() {
        let item = build_expiring_item("a.jpg", vec![shoe()], "Lambda", created_at());
        let attributes = item.to_attributes();

        assert_eq!(attributes["filename"], AttributeValue::S("a.jpg".to_string()));
        assert_eq!(
            attributes["timestamp"],
            AttributeValue::S("2024-01-15T10:30:45Z".to_string())
        );
        assert_eq!(attributes["branch"], AttributeValue::S("Lambda".to_string()));
        assert_eq!(
            attributes["ttl"],
            AttributeValue::N((created_at().timestamp() + RECORD_TTL_SECS).to_string())
        );

        let AttributeValue::L(labels) = &attributes["labels"] else {
            panic!("labels should be a list");
        };
        let AttributeValue::M(label) = &labels[0] else {
            panic!("label should be a map");
        };
        assert_eq!(label["Name"], AttributeValue::S("Shoe".to_string()));
        assert_eq!(label["Confidence"], AttributeValue::N("91.24".to_string()));
    }

    #[test]
    fn test_batch_item_has_no_ttl_attribute() {
        let item = build_item("a.jpg", vec![], "unknown", created_at());
        let attributes = item.to_attributes();

        assert!(!attributes.contains_key("ttl"));
        assert_eq!(attributes["labels"], AttributeValue::L(vec![]));
    }

    #[test]
    fn test_display_json_uses_floats() {
        let item = build_item("a.jpg", vec![shoe()], "main", created_at());
        let value: serde_json::Value = serde_json::from_str(&item.display_json()).unwrap();

        assert_eq!(value["labels"][0]["Confidence"], serde_json::json!(91.24));
        assert_eq!(value["filename"], "a.jpg");
        assert!(value.get("ttl").is_none());
    }
}
