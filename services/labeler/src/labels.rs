use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Fractional digits kept on stored confidences
pub const CONFIDENCE_SCALE: u32 = 2;

/// Raw label detection response, as returned by the labeling service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelingResponse {
    /// Detected labels, sorted by the service
    #[serde(default)]
    pub labels: Option<Vec<DetectedLabel>>,
}

/// One entry of a labeling response; either field may be absent upstream
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedLabel {
    pub name: Option<String>,
    pub confidence: Option<f32>,
}

impl From<&aws_sdk_rekognition::types::Label> for DetectedLabel {
    fn from(label: &aws_sdk_rekognition::types::Label) -> Self {
        Self {
            name: label.name().map(String::from),
            confidence: label.confidence(),
        }
    }
}

impl From<aws_sdk_rekognition::operation::detect_labels::DetectLabelsOutput> for LabelingResponse {
    fn from(output: aws_sdk_rekognition::operation::detect_labels::DetectLabelsOutput) -> Self {
        Self {
            labels: Some(output.labels().iter().map(DetectedLabel::from).collect()),
        }
    }
}

/// Normalized label as persisted in the table
///
/// `confidence` is the canonical exact-decimal form. Use
/// [`LabelRecord::display`] for anything human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelRecord {
    pub name: String,
    pub confidence: Decimal,
}

/// Float rendering of a [`LabelRecord`], for logs only
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisplayLabel {
    pub name: String,
    pub confidence: f64,
}

impl LabelRecord {
    pub fn display(&self) -> DisplayLabel {
        DisplayLabel {
            name: self.name.clone(),
            confidence: self.confidence.to_string().parse().unwrap_or_default(),
        }
    }
}

/// Normalize a labeling response into persisted label records
///
/// Entries missing a name or confidence are skipped. Order is preserved and no
/// confidence filtering happens here; the service already applied the floor.
pub fn normalize(response: &LabelingResponse) -> Vec<LabelRecord> {
    let Some(labels) = response.labels.as_deref() else {
        return Vec::new();
    };

    labels
        .iter()
        .filter_map(|label| {
            let (Some(name), Some(confidence)) = (label.name.as_ref(), label.confidence) else {
                debug!(label = ?label, "Skipping incomplete label entry");
                return None;
            };

            let Some(confidence) = round_confidence(confidence) else {
                debug!(name = %name, confidence, "Skipping non-finite confidence");
                return None;
            };

            Some(LabelRecord {
                name: name.clone(),
                confidence,
            })
        })
        .collect()
}

/// Round a service confidence to [`CONFIDENCE_SCALE`] digits
///
/// Rounding runs on the exact binary value the service returned, so 2.675
/// (stored as 2.67499995...) rounds down to 2.67. Ties only occur when the
/// float is exactly representable, and those go to the even digit.
pub fn round_confidence(confidence: f32) -> Option<Decimal> {
    if !confidence.is_finite() {
        return None;
    }

    // Values too small for 28 digits of scale fall back to the shortest text
    let exact = Decimal::from_f64_retain(f64::from(confidence))
        .or_else(|| Decimal::from_str(&confidence.to_string()).ok())?;

    let mut rounded = exact
        .round_dp_with_strategy(CONFIDENCE_SCALE, RoundingStrategy::MidpointNearestEven);
    // round_dp never widens, "88.1" must still persist as 88.10
    rounded.rescale(CONFIDENCE_SCALE);
    Some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, confidence: f32) -> DetectedLabel {
        DetectedLabel {
            name: Some(name.to_string()),
            confidence: Some(confidence),
        }
    }

    #[test]
    fn test_normalize_preserves_order_and_rounds() {
        let response = LabelingResponse {
            labels: Some(vec![
                label("Shoe", 91.236),
                label("Clothing", 88.1),
                label("Footwear", 75.0),
            ]),
        };

        let records = normalize(&response);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Shoe");
        assert_eq!(records[0].confidence.to_string(), "91.24");
        assert_eq!(records[1].name, "Clothing");
        assert_eq!(records[1].confidence.to_string(), "88.10");
        assert_eq!(records[2].name, "Footwear");
        assert_eq!(records[2].confidence.to_string(), "75.00");
        assert!(records.iter().all(|r| r.confidence.scale() == CONFIDENCE_SCALE));
    }

    #[test]
    fn test_normalize_skips_incomplete_entries() {
        let response = LabelingResponse {
            labels: Some(vec![
                label("Shoe", 91.2),
                DetectedLabel {
                    name: None,
                    confidence: Some(80.0),
                },
                DetectedLabel {
                    name: Some("Sneaker".to_string()),
                    confidence: None,
                },
                label("Sport", 72.456),
            ]),
        };

        let records = normalize(&response);

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Shoe", "Sport"]);
        assert_eq!(records[1].confidence.to_string(), "72.46");
    }

    #[test]
    fn test_normalize_missing_or_empty_labels() {
        assert!(normalize(&LabelingResponse::default()).is_empty());
        assert!(normalize(&LabelingResponse {
            labels: Some(vec![])
        })
        .is_empty());
    }

    #[test]
    fn test_normalize_from_json_response() {
        let response: LabelingResponse = serde_json::from_str(
            r#"{"Labels": [{"Name": "Shoe", "Confidence": 91.236}, {"Name": "Broken"}]}"#,
        )
        .unwrap();

        let records = normalize(&response);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, Decimal::new(9124, 2));
    }

    #[test]
    fn test_round_confidence_uses_exact_binary_value() {
        // 2.675f32 is 2.67499995..., 91.245f32 is 91.24500274...
        assert_eq!(round_confidence(2.675).unwrap(), Decimal::new(267, 2));
        assert_eq!(round_confidence(91.245).unwrap(), Decimal::new(9125, 2));
        assert_eq!(round_confidence(88.335).unwrap(), Decimal::new(8833, 2));
        // 72.125 is exact in binary, a true tie goes to the even digit
        assert_eq!(round_confidence(72.125).unwrap(), Decimal::new(7212, 2));
        assert_eq!(round_confidence(99.994).unwrap(), Decimal::new(9999, 2));
        assert_eq!(round_confidence(100.0).unwrap().to_string(), "100.00");
        assert!(round_confidence(f32::NAN).is_none());
    }

    #[test]
    fn test_display_form_is_float() {
        let record = LabelRecord {
            name: "Shoe".to_string(),
            confidence: Decimal::new(9124, 2),
        };
        let display = record.display();
        assert_eq!(display.confidence, 91.24);
        assert_eq!(
            serde_json::to_value(&display).unwrap(),
            serde_json::json!({"Name": "Shoe", "Confidence": 91.24})
        );
    }
}
