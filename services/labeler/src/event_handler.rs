use crate::error::StageError;
use crate::item::{build_expiring_item, Item};
use crate::item_store::ItemStore;
use crate::label_detector::LabelDetector;
use crate::labels::normalize;
use aws_lambda_events::s3::S3Event;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Location of the uploaded image, with the key decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// Result returned to the invoking runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerResponse {
    pub fn success(filename: String, count: usize) -> Self {
        Self {
            ok: true,
            filename: Some(filename),
            count: Some(count),
            error: None,
        }
    }

    pub fn failure(error: &StageError) -> Self {
        Self {
            ok: false,
            filename: None,
            count: None,
            error: Some(error.code().to_string()),
        }
    }
}

/// Decode an S3 notification key: `+` is a space, then percent-escapes
pub fn decode_key(raw: &str) -> Result<String, StageError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| StageError::BadEvent(format!("undecodable object key {:?}: {}", raw, e)))
}

/// Extract the bucket and decoded key from the first notification record
pub fn parse_notification(event: &serde_json::Value) -> Result<ObjectRef, StageError> {
    let notification =
        S3Event::deserialize(event).map_err(|e| StageError::BadEvent(e.to_string()))?;

    let record_count = notification.records.len();
    let record = notification
        .records
        .into_iter()
        .next()
        .ok_or_else(|| StageError::BadEvent("Records is empty".to_string()))?;

    if record_count > 1 {
        warn!(
            ignored_records = record_count - 1,
            "Notification carried multiple records, only the first is processed"
        );
    }

    let bucket = record
        .s3
        .bucket
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StageError::BadEvent("missing bucket name".to_string()))?;

    // Keys arrive form-encoded by the notification transport
    let raw_key = record
        .s3
        .object
        .key
        .ok_or_else(|| StageError::BadEvent("missing object key".to_string()))?;
    let key = decode_key(&raw_key)?;

    if key.is_empty() {
        return Err(StageError::BadEvent("empty object key".to_string()));
    }

    Ok(ObjectRef { bucket, key })
}

/// Handles one upload notification: parse, detect, persist
///
/// Every stage failure is logged and turned into a failed [`HandlerResponse`];
/// nothing is raised to the runtime, so a malformed event is never retried.
pub struct EventHandler {
    detector: Arc<dyn LabelDetector>,
    store: Arc<dyn ItemStore>,
    branch: String,
}

impl EventHandler {
    pub fn new(detector: Arc<dyn LabelDetector>, store: Arc<dyn ItemStore>, branch: String) -> Self {
        Self {
            detector,
            store,
            branch,
        }
    }

    /// Process a notification payload
    #[instrument(skip(self, event))]
    pub async fn handle(&self, event: &serde_json::Value) -> HandlerResponse {
        let object = match parse_notification(event) {
            Ok(object) => object,
            Err(e) => {
                error!(
                    stage = e.stage(),
                    error = %e,
                    event_sample = %event,
                    "Bad S3 event shape"
                );
                return HandlerResponse::failure(&e);
            }
        };

        match self.process(&object).await {
            Ok(item) => {
                info!(
                    filename = %item.filename,
                    label_count = item.labels.len(),
                    item = %item.display_json(),
                    "Labels recorded"
                );
                HandlerResponse::success(item.filename, item.labels.len())
            }
            Err(e) => HandlerResponse::failure(&e),
        }
    }

    #[instrument(skip(self, object), fields(bucket = %object.bucket, key = %object.key))]
    async fn process(&self, object: &ObjectRef) -> Result<Item, StageError> {
        let response = self
            .detector
            .detect_labels(&object.bucket, &object.key)
            .await
            .map_err(StageError::DetectFailed)
            .inspect_err(|e| {
                error!(
                    stage = e.stage(),
                    error = %e,
                    bucket = %object.bucket,
                    key = %object.key,
                    "Label detection failed"
                );
            })?;

        let labels = normalize(&response);
        let item = build_expiring_item(&object.key, labels, &self.branch, Utc::now());

        self.store
            .put_item(&item)
            .await
            .map_err(StageError::PersistFailed)
            .inspect_err(|e| {
                error!(
                    stage = e.stage(),
                    error = %e,
                    bucket = %object.bucket,
                    key = %object.key,
                    about_to_write = %item.display_json(),
                    "Item write failed"
                );
            })?;

        Ok(item)
    }
}
