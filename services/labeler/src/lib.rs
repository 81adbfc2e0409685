//! Labeler Service
//!
//! Labels images with Rekognition and records the results in DynamoDB. Two
//! entry points share the same normalization and persistence path:
//!
//! - **Batch driver** (`analyze-images`): uploads every image in a local
//!   directory to S3, labels it and writes one item per image.
//! - **Event handler** (`label-handler`): a Lambda fired by S3 upload
//!   notifications; labels the uploaded object in place and writes one item
//!   with a 7-day `ttl`.
//!
//! ## Architecture
//!
//! ```text
//!  images/*.jpg ──▶ S3 Uploader ──┐
//!                                 ▼
//!  S3 notification ─────────▶ Label Detector ──▶ normalize ──▶ build item ──▶ Item Store
//!                             (Rekognition)                                   (DynamoDB)
//! ```
//!
//! Confidences are persisted as exact decimals rounded to two places; float
//! renderings only ever reach the logs.

pub mod batch;
pub mod config;
pub mod error;
pub mod event_handler;
pub mod item;
pub mod item_store;
pub mod label_detector;
pub mod labels;
pub mod s3_uploader;

pub use batch::{BatchDriver, BatchSummary};
pub use config::{Config, RunMode};
pub use error::StageError;
pub use event_handler::{EventHandler, HandlerResponse};
pub use item::{build_expiring_item, build_item, Item};
pub use item_store::{DynamoItemStore, ItemStore};
pub use label_detector::{LabelDetector, RekognitionDetector};
pub use labels::{normalize, LabelRecord, LabelingResponse};
pub use s3_uploader::{ObjectStore, S3Uploader};
