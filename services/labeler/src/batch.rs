use crate::item::build_item;
use crate::item_store::ItemStore;
use crate::label_detector::LabelDetector;
use crate::labels::normalize;
use crate::s3_uploader::ObjectStore;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Image extensions picked up by the batch driver, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Image files found in the directory
    pub files_found: usize,
    /// Items written to the table
    pub items_written: usize,
    /// Labels across all written items
    pub labels_written: usize,
}

/// Uploads local images, labels them and records the results, one at a time
///
/// The first failing call aborts the run; earlier files stay uploaded and
/// recorded.
pub struct BatchDriver {
    store: Arc<dyn ObjectStore>,
    detector: Arc<dyn LabelDetector>,
    items: Arc<dyn ItemStore>,
    bucket: String,
    key_prefix: String,
    branch: String,
}

impl BatchDriver {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        detector: Arc<dyn LabelDetector>,
        items: Arc<dyn ItemStore>,
        bucket: String,
        key_prefix: String,
        branch: String,
    ) -> Self {
        Self {
            store,
            detector,
            items,
            bucket,
            key_prefix,
            branch,
        }
    }

    /// Process every image in `images_dir`
    #[instrument(skip(self))]
    pub async fn run(&self, images_dir: &Path) -> Result<BatchSummary> {
        let files = find_images(images_dir)?;

        let mut summary = BatchSummary {
            files_found: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            info!(dir = %images_dir.display(), "No images found. Nothing to do.");
            return Ok(summary);
        }

        for path in &files {
            let label_count = self.process_file(path).await?;
            summary.items_written += 1;
            summary.labels_written += label_count;
        }

        info!(
            files_found = summary.files_found,
            items_written = summary.items_written,
            labels_written = summary.labels_written,
            "Batch complete"
        );

        Ok(summary)
    }

    /// Upload, label and record one file; returns the number of labels stored
    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn process_file(&self, path: &Path) -> Result<usize> {
        let key = self.object_key(path)?;

        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        info!(bucket = %self.bucket, key = %key, "Uploading image");
        self.store
            .put_object(&self.bucket, &key, body)
            .await
            .with_context(|| format!("Upload of {} failed", path.display()))?;

        info!(bucket = %self.bucket, key = %key, "Detecting labels");
        let response = self
            .detector
            .detect_labels(&self.bucket, &key)
            .await
            .with_context(|| format!("Label detection for {} failed", path.display()))?;

        let item = build_item(&key, normalize(&response), &self.branch, Utc::now());

        info!(item = %item.display_json(), "Writing result to DynamoDB");
        self.items
            .put_item(&item)
            .await
            .with_context(|| format!("Item write for {} failed", path.display()))?;

        Ok(item.labels.len())
    }

    /// Object key for a local file: `{prefix}/{file name}`
    pub fn object_key(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Unusable file name: {}", path.display()))?;

        Ok(format!(
            "{}/{}",
            self.key_prefix.trim_end_matches('/'),
            file_name
        ))
    }
}

/// List image files directly under `dir`, in directory-listing order
///
/// A missing directory is treated like an empty one.
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir.display())),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
