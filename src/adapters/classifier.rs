//! Emotion classifier seam.
//!
//! The classifier itself runs outside this crate. A provider takes the
//! reduced request document and hands back the raw response text, which the
//! merge-back step parses line by line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

/// Source of classifier responses
#[async_trait]
pub trait TagProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Classify one debate, returning the raw response text
    async fn classify(&self, debate_id: &str, request: &str) -> Result<String>;
}

/// Provider backed by pre-computed response files.
///
/// Responses are looked up as `{dir}/{debate_id}.txt`.
pub struct FileTagProvider {
    dir: PathBuf,
}

impl FileTagProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn response_path(&self, debate_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", debate_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TagProvider for FileTagProvider {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self, request), fields(provider = "file"))]
    async fn classify(&self, debate_id: &str, request: &str) -> Result<String> {
        let path = self.response_path(debate_id);
        debug!(request_bytes = request.len(), path = %path.display(), "Reading classifier response");

        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read classifier response: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_provider_reads_response() {
        let temp = TempDir::new().unwrap();
        let provider = FileTagProvider::new(temp.path());
        std::fs::write(
            provider.response_path("2019-04-22"),
            "<emotion int_id=\"i000\" sent_id=\"s0\" tags=\"ira\"/>\n",
        )
        .unwrap();

        let response = provider.classify("2019-04-22", "<debate></debate>").await.unwrap();
        assert!(response.contains("int_id=\"i000\""));
        assert_eq!(provider.name(), "file");
    }

    #[tokio::test]
    async fn test_file_provider_missing_response() {
        let temp = TempDir::new().unwrap();
        let provider = FileTagProvider::new(temp.path());

        let err = provider.classify("2019-04-22", "").await.unwrap_err();
        assert!(err.to_string().contains("2019-04-22.txt"));
    }
}
