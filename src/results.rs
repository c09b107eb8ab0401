use serde::{Deserialize, Serialize};

/// A discovered thesis document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Trimmed document title as shown in the index
    pub file_name: String,

    /// Synthesized download location of the artifact
    pub source_url: String,

    /// Whether the export sequence ran without error. Not a delivery check.
    pub downloaded: bool,
}

impl Record {
    /// Create a record that has not been downloaded yet
    pub fn new(file_name: String, source_url: String) -> Self {
        Self {
            file_name,
            source_url,
            downloaded: false,
        }
    }
}
