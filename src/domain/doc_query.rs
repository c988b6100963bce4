//! Document query progress payloads

use serde::{Deserialize, Serialize};

/// Status of a document query sub-stage (download or convert)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Failed,
}

/// Progress of one sub-stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocQueryProgress {
    pub status: ProgressStatus,
    pub total: u32,
}

impl DocQueryProgress {
    pub fn failed() -> Self {
        Self {
            status: ProgressStatus::Failed,
            total: 0,
        }
    }
}

/// Progress update sent to the document query pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocQueryProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_progress: Option<DocQueryProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert_progress: Option<DocQueryProgress>,
}

impl DocQueryProgressUpdate {
    /// Both stages failed with zero totals, used when the discovery a
    /// deferred query was waiting on fails
    pub fn failed() -> Self {
        Self {
            download_progress: Some(DocQueryProgress::failed()),
            convert_progress: Some(DocQueryProgress::failed()),
        }
    }
}
