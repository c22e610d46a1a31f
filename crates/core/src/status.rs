//! Remote analysis job status model.

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the remote analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Accepted, waiting for a pipeline slot.
    Queued,
    /// Transcription/alignment in progress.
    Running,
    /// Finished; the full result payload is available.
    Done,
    /// The pipeline gave up on this job.
    Failed,
}

impl AnalysisStatus {
    /// Terminal statuses end polling; `Failed` is a valid outcome, not an
    /// error of the tracking layer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Done | AnalysisStatus::Failed)
    }
}

/// One status snapshot of a tracked job, as returned by the remote API.
///
/// The wire shape is `{status, ...payload}`; everything next to `status`
/// is carried opaquely and only deserialized further by the caller once
/// the job is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: AnalysisStatus,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl StatusReport {
    /// A report carrying no payload besides the status.
    pub fn bare(status: AnalysisStatus) -> Self {
        Self {
            status,
            payload: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}
