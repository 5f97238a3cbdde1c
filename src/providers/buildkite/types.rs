use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Entry of `GET /v2/organizations/{org}/pipelines/{pipeline}/builds`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildkiteBuild {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    /// Waiting on a block step for manual release
    #[serde(default)]
    pub blocked: bool,
}
