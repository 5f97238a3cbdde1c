use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    /// Absent on some imported histories
    pub committer: Option<Signature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signature {
    pub date: DateTime<Utc>,
}

impl GitHubCommit {
    /// When the change was integrated, normalized to UTC.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.commit.committer.as_ref().map(|signature| signature.date)
    }
}
