mod buildkite;
mod client;
mod github;
mod links;

use chrono::{DateTime, Utc};

use crate::window::AnalysisWindow;

pub use buildkite::BuildkiteClient;
pub use github::GitHubClient;

/// Paginated listing of the commits integrated into a repository.
pub trait CommitSource {
    /// Commit timestamps within the window, in the order the source
    /// returned them. Fetch failures yield whatever was gathered before them.
    async fn fetch_commits(&self, repository: &str, window: &AnalysisWindow) -> Vec<DateTime<Utc>>;
}

/// Paginated listing of the successful, unblocked deploys of a pipeline.
pub trait DeploySource {
    /// Deploy timestamps within the window, in the order the source
    /// returned them. Fetch failures yield whatever was gathered before them.
    async fn fetch_deploys(&self, pipeline: &str, window: &AnalysisWindow) -> Vec<DateTime<Utc>>;
}
