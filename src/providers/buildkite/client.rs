use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use url::Url;

use super::types::BuildkiteBuild;
use crate::auth::Token;
use crate::error::{LeadLensError, Result};
use crate::providers::client::{api_root, ApiClient, PAGE_SIZE};
use crate::providers::DeploySource;
use crate::window::AnalysisWindow;

/// Only builds in this state count as deploys.
const DEPLOYED_STATE: &str = "passed";

/// Buildkite REST client listing the passed builds of a release branch.
pub struct BuildkiteClient {
    api: ApiClient,
    api_root: Url,
    org: String,
    branch: String,
}

impl BuildkiteClient {
    /// Create a new Buildkite API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Buildkite API base URL (e.g., "https://api.buildkite.com")
    /// * `org` - Organization slug owning the pipelines
    /// * `branch` - Release branch whose builds are deploys
    /// * `token` - Buildkite API access token
    pub fn new(base_url: &str, org: String, branch: String, token: Token) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(token)?,
            api_root: api_root(base_url)?,
            org,
            branch,
        })
    }

    fn builds_url(&self, pipeline: &str, window: &AnalysisWindow) -> Result<Url> {
        let mut url = self
            .api_root
            .join(&format!(
                "v2/organizations/{}/pipelines/{}/builds",
                self.org, pipeline
            ))
            .map_err(|e| LeadLensError::Config(format!("Invalid builds URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("branch", &self.branch)
            .append_pair("state", DEPLOYED_STATE)
            .append_pair("created_from", &window.query_param())
            .append_pair("created_to", &window.end_param())
            .append_pair("per_page", &PAGE_SIZE.to_string());

        Ok(url)
    }
}

impl DeploySource for BuildkiteClient {
    async fn fetch_deploys(&self, pipeline: &str, window: &AnalysisWindow) -> Vec<DateTime<Utc>> {
        let url = match self.builds_url(pipeline, window) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot list builds for {pipeline}: {e}");
                return Vec::new();
            }
        };

        let builds: Vec<BuildkiteBuild> = self.api.fetch_all_pages(url).await;
        let deploys: Vec<_> = builds
            .iter()
            .filter(|build| {
                if build.blocked {
                    debug!("Build #{} of {pipeline} is blocked, skipping", build.number);
                }
                !build.blocked
            })
            .map(|build| build.created_at)
            .collect();

        info!(
            "Fetched {} deploys for {}/{} on {}",
            deploys.len(),
            self.org,
            pipeline,
            self.branch
        );

        deploys
    }
}
