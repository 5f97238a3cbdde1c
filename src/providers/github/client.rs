use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use url::Url;

use super::types::GitHubCommit;
use crate::auth::Token;
use crate::error::{LeadLensError, Result};
use crate::providers::client::{api_root, ApiClient, PAGE_SIZE};
use crate::providers::CommitSource;
use crate::window::AnalysisWindow;

/// GitHub REST client listing the commits of an organization's repositories.
pub struct GitHubClient {
    api: ApiClient,
    api_root: Url,
    org: String,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `org` - Organization owning the component repositories
    /// * `token` - GitHub personal access token
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, org: String, token: Token) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(token)?,
            api_root: api_root(base_url)?,
            org,
        })
    }

    fn commits_url(&self, repository: &str, window: &AnalysisWindow) -> Result<Url> {
        let mut url = self
            .api_root
            .join(&format!("repos/{}/{}/commits", self.org, repository))
            .map_err(|e| LeadLensError::Config(format!("Invalid commits URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("since", &window.query_param())
            .append_pair("until", &window.end_param())
            .append_pair("per_page", &PAGE_SIZE.to_string());

        Ok(url)
    }
}

impl CommitSource for GitHubClient {
    async fn fetch_commits(&self, repository: &str, window: &AnalysisWindow) -> Vec<DateTime<Utc>> {
        let url = match self.commits_url(repository, window) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot list commits for {repository}: {e}");
                return Vec::new();
            }
        };

        let commits: Vec<GitHubCommit> = self.api.fetch_all_pages(url).await;
        let timestamps: Vec<_> = commits
            .iter()
            .filter_map(|commit| {
                let committed_at = commit.committed_at();
                if committed_at.is_none() {
                    debug!("Commit {} has no committer date, skipping", commit.sha);
                }
                committed_at
            })
            .collect();

        info!("Fetched {} commits for {}/{}", timestamps.len(), self.org, repository);

        timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn window() -> AnalysisWindow {
        AnalysisWindow::ending_at(Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap(), 30)
    }

    fn commit_json(sha: &str, date: &str) -> String {
        format!(r#"{{"sha": "{sha}", "commit": {{"committer": {{"name": "dev", "date": "{date}"}}}}}}"#)
    }

    #[tokio::test]
    async fn test_fetch_commits_paginates_with_since_filter() {
        let mut server = mockito::Server::new_async().await;
        let next = format!("{}/repos/acme/payments/commits?page=2", server.url());

        let first = server
            .mock("GET", "/repos/acme/payments/commits")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("since".into(), "2024-05-01T00:00:00Z".into()),
                Matcher::UrlEncoded("until".into(), "2024-05-31T00:00:00Z".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .match_header("authorization", "Bearer ghp_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("link", &format!("<{next}>; rel=\"next\""))
            .with_body(format!(
                "[{}, {}]",
                commit_json("a1", "2024-05-20T10:00:00Z"),
                commit_json("b2", "2024-05-18T09:30:00+02:00")
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/acme/payments/commits")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(format!("[{}]", commit_json("c3", "2024-05-02T00:00:00Z")))
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "acme".to_string(), Token::from("ghp_test")).unwrap();
        let commits = client.fetch_commits("payments", &window()).await;

        assert_eq!(
            commits,
            vec![
                Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 18, 7, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
            ]
        );
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_commits_not_found_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/missing/commits")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "acme".to_string(), Token::from("ghp_test")).unwrap();

        assert!(client.fetch_commits("missing", &window()).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_commits_skips_entries_without_committer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/legacy/commits")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(format!(
                r#"[{{"sha": "x0", "commit": {{"committer": null}}}}, {}]"#,
                commit_json("x1", "2024-05-10T00:00:00Z")
            ))
            .create_async()
            .await;

        let client =
            GitHubClient::new(&server.url(), "acme".to_string(), Token::from("ghp_test")).unwrap();
        let commits = client.fetch_commits("legacy", &window()).await;

        assert_eq!(commits, vec![Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap()]);
    }
}
