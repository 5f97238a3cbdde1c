use std::collections::HashSet;

use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::links::next_page_url;
use crate::auth::Token;
use crate::error::{LeadLensError, Result};

pub(super) const PAGE_SIZE: usize = 100;

/// Authenticated HTTP client for the paginated JSON listings both feeds use.
pub struct ApiClient {
    client: Client,
    token: Token,
}

impl ApiClient {
    pub fn new(token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("leadlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LeadLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, token })
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(self.token.as_str())
    }

    /// Follows `next` links from `first_page` until the listing is exhausted
    /// and returns every record in the order received.
    ///
    /// A failing page ends the walk. Records from earlier pages are kept and
    /// the failure is only logged, so one bad response never aborts a run.
    /// A `next` link pointing at a page already fetched also ends the walk.
    pub async fn fetch_all_pages<T>(&self, first_page: Url) -> Vec<T>
    where
        T: DeserializeOwned,
    {
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(first_page);

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                warn!("Pagination loops back to {url}, stopping");
                break;
            }
            debug!("GET {url}");

            match self.fetch_page(url.clone()).await {
                Ok((page, next_url)) => {
                    records.extend(page);
                    next = next_url;
                }
                Err(e) => {
                    warn!("Skipping remaining pages of {url}: {e}");
                }
            }
        }

        records
    }

    async fn fetch_page<T>(&self, url: Url) -> Result<(Vec<T>, Option<Url>)>
    where
        T: DeserializeOwned,
    {
        let response = self.auth_request(self.client.get(url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(LeadLensError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let next = next_page_url(response.headers());
        let page = response.json::<Vec<T>>().await?;

        Ok((page, next))
    }
}

/// Parses an API base URL, making sure relative joins land beneath it.
pub fn api_root(base_url: &str) -> Result<Url> {
    let mut root =
        Url::parse(base_url).map_err(|e| LeadLensError::Config(format!("Invalid base URL: {e}")))?;

    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }

    Ok(root)
}
