use foundation::{FeatureKind, FeatureUid, SubId, TraceDirection};
use tracing::debug;

use crate::client::{DetailService, FetchError, LocalBoxFuture, TraceService};
use crate::protocol::{DetailPayload, decode_detail, decode_trace};
use crate::request::Resource;

/// `reqwest`-backed client for the collections API.
#[derive(Debug, Clone)]
pub struct HttpCollections {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCollections {
    pub const DEFAULT_BASE_URL: &'static str = "https://beehive.pacificclimate.org/bbox-server";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        let url = resource.url(&self.base_url);
        debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Default for HttpCollections {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

impl DetailService for HttpCollections {
    fn fetch_detail(
        &self,
        kind: FeatureKind,
        subid: &SubId,
    ) -> LocalBoxFuture<'_, Result<DetailPayload, FetchError>> {
        let resource = Resource::detail(kind, subid.clone());
        Box::pin(async move {
            let bytes = self.get(&resource).await?;
            decode_detail(resource.subid().clone(), &bytes)
        })
    }
}

impl TraceService for HttpCollections {
    fn fetch_trace(
        &self,
        direction: TraceDirection,
        subid: &SubId,
    ) -> LocalBoxFuture<'_, Result<Vec<FeatureUid>, FetchError>> {
        let resource = Resource::trace(direction, subid.clone());
        Box::pin(async move {
            let bytes = self.get(&resource).await?;
            decode_trace(direction, &bytes)
        })
    }
}
