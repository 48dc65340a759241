use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::TransportError;

/// Connection parameters shared by every request: endpoint root plus the
/// database selector and auth token appended to each parameter set.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub db: String,
    pub token: String,
}

impl StoreConfig {
    pub fn new(
        base_url: impl Into<String>,
        db: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            db: db.into(),
            token: token.into(),
        }
    }
}

/// Request/response seam under [`crate::RemoteStore`].
///
/// A transport moves one page request and its parameter pairs to the store
/// and returns the raw body. It knows nothing about payload shapes.
pub trait StoreTransport: Send + Sync {
    fn fetch(
        &self,
        page: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> BoxFuture<'_, Result<String, TransportError>>;
}

/// HTTP GET transport against the production store.
pub struct HttpTransport {
    config: StoreConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, page: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{page}")
    }
}

impl StoreTransport for HttpTransport {
    fn fetch(
        &self,
        page: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> BoxFuture<'_, Result<String, TransportError>> {
        let url = self.url(page);
        async move {
            let mut query: Vec<(&str, &str)> = vec![
                ("db", self.config.db.as_str()),
                ("token", self.config.token.as_str()),
            ];
            for (key, value) in &params {
                query.push((key, value.as_str()));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }

            response
                .text()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))
        }
        .boxed()
    }
}
