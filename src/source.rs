// File: src/source.rs
// Uniform HTTP request wrapper for the third-party indexers and price feeds

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SourceError;

/// Hard bound on a single external call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body: parsed JSON when possible, the raw text otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(String),
}

impl Payload {
    pub fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Raw(body),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    /// Decode into a wire type; `None` for raw bodies or shape mismatches
    pub fn decode<T: DeserializeOwned>(self) -> Option<T> {
        match self {
            Payload::Json(value) => serde_json::from_value(value).ok(),
            Payload::Raw(_) => None,
        }
    }
}

/// Shared request adapter.
///
/// The inner client is a connection pool only; it holds no application state,
/// so clones are cheap and independent invocations stay independent.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAdapter {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("magic-mint-inspector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Network(err)
        }
    }

    /// GET `url` with `headers`, returning the body as JSON or raw text.
    ///
    /// Non-success statuses still yield their body: the indexers describe
    /// errors in JSON and callers decide what an error body means.
    pub async fn request(&self, url: &str, headers: &[(&str, &str)]) -> Result<Payload, SourceError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(target: "magic_mint::source", %url, %status, "Non-success status");
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        Ok(Payload::from_body(body))
    }
}

#[cfg(test)]
pub(crate) mod canned {
    //! Local HTTP server answering with queued bodies and recording requests

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{HeaderMap, Uri};
    use axum::Router;

    #[derive(Debug, Clone)]
    pub struct SeenRequest {
        pub path: String,
        pub query: Option<String>,
        pub headers: HeaderMap,
    }

    #[derive(Clone, Default)]
    pub struct CannedServer {
        bodies: Arc<Mutex<VecDeque<String>>>,
        delay: Duration,
        pub seen: Arc<Mutex<Vec<SeenRequest>>>,
    }

    impl CannedServer {
        pub fn new<I: IntoIterator<Item = String>>(bodies: I) -> Self {
            Self {
                bodies: Arc::new(Mutex::new(bodies.into_iter().collect())),
                ..Default::default()
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Bind on an ephemeral port and return the base URL
        pub async fn start(&self) -> String {
            let app = Router::new().fallback(answer).with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        pub fn requests(&self) -> Vec<SeenRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn answer(State(server): State<CannedServer>, uri: Uri, headers: HeaderMap) -> String {
        server.seen.lock().unwrap().push(SeenRequest {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
        });
        if !server.delay.is_zero() {
            tokio::time::sleep(server.delay).await;
        }
        server.bodies.lock().unwrap().pop_front().unwrap_or_default()
    }
}
