use crate::features::transport::repo::{Transport, TransportRequest, TransportResponse};
use crate::shared::config::ClientConfig;
use crate::shared::context::RequestContext;
use crate::shared::error::{MachinesError, MachinesResult};
use crate::shared::response;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// One app-scoped API call before it is bound to a base URL and credentials.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// `segments` are joined under the app path; each is encoded on its own.
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(segments: &[&str]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn post(segments: &[&str]) -> Self {
        Self::new(Method::POST, segments)
    }

    pub fn delete(segments: &[&str]) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> MachinesResult<Self> {
        self.body = Some(serde_json::to_vec(body).map_err(MachinesError::Encode)?);
        Ok(self)
    }
}

/// Binds requests to the configured app and sends them through a transport.
pub struct ApiService {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ApiService {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build(&self, request: ApiRequest) -> MachinesResult<TransportRequest> {
        self.config.validate()?;

        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let mut url = self.config.url_for(&segments)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_token),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        headers.extend(request.headers);

        Ok(TransportRequest {
            method: request.method,
            url: url.into(),
            headers,
            body: request.body,
        })
    }

    /// Sends the request and returns the raw response, whatever its status.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: ApiRequest,
    ) -> MachinesResult<TransportResponse> {
        let method = request.method.clone();
        let path = request.path();
        let request = self.build(request)?;

        debug!(%method, %path, "Dispatching API request");
        let started = Instant::now();

        let transport = self.transport.clone();
        let response = ctx
            .run(async move { transport.execute(request).await.map_err(MachinesError::from) })
            .await?;

        debug!(
            %method,
            %path,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API request completed"
        );
        Ok(response)
    }

    /// Sends the request and decodes a 2xx body into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: ApiRequest,
    ) -> MachinesResult<T> {
        let response = self.execute(ctx, request).await?;
        response::decode_json(response).map_err(log_api_error)
    }

    /// Sends the request and discards a 2xx body.
    pub async fn fetch_empty(&self, ctx: &RequestContext, request: ApiRequest) -> MachinesResult<()> {
        let response = self.execute(ctx, request).await?;
        response::drain(response).map_err(log_api_error)
    }
}

fn log_api_error(err: MachinesError) -> MachinesError {
    if let Some(api) = err.api_error() {
        warn!(
            status = api.status_code(),
            request_id = api.request_id().unwrap_or_default(),
            error = %api,
            "API request rejected"
        );
    }
    err
}
