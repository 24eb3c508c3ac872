pub mod repo;
pub mod service;

pub use repo::{ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse};
pub use service::{ApiRequest, ApiService};

#[cfg(test)]
pub(crate) mod stub {
    use super::{ApiService, Transport, TransportError, TransportRequest, TransportResponse};
    use crate::shared::config::ClientConfig;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Responder = dyn Fn(&TransportRequest) -> TransportResponse + Send + Sync;

    /// Answers every request with a canned response and keeps what it was sent.
    pub(crate) struct StubTransport {
        responder: Box<Responder>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl StubTransport {
        pub(crate) fn new<F>(responder: F) -> Arc<Self>
        where
            F: Fn(&TransportRequest) -> TransportResponse + Send + Sync + 'static,
        {
            Arc::new(Self {
                responder: Box::new(responder),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn requests(&self) -> Vec<TransportRequest> {
            self.requests
                .lock()
                .map(|requests| requests.clone())
                .unwrap_or_default()
        }

        pub(crate) fn last_request(&self) -> Option<TransportRequest> {
            self.requests().pop()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn execute(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            let response = (self.responder)(&request);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Ok(response)
        }
    }

    pub(crate) fn json(status: u16, value: serde_json::Value) -> TransportResponse {
        TransportResponse {
            status,
            headers: HashMap::new(),
            body: value.to_string().into_bytes(),
        }
    }

    pub(crate) fn empty(status: u16) -> TransportResponse {
        TransportResponse {
            status,
            ..TransportResponse::default()
        }
    }

    pub(crate) fn machine_not_found() -> TransportResponse {
        json(404, serde_json::json!({ "error": "machine does not exist" }))
    }

    pub(crate) fn api(transport: Arc<StubTransport>) -> Arc<ApiService> {
        Arc::new(ApiService::new(
            ClientConfig::new("app", "api_token").with_base_url("http://localhost:30555"),
            transport,
        ))
    }
}
