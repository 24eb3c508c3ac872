use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashMap;
use thiserror::Error;

/// Failure below the HTTP layer. Opaque to the rest of the client.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("failed to send request: {0}")]
    Send(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A completed exchange with the body read in full.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

/// Sends one request and returns the full response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::Send(format!("invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Send(format!("invalid header value for '{key}': {e}")))?;
            headers.append(name, value);
        }

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        let status = response.status().as_u16();

        let mut response_headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            response_headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers it with `response` verbatim and
    /// returns the request head it received.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&received).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    fn local_transport() -> ReqwestTransport {
        ReqwestTransport::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn test_execute_keeps_repeated_headers_in_order() {
        let (base, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\n\
             content-type: application/json\r\n\
             set-cookie: a=1\r\n\
             fly-request-id: req-1\r\n\
             set-cookie: b=2\r\n\
             content-length: 34\r\n\
             connection: close\r\n\
             \r\n\
             {\"error\":\"machine does not exist\"}",
        )
        .await;

        let response = local_transport()
            .execute(TransportRequest {
                method: Method::GET,
                url: format!("{base}/v1/apps/app/machines/m1"),
                headers: vec![("Authorization".to_string(), "Bearer t".to_string())],
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.headers["set-cookie"], vec!["a=1", "b=2"]);
        assert_eq!(response.headers["fly-request-id"], vec!["req-1"]);
        assert_eq!(response.body, br#"{"error":"machine does not exist"}"#.to_vec());

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /v1/apps/app/machines/m1 HTTP/1.1\r\n"));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer t\r\n"));
    }

    #[tokio::test]
    async fn test_execute_reads_full_chunked_body() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\n\
             transfer-encoding: chunked\r\n\
             connection: close\r\n\
             \r\n\
             6\r\n{\"id\":\r\n\
             5\r\n\"m1\"}\r\n\
             0\r\n\r\n",
        )
        .await;

        let response = local_transport()
            .execute(TransportRequest {
                method: Method::POST,
                url: format!("{base}/v1/apps/app/machines"),
                headers: Vec::new(),
                body: Some(Vec::new()),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, br#"{"id":"m1"}"#.to_vec());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_header_before_send() {
        let transport = ReqwestTransport::new().unwrap();
        let request = TransportRequest {
            method: Method::GET,
            url: "http://127.0.0.1:9/v1/apps/app/machines".to_string(),
            headers: vec![("bad header".to_string(), "x".to_string())],
            body: None,
        };

        let err = transport.execute(request).await.unwrap_err();
        assert!(err.to_string().contains("invalid header name"));
    }

    #[test]
    fn test_request_header_lookup_is_case_insensitive() {
        let request = TransportRequest {
            method: Method::DELETE,
            url: "http://localhost".to_string(),
            headers: vec![("Fly-Machine-Lease-Nonce".to_string(), "n1".to_string())],
            body: None,
        };
        assert_eq!(request.header("fly-machine-lease-nonce"), Some("n1"));
        assert_eq!(request.header("authorization"), None);
    }
}
