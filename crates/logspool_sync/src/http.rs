//! HTTP transport for segment upload.
//!
//! The actual HTTP client is abstracted via a trait so uploads can be
//! tested without a network and hosts can bring their own stack.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;
use tracing::debug;

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    ///
    /// Implementations return an error for transport failures, timeouts and
    /// any non-success status.
    fn post(&self, url: &str, body: Vec<u8>) -> SyncResult<Vec<u8>>;
}

/// [`HttpClient`] backed by a blocking `reqwest` client.
///
/// Must be used from a plain thread, not from inside an async runtime.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a fatal transport error if the TLS backend cannot be set up.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport_fatal(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        let len = body.len();
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status();
        debug!(url, bytes = len, status = status.as_u16(), "collector responded");
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }

        let bytes = response.bytes().map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout
    } else if e.is_builder() {
        SyncError::transport_fatal(e.to_string())
    } else {
        SyncError::transport_retryable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves a single request with a canned response and returns the
    /// request bytes it saw.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/logs", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            request
        });
        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    #[test]
    fn posts_body_and_returns_response() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();

        let body = client.post(&url, b"segment bytes".to_vec()).unwrap();
        assert_eq!(body, b"ok");

        let request = String::from_utf8(server.join().unwrap()).unwrap();
        assert!(request.starts_with("POST /logs"));
        assert!(request.ends_with("segment bytes"));
    }

    #[test]
    fn error_status_is_reported() {
        let (url, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();

        let err = client.post(&url, b"x".to_vec()).unwrap_err();
        assert!(matches!(err, SyncError::Status(503)));
        assert!(err.is_retryable());
        server.join().unwrap();
    }

    #[test]
    fn connection_refused_is_retryable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/logs", listener.local_addr().unwrap());
        drop(listener);

        let client = ReqwestClient::new(Duration::from_secs(5)).unwrap();
        let err = client.post(&url, b"x".to_vec()).unwrap_err();
        assert!(err.is_retryable());
    }
}
