//! Scripted in-process transport for tests and host-side previews.

use std::sync::Mutex;

use super::transport::{ApiRequest, HttpMethod, HttpTransport, RawResponse, TransportError};

struct Route {
    method: HttpMethod,
    path: String,
    reply: Result<RawResponse, TransportError>,
}

/// Mock transport: answers by method + path, records every request.
///
/// Later registrations for the same route win. Unrouted requests fail as if
/// the server were unreachable.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with a JSON body.
    pub fn respond(self, method: HttpMethod, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.push(
            method,
            path,
            Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    /// Answer `method path` with a raw text body.
    pub fn respond_text(self, method: HttpMethod, path: &str, status: u16, body: &str) -> Self {
        self.push(
            method,
            path,
            Ok(RawResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    /// Fail `method path` at the transport level.
    pub fn fail(self, method: HttpMethod, path: &str, error: TransportError) -> Self {
        self.push(method, path, Err(error));
        self
    }

    /// Everything sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Result<RawResponse, TransportError>) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                method,
                path: path.to_string(),
                reply,
            });
        }
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let routes = self
            .routes
            .lock()
            .map_err(|e| TransportError::Other(format!("Lock poisoned: {}", e)))?;
        routes
            .iter()
            .rev()
            .find(|r| r.method == request.method && r.path == request.path)
            .map(|r| r.reply.clone())
            .unwrap_or_else(|| {
                Err(TransportError::Connect(format!(
                    "no mock route for {} {}",
                    request.method.as_str(),
                    request.path
                )))
            })
    }
}
