//! Endpoint wrappers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transport::{ApiRequest, HttpMethod, HttpTransport, RawResponse, ReqwestTransport};
use super::{ApiError, ApiResult};
use crate::config::ApiConfig;
use crate::models::{
    DoctorSearchResult, MarketingActivity, Product, ProductPayload, RepResources, SampleRequest,
    User, VisitSubmission,
};

/// Result of a health round-trip.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub status: u16,
    pub elapsed_ms: u64,
    /// Parsed body, when the server returned JSON
    pub body: Option<Value>,
}

/// Acknowledgement returned by create endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatedRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Typed client for the CRM backend.
pub struct ApiClient {
    config: ApiConfig,
    transport: Arc<dyn HttpTransport>,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            token: None,
        }
    }

    /// Client over the real HTTP stack.
    pub fn with_reqwest(config: ApiConfig) -> ApiResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Attach (or drop) the bearer token sent with every call.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// `GET /health`, timed.
    pub fn health_check(&self, timeout: Option<Duration>) -> ApiResult<HealthReport> {
        let mut request = self.request(HttpMethod::Get, "/health");
        request.timeout = timeout;

        let started = Instant::now();
        let response = self.execute(request)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        Ok(HealthReport {
            status: response.status,
            elapsed_ms,
            body: serde_json::from_str(&response.body).ok(),
        })
    }

    /// `GET /users/{id}`
    pub fn get_user(&self, id: &str) -> ApiResult<User> {
        let path = format!("/users/{}", encode_segment(id));
        self.fetch_required(self.request(HttpMethod::Get, &path), &format!("user {}", id))
    }

    /// `GET /doctors/search?q=...`
    pub fn search_doctors(&self, query: &str) -> ApiResult<DoctorSearchResult> {
        let mut request = self.request(HttpMethod::Get, "/doctors/search");
        request.query.push(("q".into(), query.to_string()));
        self.fetch_required(request, &format!("doctor search '{}'", query))
    }

    /// `GET /products`
    pub fn list_products(&self) -> ApiResult<Vec<Product>> {
        self.fetch_list(self.request(HttpMethod::Get, "/products"))
    }

    /// `POST /products`
    pub fn create_product(&self, payload: &ProductPayload) -> ApiResult<Product> {
        let mut request = self.request(HttpMethod::Post, "/products");
        request.body = Some(serde_json::to_value(payload)?);
        self.fetch_required(request, "created product")
    }

    /// `PUT /products/{id}`
    pub fn update_product(&self, id: &str, payload: &ProductPayload) -> ApiResult<Product> {
        let path = format!("/products/{}", encode_segment(id));
        let mut request = self.request(HttpMethod::Put, &path);
        request.body = Some(serde_json::to_value(payload)?);
        self.fetch_required(request, &format!("product {}", id))
    }

    /// `GET /sample-requests`
    pub fn list_sample_requests(&self) -> ApiResult<Vec<SampleRequest>> {
        self.fetch_list(self.request(HttpMethod::Get, "/sample-requests"))
    }

    /// `GET /sample-requests/{id}`
    pub fn get_sample_request(&self, id: &str) -> ApiResult<SampleRequest> {
        let path = format!("/sample-requests/{}", encode_segment(id));
        self.fetch_required(
            self.request(HttpMethod::Get, &path),
            &format!("sample request {}", id),
        )
    }

    /// `GET /medical-reps/{id}/resources`
    pub fn get_rep_resources(&self, rep_id: &str) -> ApiResult<RepResources> {
        let path = format!("/medical-reps/{}/resources", encode_segment(rep_id));
        self.fetch_required(
            self.request(HttpMethod::Get, &path),
            &format!("resources for rep {}", rep_id),
        )
    }

    /// `POST /marketing-activities`
    pub fn create_marketing_activity(&self, activity: &MarketingActivity) -> ApiResult<CreatedRecord> {
        let mut request = self.request(HttpMethod::Post, "/marketing-activities");
        request.body = Some(serde_json::to_value(activity)?);
        self.fetch_created(request)
    }

    /// `POST /pharmacy-visits`
    pub fn submit_visit(&self, visit: &VisitSubmission) -> ApiResult<CreatedRecord> {
        let mut request = self.request(HttpMethod::Post, "/pharmacy-visits");
        request.body = Some(serde_json::to_value(visit)?);
        self.fetch_created(request)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn request(&self, method: HttpMethod, path: &str) -> ApiRequest {
        ApiRequest {
            method,
            path: path.to_string(),
            url: self.config.url(path),
            query: Vec::new(),
            body: None,
            bearer_token: self.token.clone(),
            timeout: None,
        }
    }

    /// Send and reject non-2xx statuses.
    fn execute(&self, request: ApiRequest) -> ApiResult<RawResponse> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "API request");

        let response = self.transport.send(&request).map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "API transport failure");
            ApiError::from(e)
        })?;

        if !response.is_success() {
            let message = server_message(&response);
            tracing::warn!(
                path = %request.path,
                status = response.status,
                message = %message,
                "API error status"
            );
            return Err(ApiError::Http {
                status: response.status,
                message,
            });
        }
        Ok(response)
    }

    /// Send, unwrap the `{success, data}` envelope and decode.
    fn fetch_value(&self, request: ApiRequest) -> ApiResult<Value> {
        let response = self.execute(request)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&response.body)?;
        unwrap_envelope(value)
    }

    fn fetch_required<T: DeserializeOwned>(&self, request: ApiRequest, what: &str) -> ApiResult<T> {
        match self.fetch_value(request)? {
            Value::Null => Err(ApiError::NotFound(what.to_string())),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    fn fetch_list<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<Vec<T>> {
        match self.fetch_value(request)? {
            Value::Null => Ok(Vec::new()),
            value => Ok(serde_json::from_value(value)?),
        }
    }

    fn fetch_created(&self, request: ApiRequest) -> ApiResult<CreatedRecord> {
        match self.fetch_value(request)? {
            Value::Object(map) => Ok(serde_json::from_value(Value::Object(map))?),
            _ => Ok(CreatedRecord::default()),
        }
    }
}

/// Strip the `{success, data, message}` envelope if present.
fn unwrap_envelope(value: Value) -> ApiResult<Value> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    match map.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Request was not successful")
                .to_string();
            Err(ApiError::Application(message))
        }
        Some(true) => Ok(map
            .remove("data")
            .unwrap_or(Value::Object(map))),
        None => Ok(Value::Object(map)),
    }
}

/// Best human-readable message for an error response.
fn server_message(response: &RawResponse) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&response.body) {
        for key in ["message", "error"] {
            if let Some(msg) = map.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }

    let text = response.body.trim();
    if !text.is_empty() && text.len() <= 200 {
        return text.to_string();
    }

    reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown error")
        .to_string()
}

/// Percent-encode one path segment.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockTransport, TransportError};
    use serde_json::json;

    fn client(mock: MockTransport) -> (ApiClient, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        let client = ApiClient::new(ApiConfig::new("http://mock/api"), mock.clone());
        (client, mock)
    }

    #[test]
    fn test_health_check_reports_elapsed() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/health",
            200,
            json!({"status": "ok"}),
        ));

        let report = client.health_check(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(report.status, 200);
        assert_eq!(report.body.unwrap()["status"], "ok");

        let sent = &mock.requests()[0];
        assert_eq!(sent.url, "http://mock/api/health");
        assert_eq!(sent.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_bearer_token_attached() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/products",
            200,
            json!([]),
        ));
        let client = client.with_token(Some("tok".into()));

        client.list_products().unwrap();
        assert_eq!(mock.requests()[0].bearer_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_envelope_unwrapped() {
        let (client, _) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/products",
            200,
            json!({"success": true, "data": [{"id": "P1", "name": "Panadol", "price": 4.5}]}),
        ));

        let products = client.list_products().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 4.5);
    }

    #[test]
    fn test_application_failure_flag() {
        let (client, _) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/sample-requests",
            200,
            json!({"success": false, "message": "Session expired"}),
        ));

        match client.list_sample_requests() {
            Err(ApiError::Application(msg)) => assert_eq!(msg, "Session expired"),
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_carries_server_message() {
        let (client, _) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/users/7",
            403,
            json!({"message": "Forbidden for this role"}),
        ));

        let err = client.get_user("7").unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("Forbidden for this role"));
    }

    #[test]
    fn test_http_error_falls_back_to_reason() {
        let long_html = "<html>".repeat(100);
        let (client, _) = client(MockTransport::new().respond_text(
            HttpMethod::Get,
            "/users/7",
            404,
            &long_html,
        ));

        match client.get_user("7") {
            Err(ApiError::Http { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_data_is_not_found() {
        let (client, _) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/sample-requests/sr-9",
            200,
            json!({"success": true, "data": null}),
        ));

        let err = client.get_sample_request("sr-9").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_transport_failure_propagates() {
        let (client, _) = client(MockTransport::new().fail(
            HttpMethod::Get,
            "/health",
            TransportError::Timeout("5s".into()),
        ));
        assert!(client.health_check(None).unwrap_err().is_timeout());
    }

    #[test]
    fn test_search_doctors_sends_query() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Get,
            "/doctors/search",
            200,
            json!({"success": true, "data": {
                "foundDoctors": [{"id": "d1", "name": "Dr. Sami", "specialty": "Cardiology"}],
                "searchQuery": "sami",
                "statistics": {"totalDoctors": 1, "totalVisits": 0},
                "visits": []
            }}),
        ));

        let result = client.search_doctors("sami").unwrap();
        assert_eq!(result.found_doctors.len(), 1);
        assert_eq!(
            mock.requests()[0].query,
            vec![("q".to_string(), "sami".to_string())]
        );
    }

    #[test]
    fn test_create_product_body() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Post,
            "/products",
            201,
            json!({"success": true, "data": {"id": "P9", "name": "Zyrtec"}}),
        ));

        let mut product = Product::new("", "Zyrtec", 0.0);
        product.code = "ZYR".into();
        let created = client.create_product(&ProductPayload::from(&product)).unwrap();
        assert_eq!(created.id, "P9");

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["PRODUCT"], "Zyrtec");
        assert_eq!(body["CODE"], "ZYR");
    }

    #[test]
    fn test_update_product_path() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Put,
            "/products/P%2F1",
            200,
            json!({"id": "P/1", "name": "Renamed"}),
        ));

        let payload = ProductPayload::from(&Product::new("P/1", "Renamed", 1.0));
        let updated = client.update_product("P/1", &payload).unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(mock.requests()[0].method, HttpMethod::Put);
    }

    #[test]
    fn test_marketing_activity_created() {
        let (client, mock) = client(MockTransport::new().respond(
            HttpMethod::Post,
            "/marketing-activities",
            201,
            json!({"success": true, "data": {"_id": "ma-1"}}),
        ));

        let created = client
            .create_marketing_activity(&MarketingActivity {
                english: "Medical convention".into(),
                arabic: "مؤتمر طبي".into(),
                is_active: true,
            })
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("ma-1"));
        assert_eq!(mock.requests()[0].body.clone().unwrap()["isActive"], true);
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("abc-1_2"), "abc-1_2");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }
}
