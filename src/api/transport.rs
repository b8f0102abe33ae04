//! HTTP transport
//!
//! The wire seam of the console. `HttpTransport` moves one request to the
//! backend and hands back the raw status and body; everything above it
//! (bearer handling, envelope decoding, error normalization) lives in
//! [`crate::api::client`]. Only failures where no response arrived surface as
//! errors here.

use crate::core::config::ApiConfig;
use crate::core::error::{ApiResult, ConsoleError, ErrorInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One field of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        /// Guessed from `file_name` when absent
        mime: Option<String>,
    },
}

/// Multipart form used by profile and logo uploads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: None,
        });
        self
    }

    /// Text fields as `(name, value)` pairs, in insertion order
    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().filter_map(|part| match part {
            FormPart::Text { name, value } => Some((name.as_str(), value.as_str())),
            FormPart::File { .. } => None,
        })
    }

    fn into_reqwest(self) -> ApiResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();

        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mime = mime.unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                    let part = reqwest::multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| ErrorInfo::invalid(format!("Invalid MIME type '{}': {}", mime, e)))?;
                    form.part(name, part)
                }
            };
        }

        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A fully resolved request, ready for the wire
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`
    pub path: String,
    pub body: RequestBody,
    pub bearer: Option<String>,
    pub request_id: Uuid,
}

/// Status and body exactly as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the backend
///
/// Implementations never retry and never interpret the status code: a 500 is
/// a successful transport outcome. `Err` is reserved for requests that got no
/// response at all and always carries `status_code: None`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ApiResult<RawResponse>;
}

/// Transport backed by a shared reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> crate::core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConsoleError::HttpClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<RawResponse> {
        let url = self.url(&request.path);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request.request_id.to_string());

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };

        let response = builder.send().await.map_err(describe_transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(describe_transport_error)?
            .to_vec();

        debug!(
            request_id = %request.request_id,
            status,
            bytes = body.len(),
            "Response received"
        );

        Ok(RawResponse { status, body })
    }
}

fn describe_transport_error(err: reqwest::Error) -> ErrorInfo {
    if err.is_timeout() {
        ErrorInfo::transport(format!("Request timed out: {}", err))
    } else if err.is_connect() {
        ErrorInfo::transport(format!("Could not reach the server: {}", err))
    } else {
        ErrorInfo::transport(format!("Network error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_backend() -> String {
        async fn echo(headers: HeaderMap) -> Json<Value> {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string())
            };
            Json(json!({
                "authorization": header("authorization"),
                "request_id": header("x-request-id"),
                "content_type": header("content-type"),
            }))
        }

        async fn reject(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            let dni = body.get("dni").cloned().unwrap_or(Value::Null);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "The dni field is required.", "dni": dni })),
            )
        }

        let app = Router::new()
            .route("/api/echo", get(echo))
            .route("/api/users", post(reject))
            .route("/api/users/7", put(echo));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/api/", addr)
    }

    fn transport(base_url: &str) -> ReqwestTransport {
        ReqwestTransport::new(&ApiConfig {
            base_url: base_url.to_string(),
            timeout: 5,
            connect_timeout: 2,
            user_agent: "inventory-console-tests".to_string(),
        })
        .unwrap()
    }

    fn request(method: Method, path: &str, body: RequestBody, bearer: Option<&str>) -> ApiRequest {
        ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: bearer.map(|b| b.to_string()),
            request_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_bearer_and_request_id_attached() {
        let transport = transport(&spawn_backend().await);
        let req = request(Method::Get, "/echo", RequestBody::Empty, Some("abc"));
        let request_id = req.request_id.to_string();

        let response = transport.send(req).await.unwrap();
        assert_eq!(response.status, 200);

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["authorization"], "Bearer abc");
        assert_eq!(body["request_id"], request_id.as_str());
    }

    #[tokio::test]
    async fn test_bearer_omitted_without_token() {
        let transport = transport(&spawn_backend().await);
        let response = transport
            .send(request(Method::Get, "/echo", RequestBody::Empty, None))
            .await
            .unwrap();

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["authorization"], Value::Null);
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_error() {
        let transport = transport(&spawn_backend().await);
        let response = transport
            .send(request(
                Method::Post,
                "/users",
                RequestBody::Json(json!({ "dni": "12345678" })),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 422);
        assert!(!response.is_success());
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["dni"], "12345678");
    }

    #[tokio::test]
    async fn test_multipart_body() {
        let transport = transport(&spawn_backend().await);
        let form = MultipartForm::new()
            .text("name", "Ana")
            .file("avatar", "avatar.png", vec![0x89, 0x50, 0x4e, 0x47]);

        let response = transport
            .send(request(Method::Put, "/users/7", RequestBody::Multipart(form), Some("abc")))
            .await
            .unwrap();

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert!(body["content_type"]
            .as_str()
            .unwrap()
            .starts_with("multipart/form-data"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = transport(&format!("http://{}/api", addr));
        let error = transport
            .send(request(Method::Get, "/echo", RequestBody::Empty, None))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Transport);
        assert_eq!(error.status_code, None);
    }

    #[test]
    fn test_url_joining() {
        let transport = transport("http://127.0.0.1:8000/api/");
        assert_eq!(transport.url("/users/3"), "http://127.0.0.1:8000/api/users/3");
        assert_eq!(transport.url("roles"), "http://127.0.0.1:8000/api/roles");
    }

    #[test]
    fn test_form_text_fields() {
        let form = MultipartForm::new()
            .text("name", "Ana")
            .file("logo", "logo.jpg", vec![1, 2, 3])
            .text("phone", "555");
        let fields: Vec<_> = form.text_fields().collect();
        assert_eq!(fields, vec![("name", "Ana"), ("phone", "555")]);
    }
}
