//! REST client
//!
//! One helper per verb on top of an [`HttpTransport`]. The client owns the
//! bearer token slot, stamps each request with an `X-Request-Id`, and turns
//! every non-2xx status into an [`ErrorInfo`] carrying the server's message.

use crate::api::transport::{ApiRequest, HttpTransport, Method, MultipartForm, RequestBody};
use crate::core::error::{ApiResult, ErrorInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Decoded response together with the status it arrived with
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub status: u16,
    pub body: T,
    /// JSON exactly as received, for as long as `body` is a straight decode of it
    pub raw: Option<Value>,
}

impl<T> Response<T> {
    pub fn new(status: u16, body: T) -> Self {
        Self {
            status,
            body,
            raw: None,
        }
    }

    /// Transform the body; the received JSON no longer describes it
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response::new(self.status, f(self.body))
    }
}

impl<T> Response<Envelope<T>> {
    /// Unwrap `data`, failing with a decode error when the server sent none
    pub fn into_data(self) -> ApiResult<Response<T>> {
        let status = self.status;
        let raw = self.raw.and_then(|mut raw| raw.get_mut("data").map(Value::take));
        match self.body.data {
            Some(data) => Ok(Response {
                status,
                body: data,
                raw,
            }),
            None => Err(ErrorInfo::decode(
                self.body
                    .message
                    .unwrap_or_else(|| "Response carried no data".to_string()),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Standard `{ data, success, message }` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Success indicator returned by deletes, role changes and logout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server summary of a bulk upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl UploadSummary {
    /// The message may sit at the top level or inside `data`
    pub fn resolved_message(&self) -> Option<&str> {
        self.message.as_deref().or_else(|| {
            self.details
                .get("data")
                .and_then(|data| data.get("message"))
                .and_then(Value::as_str)
        })
    }
}

/// REST client shared by every container
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    bearer: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            bearer: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the bearer token attached to subsequent requests
    pub fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Response<T>> {
        self.send(Method::Get, path, RequestBody::Empty).await
    }

    /// POST without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Response<T>> {
        self.send(Method::Post, path, RequestBody::Empty).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Post, path, RequestBody::Json(to_json(body)?)).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ApiResult<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Put, path, RequestBody::Json(to_json(body)?)).await
    }

    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> ApiResult<Response<T>> {
        self.send(Method::Put, path, RequestBody::Multipart(form)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Response<T>> {
        self.send(Method::Delete, path, RequestBody::Empty).await
    }

    /// DELETE with a JSON body (role removal)
    pub async fn delete_json<B, T>(&self, path: &str, body: &B) -> ApiResult<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::Delete, path, RequestBody::Json(to_json(body)?)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ApiResult<Response<T>> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: self.bearer(),
            request_id: Uuid::new_v4(),
        };
        let request_id = request.request_id;

        debug!(%request_id, method = method.as_str(), path, "Dispatching request");

        let raw = self.transport.send(request).await.map_err(|error| {
            warn!(%request_id, path, "Request failed: {}", error);
            error
        })?;

        if !raw.is_success() {
            let error = ErrorInfo::http(raw.status, error_message(raw.status, &raw.body));
            warn!(
                %request_id,
                path,
                status = raw.status,
                error_type = error.error_type(),
                "Request rejected: {}",
                error
            );
            return Err(error);
        }

        let (body, json) = decode_body(&raw.body).map_err(|error| {
            warn!(%request_id, path, "Undecodable response: {}", error);
            error
        })?;

        Ok(Response {
            status: raw.status,
            body,
            raw: Some(json),
        })
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ErrorInfo::invalid(format!("Unserializable payload: {}", e)))
}

/// Decode the body, keeping the parsed JSON next to the typed value
///
/// An empty body (204, bodiless 200) decodes as `{}`.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<(T, Value)> {
    let json = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(body).map_err(|e| ErrorInfo::decode(format!("Unexpected response body: {}", e)))?
    };

    let typed = T::deserialize(&json).map_err(|e| ErrorInfo::decode(format!("Unexpected response body: {}", e)))?;
    Ok((typed, json))
}

/// Server-provided `message` (or `error`), else the canonical reason phrase
fn error_message(status: u16, body: &[u8]) -> String {
    let from_body = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|field| value.get(field).and_then(Value::as_str).map(str::to_string))
    });

    from_body.unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Request failed")
            .to_string()
    })
}
