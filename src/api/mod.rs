//! Backend API access
//!
//! - `transport`: the wire seam (reqwest in production, scripted in tests)
//! - `client`: verb helpers, bearer attachment and error normalization
//! - `models`: typed records, form payloads and bulk rows per resource

pub mod client;
pub mod models;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use client::{Ack, ApiClient, Envelope, Response, UploadSummary};
pub use transport::{HttpTransport, Method, MultipartForm, ReqwestTransport, RequestBody};
