//! Scripted transport for tests
//!
//! Replies are consumed in dispatch order. A gated reply holds its request
//! open until the test releases it, which is how tests force one request to
//! resolve before another that was dispatched earlier.

use crate::api::transport::{ApiRequest, HttpTransport, RawResponse};
use crate::core::error::{ApiResult, ErrorInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::Poll;
use tokio::sync::oneshot;

enum Scripted {
    Ready(ApiResult<RawResponse>),
    Gated(oneshot::Receiver<ApiResult<RawResponse>>),
}

/// Releases a held reply
pub struct Gate {
    sender: oneshot::Sender<ApiResult<RawResponse>>,
}

impl Gate {
    pub fn release(self, status: u16, body: Value) {
        let _ = self.sender.send(Ok(json_response(status, &body)));
    }

    pub fn fail(self, error: ErrorInfo) {
        let _ = self.sender.send(Err(error));
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: Value) {
        self.push(Scripted::Ready(Ok(json_response(status, &body))));
    }

    pub fn reply_raw(&self, status: u16, body: Vec<u8>) {
        self.push(Scripted::Ready(Ok(RawResponse { status, body })));
    }

    pub fn fail(&self, error: ErrorInfo) {
        self.push(Scripted::Ready(Err(error)));
    }

    /// Queue a reply that stays pending until the returned gate is released
    pub fn hold(&self) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.push(Scripted::Gated(receiver));
        Gate { sender }
    }

    /// Every request sent so far, in dispatch order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    fn push(&self, reply: Scripted) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

/// Poll a future exactly once, returning its output if it completed
///
/// Used to dispatch requests in a chosen order before resolving any of them.
pub async fn poll_once<F: Future + Unpin>(future: &mut F) -> Option<F::Output> {
    std::future::poll_fn(|cx| match Pin::new(&mut *future).poll(cx) {
        Poll::Ready(output) => Poll::Ready(Some(output)),
        Poll::Pending => Poll::Ready(None),
    })
    .await
}

fn json_response(status: u16, body: &Value) -> RawResponse {
    RawResponse {
        status,
        body: serde_json::to_vec(body).unwrap(),
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<RawResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();

        match next {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Gated(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(ErrorInfo::transport("gate dropped"))),
            None => Err(ErrorInfo::transport("no scripted reply left")),
        }
    }
}
