//! Scripted backend doubles shared by the unit tests.

use crate::app_lib::{AppError, HttpRequest, HttpResponse, SessionExpiry, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::sync::oneshot;

enum Reply {
    Ready(HttpResponse),
    Gated(oneshot::Receiver<HttpResponse>),
    Hang,
}

/// Transport answering from per-route queues of scripted replies.
///
/// Unscripted routes answer `404`. Gated replies wait until the test releases
/// them, which lets tests choose the order in which in-flight calls complete.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn reply(&self, method: Method, path: &str, response: HttpResponse) {
        self.push(method, path, Reply::Ready(response));
    }

    pub(crate) fn reply_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.reply(method, path, HttpResponse::json(status, &body));
    }

    /// Queues a reply that is only delivered once the returned sender fires.
    pub(crate) fn gate(&self, method: Method, path: &str) -> oneshot::Sender<HttpResponse> {
        let (sender, receiver) = oneshot::channel();
        self.push(method, path, Reply::Gated(receiver));
        sender
    }

    /// Queues a reply that never arrives.
    pub(crate) fn hang(&self, method: Method, path: &str) {
        self.push(method, path, Reply::Hang);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == *method && request.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(request.method.clone(), request.path.clone()))
            .and_then(VecDeque::pop_front);
        self.requests.lock().unwrap().push(request);

        match reply {
            None => Ok(HttpResponse::new(404, "")),
            Some(Reply::Ready(response)) => Ok(response),
            Some(Reply::Gated(receiver)) => receiver
                .await
                .map_err(|_| AppError::Network("gate dropped".to_string())),
            Some(Reply::Hang) => std::future::pending().await,
        }
    }
}

/// Expiry hook that latches like the session does and counts calls.
#[derive(Default)]
pub(crate) struct CountingExpiry {
    expired: AtomicBool,
    calls: AtomicUsize,
}

impl CountingExpiry {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionExpiry for CountingExpiry {
    fn expire(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        !self.expired.swap(true, Ordering::SeqCst)
    }
}

/// CSRF endpoint reply that also sets the matching cookie.
pub(crate) fn csrf_reply(token: &str) -> HttpResponse {
    HttpResponse::json(200, &json!({ "csrfToken": token }))
        .with_cookie(format!("csrftoken={token}; Path=/; SameSite=Lax"))
}

pub(crate) fn user_json(id: u64, username: &str, email: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": email,
        "first_name": "",
        "last_name": "",
        "is_active": true,
        "date_joined": "2024-05-01T09:30:00Z"
    })
}
