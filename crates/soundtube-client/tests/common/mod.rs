//! Shared fixtures: a scripted transport that records every request, and a
//! notifier that records every view event.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use soundtube_client::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use soundtube_client::{SoundClient, ViewEvent, ViewNotifier};
use soundtube_proto::storage::{MemorySessionStorage, TOKEN_KEY, USER_NAME_KEY};

type Scripted = Result<ApiResponse, String>;

/// Responses are queued per `(method, path)`.  The last queued response for
/// a route is sticky and answers every further call.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.push(method, path, Ok(ApiResponse::new(status, body)))
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Err(message.to_string()))
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// `"METHOD path"` for every call, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let key = (request.method, request.path.clone());
        self.calls.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&key);
        let scripted = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError(message)),
            None => Err(TransportError(format!("no scripted response for {} {}", key.0, key.1))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ViewNotifier for RecordingNotifier {
    fn notify(&self, event: &ViewEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn logged_in_storage() -> Arc<MemorySessionStorage> {
    Arc::new(MemorySessionStorage::with_entries([
        (TOKEN_KEY, "tok-1"),
        (USER_NAME_KEY, "alice"),
    ]))
}

pub fn anonymous_storage() -> Arc<MemorySessionStorage> {
    Arc::new(MemorySessionStorage::new())
}

pub fn client_with(
    transport: &Arc<MockTransport>,
    storage: Arc<MemorySessionStorage>,
) -> (SoundClient, Arc<RecordingNotifier>) {
    let notifier = RecordingNotifier::new();
    let client = SoundClient::new(transport.clone(), storage, notifier.clone());
    (client, notifier)
}

pub const TRACKS_BODY: &str = r#"[
    {"id": 42, "name": "Night Drive", "album": "Roads", "genre": "Synthwave", "file_path": "uploads/Night Drive.mp3", "author_id": 1},
    {"id": 43, "title": "Sketch", "filename": "uploads/Sketch.ogg"}
]"#;
