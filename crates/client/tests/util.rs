//! A stub hub server with scripted responses, for exercising the download
//! engine end to end without a network.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

pub struct StubServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<(String, String), Vec<Scripted>>>,
    log: Mutex<Vec<RecordedRequest>>,
}

#[derive(Clone)]
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ScriptedBody,
}

#[derive(Clone)]
pub enum ScriptedBody {
    Bytes(Vec<u8>),
    /// Send the prefix, then keep the connection open without ever
    /// finishing the body.
    Stall(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub range: Option<String>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new().fallback(handler).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        StubServer { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a response for `(method, path)`. Queued responses are consumed
    /// in order, and the final one repeats once the queue drains.
    pub fn script(&self, method: &str, path: &str, response: Scripted) {
        self.state
            .routes
            .lock()
            .unwrap()
            .entry((method.to_owned(), path.to_owned()))
            .or_default()
            .push(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.log.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.state.log.lock().unwrap().clear();
    }
}

async fn handler(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let range = request
        .headers()
        .get("range")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.log.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        range,
    });

    let scripted = {
        let mut routes = state.routes.lock().unwrap();
        match routes.get_mut(&(method, path)) {
            Some(queue) if queue.len() > 1 => Some(queue.remove(0)),
            Some(queue) => queue.first().cloned(),
            None => None,
        }
    };
    let Some(scripted) = scripted else {
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
    };

    let mut builder = Response::builder().status(scripted.status);
    for (name, value) in &scripted.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match scripted.body {
        ScriptedBody::Bytes(bytes) => builder.body(Body::from(bytes)).unwrap(),
        ScriptedBody::Stall(prefix) => {
            let stream = stream::iter([Ok::<Bytes, std::io::Error>(Bytes::from(prefix))])
                .chain(stream::pending());
            builder.body(Body::from_stream(stream)).unwrap()
        }
    }
}

/// A successful probe response: existence, size, etag, and resolved commit.
pub fn probe_ok(size: u64, etag: &str, commit: &str) -> Scripted {
    Scripted {
        status: 200,
        headers: vec![
            ("Content-Length".to_owned(), size.to_string()),
            ("ETag".to_owned(), format!("\"{etag}\"")),
            ("X-Repo-Commit".to_owned(), commit.to_owned()),
        ],
        body: ScriptedBody::Bytes(Vec::new()),
    }
}

pub fn content_ok(body: &[u8]) -> Scripted {
    Scripted {
        status: 200,
        headers: Vec::new(),
        body: ScriptedBody::Bytes(body.to_vec()),
    }
}

pub fn partial_content(body: &[u8], start: u64, total: u64) -> Scripted {
    Scripted {
        status: 206,
        headers: vec![(
            "Content-Range".to_owned(),
            format!("bytes {start}-{}/{total}", total - 1),
        )],
        body: ScriptedBody::Bytes(body.to_vec()),
    }
}

pub fn json_ok(value: serde_json::Value, headers: Vec<(String, String)>) -> Scripted {
    let mut headers = headers;
    headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
    Scripted {
        status: 200,
        headers,
        body: ScriptedBody::Bytes(serde_json::to_vec(&value).unwrap()),
    }
}
