#![allow(dead_code)]

use async_trait::async_trait;
use recipe_muse::api_connection::{CompletionError, CompletionService};
use recipe_muse::location::{Coordinates, PlaceDescriptor, PlaceResolver};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Minimal HTTP/1.1 server answering every request with the same status
/// and body, recording what it received.
pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let body = body.to_string();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let recorded = recorded.clone();
                let body = body.clone();
                tokio::spawn(async move {
                    serve_one(stream, status, &body, &recorded).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body_end = buffer.len().min(header_end + content_length);
    let request_body = String::from_utf8_lossy(&buffer[header_end..body_end]).to_string();

    // Record before answering so the client never observes a reply first.
    recorded.lock().unwrap().push(RecordedRequest {
        request_line,
        headers,
        body: request_body,
    });

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await.ok()?;
    stream.shutdown().await.ok()?;
    Some(())
}

/// Completion stub that records every call and answers through `reply`.
pub struct RecordingCompletion {
    pub calls: Mutex<Vec<(String, String)>>,
    reply: Box<dyn Fn(&str, &str) -> Result<String, CompletionError> + Send + Sync>,
}

impl RecordingCompletion {
    pub fn new(reply: impl Fn(&str, &str) -> Result<String, CompletionError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    /// Replies with the prompt it was given, wrapped in double quotes.
    pub fn quoted_echo() -> Arc<Self> {
        Self::new(|_, prompt| Ok(format!("\"{}\"", prompt)))
    }

    pub fn fixed(text: &'static str) -> Arc<Self> {
        Self::new(move |_, _| Ok(text.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(|_, _| Err(CompletionError::NoChoices))
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for RecordingCompletion {
    async fn complete(&self, system_role: &str, user_prompt: &str) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_role.to_string(), user_prompt.to_string()));
        (self.reply)(system_role, user_prompt)
    }
}

/// Resolver returning one fixed place and counting lookups.
pub struct FixedResolver {
    pub place: PlaceDescriptor,
    pub lookups: Mutex<Vec<Coordinates>>,
}

impl FixedResolver {
    pub fn new(place: PlaceDescriptor) -> Arc<Self> {
        Arc::new(Self {
            place,
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl PlaceResolver for FixedResolver {
    async fn resolve(&self, coordinates: Coordinates) -> PlaceDescriptor {
        self.lookups.lock().unwrap().push(coordinates);
        self.place.clone()
    }
}

/// Completion stub that holds every call until the test releases it.
pub struct GatedCompletion {
    gate: tokio::sync::Semaphore,
    reply: Result<String, ()>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl GatedCompletion {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            gate: tokio::sync::Semaphore::new(0),
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            gate: tokio::sync::Semaphore::new(0),
            reply: Err(()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Lets `count` pending or future calls complete.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for GatedCompletion {
    async fn complete(&self, system_role: &str, user_prompt: &str) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_role.to_string(), user_prompt.to_string()));
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.reply.clone().map_err(|_| CompletionError::EmptyContent)
    }
}
