//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a single static body to every GET. Can cut the body short, hold
//! each connection for a while before answering, and answer with a non-2xx
//! status. Counts requests and the peak number of connections served at once.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BodyServerOptions {
    /// Close the connection after this many body bytes (Content-Length still announces the full body).
    pub truncate_after: Option<usize>,
    /// Wait this long before sending the response.
    pub delay: Duration,
    pub status: u16,
}

impl Default for BodyServerOptions {
    fn default() -> Self {
        Self {
            truncate_after: None,
            delay: Duration::ZERO,
            status: 200,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct BodyServer {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    last_request: Arc<Mutex<String>>,
}

impl BodyServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Highest number of connections that were being served at the same time.
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Raw text of the most recent request head.
    pub fn last_request(&self) -> String {
        self.last_request.lock().unwrap().clone()
    }
}

pub fn start(body: Vec<u8>) -> BodyServer {
    start_with_options(body, BodyServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: BodyServerOptions) -> BodyServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = BodyServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests: Arc::new(AtomicUsize::new(0)),
        active: Arc::new(AtomicUsize::new(0)),
        peak: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(String::new())),
    };
    let body = Arc::new(body);
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let shared = shared.clone();
            thread::spawn(move || handle(stream, &body, opts, &shared));
        }
    });
    server
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: BodyServerOptions, server: &BodyServer) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]).to_string();
    server.requests.fetch_add(1, Ordering::SeqCst);
    *server.last_request.lock().unwrap() = request;

    let now_active = server.active.fetch_add(1, Ordering::SeqCst) + 1;
    server.peak.fetch_max(now_active, Ordering::SeqCst);

    if !opts.delay.is_zero() {
        thread::sleep(opts.delay);
    }
    let reason = if opts.status == 200 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n\r\n",
        opts.status,
        reason,
        body.len()
    );
    let sent = opts.truncate_after.unwrap_or(body.len()).min(body.len());
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body[..sent]);
    let _ = stream.flush();

    server.active.fetch_sub(1, Ordering::SeqCst);
}
