//! Minimal HTTP/1.1 server accepting multipart POSTs for integration tests.
//!
//! Reads the headers and a `Content-Length` body, records what arrived, and
//! answers with a fixed status and a JSON body naming the stored file.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UploadServerOptions {
    /// Status line sent back, e.g. "200 OK".
    pub status: &'static str,
    /// Replaces the default `{"data":{"url":...}}` reply when set.
    pub body: Option<String>,
}

impl Default for UploadServerOptions {
    fn default() -> Self {
        Self {
            status: "200 OK",
            body: None,
        }
    }
}

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub head: String,
    pub body: Vec<u8>,
}

impl Received {
    pub fn body_contains(&self, needle: &[u8]) -> bool {
        self.body.windows(needle.len()).any(|w| w == needle)
    }
}

pub struct UploadServer {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl UploadServer {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start() -> UploadServer {
    start_with_options(UploadServerOptions::default())
}

pub fn start_with_options(opts: UploadServerOptions) -> UploadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let received = Arc::new(Mutex::new(Vec::new()));
    let stored = Arc::new(AtomicUsize::new(0));
    {
        let received = Arc::clone(&received);
        let base = base.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let received = Arc::clone(&received);
                let stored = Arc::clone(&stored);
                let opts = opts.clone();
                let base = base.clone();
                thread::spawn(move || handle(stream, &opts, &base, &received, &stored));
            }
        });
    }
    UploadServer {
        url: format!("{}upload", base),
        received,
    }
}

fn handle(
    mut stream: TcpStream,
    opts: &UploadServerOptions,
    base: &str,
    received: &Mutex<Vec<Received>>,
    stored: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let n = stored.fetch_add(1, Ordering::SeqCst);
    received.lock().unwrap().push(request);

    let body = opts
        .body
        .clone()
        .unwrap_or_else(|| format!(r#"{{"success":true,"data":{{"url":"{}files/{}"}}}}"#, base, n));
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        opts.status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn read_request(stream: &mut TcpStream) -> Option<Received> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let head_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..head_end]).into_owned();
    let length = content_length(&head).unwrap_or(0);
    let mut body = data.split_off(head_end);
    while body.len() < length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(Received { head, body })
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
