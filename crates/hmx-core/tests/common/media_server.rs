//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves fixed responses by path and records what each request asked for,
//! so tests can check the headers the downloader sends.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// One received request.
#[derive(Debug, Clone, Default)]
pub struct Seen {
    pub path: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

pub struct MediaServer {
    /// e.g. "http://127.0.0.1:12345/"
    pub base_url: String,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

/// Starts a server in a background thread. Unknown paths get 404. The server
/// runs until the process exits.
pub fn start(routes: HashMap<String, Route>) -> MediaServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_bg = Arc::clone(&seen);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen_bg);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });
    MediaServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        seen,
    }
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Route>, seen: &Mutex<Vec<Seen>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let req = parse_request(request);
    let route = routes.get(&req.path).cloned();
    seen.lock().unwrap().push(req);

    let route = route.unwrap_or(Route {
        status: 404,
        content_type: "text/plain",
        body: b"not found".to_vec(),
    });
    let header = format!(
        "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.content_type,
        route.body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&route.body);
}

fn parse_request(request: &str) -> Seen {
    let mut seen = Seen::default();
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if i == 0 {
            seen.path = line.split_whitespace().nth(1).unwrap_or("/").to_string();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = Some(value.trim().to_string());
            if name.trim().eq_ignore_ascii_case("user-agent") {
                seen.user_agent = value;
            } else if name.trim().eq_ignore_ascii_case("referer") {
                seen.referer = value;
            }
        }
    }
    seen
}
