//! Minimal HTTP/1.1 server with Range support and scripted failures for integration tests.
//!
//! Serves static bodies by path. GET with `Range: bytes=N-` answers 206 (or 416
//! past the end). Each route can fail its first requests with a chosen status.
//! Every request is logged so tests can assert on resume offsets and headers.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Default)]
pub struct Route {
    pub body: Vec<u8>,
    /// Answer this many initial requests with `fail_status`.
    pub fail_first: u32,
    pub fail_status: u32,
}

impl Route {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn failing(status: u32, times: u32, body: Vec<u8>) -> Self {
        Self {
            body,
            fail_first: times,
            fail_status: status,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub path: String,
    pub range_start: Option<u64>,
    pub user_agent: Option<String>,
    pub status: u32,
}

struct State {
    routes: HashMap<String, Route>,
    hits: Mutex<HashMap<String, u32>>,
    log: Mutex<Vec<RequestRecord>>,
    opts: ServerOptions,
}

pub struct TestServer {
    base: String,
    state: Arc<State>,
}

impl TestServer {
    /// Full URL for `path` (e.g. "a.bin" → "http://127.0.0.1:PORT/a.bin").
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self, path: &str) -> Vec<RequestRecord> {
        let wanted = format!("/{}", path);
        self.state
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == wanted)
            .cloned()
            .collect()
    }
}

/// Starts a server in a background thread. Routes are keyed by path without the leading slash.
/// The server runs until the process exits.
pub fn start(routes: HashMap<&str, Route>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(State {
        routes: routes
            .into_iter()
            .map(|(k, v)| (format!("/{}", k), v))
            .collect(),
        hits: Mutex::new(HashMap::new()),
        log: Mutex::new(Vec::new()),
        opts,
    });
    let server_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&server_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}/", port),
        state,
    }
}

fn handle(mut stream: std::net::TcpStream, state: &State) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let parsed = parse_request(request);

    let Some(route) = state.routes.get(&parsed.path) else {
        respond(&mut stream, state, &parsed, 404, &[], b"not found");
        return;
    };

    let hit = {
        let mut hits = state.hits.lock().unwrap();
        let n = hits.entry(parsed.path.clone()).or_insert(0);
        *n += 1;
        *n
    };
    if hit <= route.fail_first {
        respond(&mut stream, state, &parsed, route.fail_status, &[], b"scripted failure");
        return;
    }

    let total = route.body.len() as u64;
    match parsed.range_start.filter(|_| state.opts.support_ranges) {
        Some(start) if start >= total => {
            let cr = format!("Content-Range: bytes */{}", total);
            respond(&mut stream, state, &parsed, 416, &[cr], b"");
        }
        Some(start) => {
            let cr = format!(
                "Content-Range: bytes {}-{}/{}",
                start,
                total.saturating_sub(1),
                total
            );
            respond(&mut stream, state, &parsed, 206, &[cr], &route.body[start as usize..]);
        }
        None => respond(&mut stream, state, &parsed, 200, &[], &route.body),
    }
}

fn respond(
    stream: &mut std::net::TcpStream,
    state: &State,
    req: &ParsedRequest,
    status: u32,
    extra_headers: &[String],
    body: &[u8],
) {
    state.log.lock().unwrap().push(RequestRecord {
        path: req.path.clone(),
        range_start: req.range_start,
        user_agent: req.user_agent.clone(),
        status,
    });
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason(status),
        body.len()
    );
    if state.opts.support_ranges {
        head.push_str("Accept-Ranges: bytes\r\n");
    }
    for h in extra_headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn reason(status: u32) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        404 => "Not Found",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

struct ParsedRequest {
    path: String,
    range_start: Option<u64>,
    user_agent: Option<String>,
}

fn parse_request(request: &str) -> ParsedRequest {
    let mut parsed = ParsedRequest {
        path: String::new(),
        range_start: None,
        user_agent: None,
    };
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if i == 0 {
            parsed.path = line.split_whitespace().nth(1).unwrap_or("/").to_string();
            continue;
        }
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("range") {
            if let Some(spec) = value.strip_prefix("bytes=") {
                if let Some((a, _)) = spec.split_once('-') {
                    parsed.range_start = a.trim().parse::<u64>().ok();
                }
            }
        } else if name.trim().eq_ignore_ascii_case("user-agent") {
            parsed.user_agent = Some(value.to_string());
        }
    }
    parsed
}
