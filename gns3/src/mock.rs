//! In-process stand-in for a GNS3 controller, serving canned JSON per route.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::rest::Gns3Api;

/// `(method, path, status, body)`. A `Value::Null` body is sent as an empty response.
pub type Route = (&'static str, &'static str, u16, Value);

#[derive(Debug, Clone)]
pub struct Recorded {
	pub method: String,
	pub path: String,
	pub body: Value,
	pub authorization: Option<String>,
}

pub struct MockController {
	addr: SocketAddr,
	requests: Arc<Mutex<Vec<Recorded>>>,
	task: JoinHandle<()>,
}

impl MockController {
	pub async fn start(routes: Vec<Route>) -> MockController {
		let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock controller");
		let addr = listener.local_addr().expect("mock controller address");
		let routes = Arc::new(routes);
		let requests = Arc::new(Mutex::new(Vec::new()));

		let task = tokio::spawn({
			let requests = requests.clone();
			async move {
				while let Ok((stream, _)) = listener.accept().await {
					tokio::spawn(serve(stream, routes.clone(), requests.clone()));
				}
			}
		});

		MockController { addr, requests, task }
	}

	pub fn config(&self) -> Config {
		Config {
			host: self.addr.ip().to_string(),
			port: self.addr.port(),
			..Config::default()
		}
	}

	pub fn api(&self) -> Gns3Api {
		Gns3Api::new(self.config()).expect("client for mock controller")
	}

	pub fn requests(&self) -> Vec<Recorded> {
		self.requests.lock().expect("requests lock").clone()
	}

	/// `METHOD /path` of every request seen, in order.
	pub fn request_lines(&self) -> Vec<String> {
		self.requests().into_iter()
			.map(|r| format!("{} {}", r.method, r.path))
			.collect()
	}
}

impl Drop for MockController {
	fn drop(&mut self) {
		self.task.abort();
	}
}

fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|window| window == needle)
}

async fn serve(mut stream: TcpStream, routes: Arc<Vec<Route>>, requests: Arc<Mutex<Vec<Recorded>>>) {
	let mut buf = Vec::new();
	let mut chunk = [0u8; 4096];

	let header_end = loop {
		if let Some(i) = find_slice(&buf, b"\r\n\r\n") {
			break i;
		}
		match stream.read(&mut chunk).await {
			Ok(0) | Err(_) => return,
			Ok(n) => buf.extend_from_slice(&chunk[..n]),
		}
	};

	let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
	let mut lines = head.split("\r\n");
	let mut request_line = lines.next().unwrap_or_default().split_whitespace();
	let method = request_line.next().unwrap_or_default().to_string();
	let target = request_line.next().unwrap_or_default();
	let path = target.split('?').next().unwrap_or_default().to_string();

	let mut content_length = 0;
	let mut authorization = None;
	for line in lines {
		if let Some((name, value)) = line.split_once(':') {
			match name.trim().to_ascii_lowercase().as_str() {
				"content-length" => content_length = value.trim().parse().unwrap_or(0),
				"authorization" => authorization = Some(value.trim().to_string()),
				_ => {},
			}
		}
	}

	let body_start = header_end + 4;
	while buf.len() < body_start + content_length {
		match stream.read(&mut chunk).await {
			Ok(0) | Err(_) => break,
			Ok(n) => buf.extend_from_slice(&chunk[..n]),
		}
	}
	let body_end = buf.len().min(body_start + content_length);
	let body = serde_json::from_slice(&buf[body_start..body_end]).unwrap_or(Value::Null);

	let (status, reply) = routes.iter()
		.find(|(m, p, _, _)| *m == method && *p == path)
		.map(|(_, _, status, reply)| (*status, reply.clone()))
		.unwrap_or_else(|| (404, json!({ "message": format!("no route for {} {}", method, path), "status": 404 })));

	requests.lock().expect("requests lock").push(Recorded { method, path, body, authorization });

	let response = if reply.is_null() {
		format!("HTTP/1.1 {} Mock\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status)
	} else {
		let payload = reply.to_string();
		format!(
			"HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
			status, payload.len(), payload,
		)
	};
	let _ = stream.write_all(response.as_bytes()).await;
	let _ = stream.shutdown().await;
}
