//! Mock Brevo API server for testing

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, StatusCode};
use hyper::{Request, Response, body::Incoming};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A request captured by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub method: Method,
	pub path: String,
	/// Header names are lowercased
	pub headers: HashMap<String, String>,
	pub body: String,
}

impl RecordedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}

	pub fn json(&self) -> Value {
		serde_json::from_str(&self.body).unwrap()
	}
}

#[derive(Clone)]
struct MockServerState {
	status: StatusCode,
	response_body: String,
	requests: Vec<RecordedRequest>,
}

/// Mock Brevo server answering `POST /v3/smtp/email`
pub struct MockBrevoServer {
	state: Arc<Mutex<MockServerState>>,
	local_addr: SocketAddr,
}

impl MockBrevoServer {
	/// Create a new mock server replying 201 with a single message id
	pub async fn new() -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let local_addr = listener.local_addr().unwrap();

		let state = Arc::new(Mutex::new(MockServerState {
			status: StatusCode::CREATED,
			response_body: r#"{"messageId": "<201801020304.123@smtp-relay.mailin.fr>"}"#.to_string(),
			requests: Vec::new(),
		}));

		let state_clone = state.clone();
		tokio::spawn(async move {
			let state = state_clone;
			loop {
				if let Ok((stream, _)) = listener.accept().await {
					let io = TokioIo::new(stream);
					let state = state.clone();

					tokio::spawn(async move {
						let mut service =
							hyper::service::service_fn(move |req: Request<Incoming>| {
								let state = state.clone();
								async move { handle_request(req, state).await }
							});

						let _ = hyper::server::conn::http1::Builder::new()
							.serve_connection(io, &mut service)
							.await;
					});
				}
			}
		});

		Self { state, local_addr }
	}

	/// Set the status and body returned for `POST /v3/smtp/email`
	pub fn set_response(&self, status: u16, body: &str) {
		let mut state = self.state.lock().unwrap();
		state.status = StatusCode::from_u16(status).unwrap();
		state.response_body = body.to_string();
	}

	/// Requests received so far, oldest first
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.lock().unwrap().requests.clone()
	}

	/// The most recent request
	pub fn last_request(&self) -> RecordedRequest {
		self.requests().pop().expect("no request received")
	}

	/// API base URL to hand to `BrevoSettings::with_api_url`
	pub fn api_url(&self) -> String {
		format!("http://{}/v3/", self.local_addr)
	}
}

async fn handle_request(
	req: Request<Incoming>,
	state: Arc<Mutex<MockServerState>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
	let method = req.method().clone();
	let path = req.uri().path().to_string();
	let headers = req
		.headers()
		.iter()
		.map(|(name, value)| {
			(
				name.as_str().to_string(),
				value.to_str().unwrap_or_default().to_string(),
			)
		})
		.collect();
	let body = req.into_body().collect().await?.to_bytes();

	let mut state = state.lock().unwrap();
	state.requests.push(RecordedRequest {
		method: method.clone(),
		path: path.clone(),
		headers,
		body: String::from_utf8_lossy(&body).into_owned(),
	});

	match (&method, path.as_str()) {
		(&Method::POST, "/v3/smtp/email") => Ok(Response::builder()
			.status(state.status)
			.header("Content-Type", "application/json")
			.body(Full::from(Bytes::from(state.response_body.clone())))
			.unwrap()),

		_ => Ok(Response::builder()
			.status(StatusCode::NOT_FOUND)
			.body(Full::default())
			.unwrap()),
	}
}
