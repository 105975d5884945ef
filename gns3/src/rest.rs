
use std::fmt;

use log::{debug, trace};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::attr::AttrBag;
use crate::config::{Config, ConfigError};

pub type RResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Unable to reach the GNS3 controller")]
	Network(#[from] reqwest::Error),
	#[error(transparent)]
	Response(#[from] ApiError),
	#[error("Unable to (de)serialize JSON")]
	Serialization(#[from] serde_json::Error),
	#[error("Bad configuration")]
	Config(#[from] ConfigError),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Unsupported status: {0}")]
	UnsupportedStatus(String),
}

impl Error {
	/// True for a 404 from the controller, or a lookup that came up empty.
	pub fn is_not_found(&self) -> bool {
		match self {
			Error::NotFound(_) => true,
			Error::Response(ApiError { error_type: ApiErrorType::Status(404, _), .. }) => true,
			_ => false,
		}
	}
}

#[derive(Debug, Error)]
#[error("{endpoint}: {error_type}")]
pub struct ApiError {
	endpoint: String,
	error_type: ApiErrorType,
}
impl ApiError {
	fn new(endpoint: impl Into<String>, error_type: ApiErrorType) -> ApiError {
		ApiError {
			endpoint: endpoint.into(),
			error_type,
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// The HTTP status, when the controller answered with an error status.
	pub fn status(&self) -> Option<u16> {
		match &self.error_type {
			ApiErrorType::Status(s, _) => Some(*s),
			_ => None,
		}
	}
}

#[derive(Debug)]
enum ApiErrorType {
	/// Catch-all
	Unknown(String),

	/// The controller answered with a non-success status. Contains the status, and the error message it gave.
	Status(u16, String),

	/// Got a response of an unexpected shape
	BadResponse(String, String),

	/// Error decoding a JSON response. Contains erroring JSON, as well as decoding error.
	JsonDecode(String, String, serde_json::Error),
}
impl ApiErrorType {
	fn unknown<S: Into<String>>(s: S) -> ApiErrorType {
		ApiErrorType::Unknown(s.into())
	}
}
impl fmt::Display for ApiErrorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiErrorType::Unknown(s) => f.write_str(s),
			ApiErrorType::Status(status, msg) => write!(f, "status {}: {}", status, msg),
			ApiErrorType::BadResponse(msg, body) => write!(f, "{}: {}", msg, body),
			ApiErrorType::JsonDecode(msg, body, e) => write!(f, "{} ({}): {}", msg, e, body),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawApiResponse {
	None,
	PlainText(String),
	Json(Value),
}
impl RawApiResponse {
	async fn extract(resp: Response) -> RResult<(u16, RawApiResponse)> {
		let endpoint = resp.url().path().to_string();
		let status = resp.status().as_u16();
		let content_type = resp.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|ct| ct.to_str().ok())
			.map(|ct| ct.to_ascii_lowercase());
		let text = resp.text().await?;

		if text.is_empty() {
			return Ok((status, RawApiResponse::None));
		}
		match content_type.as_deref() {
			Some(ct) if ct.starts_with("application/json") => {
				serde_json::from_str::<Value>(&text)
					.map(|as_v| (status, RawApiResponse::Json(as_v)))
					.map_err(|e| ApiError::new(endpoint, ApiErrorType::JsonDecode("Unable to parse returned JSON".into(), text, e)).into())
			},
			Some(ct) if ct.starts_with("text/") => Ok((status, RawApiResponse::PlainText(text))),
			// some error pages come back without a content type, but carry JSON anyway
			None => match serde_json::from_str::<Value>(&text) {
				Ok(v) => Ok((status, RawApiResponse::Json(v))),
				Err(_) => Ok((status, RawApiResponse::PlainText(text))),
			},
			Some(ct) => Err(ApiError::new(endpoint, ApiErrorType::unknown(format!("unknown content-type: `{}`", ct))).into()),
		}
	}

	/// The error message GNS3 puts in failed responses, or the body itself.
	fn message(&self) -> String {
		/// Error body of the v2 API
		#[derive(Deserialize)]
		struct ErrorBody {
			message: String,
		}

		match self {
			RawApiResponse::None => String::new(),
			RawApiResponse::PlainText(s) => s.clone(),
			RawApiResponse::Json(j) => serde_json::from_value::<ErrorBody>(j.clone())
				.map(|eb| eb.message)
				.unwrap_or_else(|_| j.to_string()),
		}
	}
}

fn is_success(status: u16) -> bool {
	(200..300).contains(&status)
}

fn get_gns3_client() -> RResult<Client> {
	let builder = Client::builder()
		.danger_accept_invalid_certs(true); // local controllers tend to be self-signed

	// the stub controller listens on loopback, keep any configured proxy out of the way
	#[cfg(test)]
	let builder = builder.no_proxy();

	builder
		.build()
		.map_err(Error::Network)
}

/// Handle to a GNS3 controller. Every resource operation borrows one.
#[derive(Debug, Clone)]
pub struct Gns3Api {
	client: Client,
	config: Config,
	base: String,
}

impl Gns3Api {
	pub fn new(config: Config) -> RResult<Gns3Api> {
		Ok(Gns3Api {
			client: get_gns3_client()?,
			base: config.base_url(),
			config,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
	/// Root of the API, e.g. `http://localhost:3080/v2`
	pub fn base(&self) -> &str {
		&self.base
	}

	fn request<D: fmt::Display>(&self, method: Method, path: D) -> RequestBuilder {
		let url = format!("{}{}", self.base, path);
		trace!("{} {}", method, url);
		let builder = self.client.request(method, url.as_str());
		match self.config.credentials() {
			Some((user, pass)) => builder.basic_auth(user, pass),
			None => builder,
		}
	}

	/// Performs a GET request to `path`
	pub async fn get<D: fmt::Display>(&self, path: D) -> RResult<(u16, RawApiResponse)> {
		let resp = self.request(Method::GET, path).send().await?;
		RawApiResponse::extract(resp).await
	}

	/// Performs a POST request to `path`, with `body` as its JSON payload
	pub async fn post<D: fmt::Display>(&self, path: D, body: &Value) -> RResult<(u16, RawApiResponse)> {
		let resp = self.request(Method::POST, path).json(body).send().await?;
		RawApiResponse::extract(resp).await
	}

	/// Performs a DELETE request to `path`
	pub async fn delete<D: fmt::Display>(&self, path: D) -> RResult<(u16, RawApiResponse)> {
		let resp = self.request(Method::DELETE, path).send().await?;
		RawApiResponse::extract(resp).await
	}

	/// Gets `path` and decodes its JSON body as `T`. Any non-2xx status is an error.
	pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RResult<T> {
		let (status, rresp) = self.get(path).await?;
		match (status, rresp) {
			(status, RawApiResponse::Json(j)) if is_success(status) => {
				match serde_json::from_value::<T>(j.clone()) {
					Ok(t) => Ok(t),
					Err(sje) => Err(ApiError::new(path, ApiErrorType::JsonDecode("Unable to read JSON response as a proper type".into(), j.to_string(), sje)).into()),
				}
			},
			(status, rresp) => Err(unexpected(path, status, &rresp)),
		}
	}

	/// Gets a single resource as an attribute bag.
	pub async fn get_bag(&self, path: &str) -> RResult<AttrBag> {
		self.get_json::<AttrBag>(path).await
	}

	/// Gets a list of resources, each still a plain JSON object.
	pub async fn get_list(&self, path: &str) -> RResult<Vec<Map<String, Value>>> {
		self.get_json::<Vec<Map<String, Value>>>(path).await
	}

	/// Posts `body` to `path` and expects one of the `accepted` statuses back.
	pub async fn post_expect(&self, path: &str, body: &Value, accepted: &[u16]) -> RResult<RawApiResponse> {
		let (status, rresp) = self.post(path, body).await?;
		debug!("POST {} -> {}", path, status);
		if accepted.contains(&status) {
			Ok(rresp)
		} else {
			Err(unexpected(path, status, &rresp))
		}
	}

	/// Deletes `path`, expecting any 2xx status.
	pub async fn delete_expect(&self, path: &str) -> RResult<()> {
		let (status, rresp) = self.delete(path).await?;
		debug!("DELETE {} -> {}", path, status);
		if is_success(status) {
			Ok(())
		} else {
			Err(unexpected(path, status, &rresp))
		}
	}
}

/// Builds the error for a response that wasn't what the caller asked for.
fn unexpected(endpoint: &str, status: u16, rresp: &RawApiResponse) -> Error {
	if is_success(status) {
		ApiError::new(endpoint, ApiErrorType::BadResponse(format!("Unexpected response for status {}", status), format!("{:?}", rresp))).into()
	} else {
		ApiError::new(endpoint, ApiErrorType::Status(status, rresp.message())).into()
	}
}

/// Pulls the string member `key` out of a JSON response.
pub(crate) fn json_str(endpoint: &str, rresp: &RawApiResponse, key: &str) -> RResult<String> {
	match rresp {
		RawApiResponse::Json(Value::Object(m)) => match m.get(key).and_then(Value::as_str) {
			Some(s) => Ok(s.to_string()),
			None => Err(ApiError::new(endpoint, ApiErrorType::BadResponse(format!("response is missing `{}`", key), Value::Object(m.clone()).to_string())).into()),
		},
		other => Err(ApiError::new(endpoint, ApiErrorType::BadResponse(format!("expected a JSON object with `{}`", key), format!("{:?}", other))).into()),
	}
}
