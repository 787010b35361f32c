//! HTTP backend implementation.
//!
//! Talks JSON to the commerce backend:
//! - `GET  {base}/api/{journey}/catalog`
//! - `POST {base}/api/{journey}/codes` (issue a passcode)
//! - `POST {base}/api/{journey}/codes/verify`
//! - `POST {base}/api/{journey}/submissions` with an `Idempotency-Key` header
//!
//! Catalog reads go through a [`CatalogCache`] so rapid re-entries into a
//! loading state do not hammer the backend. Failure responses may carry a
//! JSON body `{ "code": "...", "message": "..." }`; a recognized body code
//! takes precedence over the HTTP status when classifying.

use crate::cache::{CatalogCache, SystemClock};
use crate::{BackendError, BackendInterface};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wizard_types::{
	Catalog, CodeDelivery, ErrorNotice, FailureCode, IssueCodeRequest, Journey, SubmissionReceipt,
	SubmissionRequest, Verification, VerifyCodeRequest,
};

/// Configuration for the HTTP backend implementation.
#[derive(Debug, Deserialize)]
struct HttpBackendConfig {
	/// Base URL of the commerce backend, without a trailing slash.
	base_url: String,
	#[serde(default = "default_request_timeout_seconds")]
	request_timeout_seconds: u64,
	#[serde(default = "default_catalog_ttl_seconds")]
	catalog_ttl_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
	30
}

fn default_catalog_ttl_seconds() -> u64 {
	300
}

/// Backend client over HTTP with a TTL'd catalog cache.
pub struct HttpBackend {
	client: reqwest::Client,
	base_url: String,
	cache: CatalogCache<SystemClock>,
}

impl HttpBackend {
	fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.request_timeout_seconds))
			.build()
			.map_err(|e| BackendError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
			cache: CatalogCache::new(config.catalog_ttl_seconds, SystemClock),
		})
	}

	fn url(&self, journey: Journey, path: &str) -> String {
		format!("{}/api/{}/{}", self.base_url, journey.as_str(), path)
	}

	async fn post_json<B, T>(
		&self,
		url: String,
		body: &B,
		idempotency_key: Option<uuid::Uuid>,
	) -> Result<T, BackendError>
	where
		B: Serialize + Sync,
		T: DeserializeOwned,
	{
		let mut request = self.client.post(&url).json(body);
		if let Some(key) = idempotency_key {
			request = request.header("Idempotency-Key", key.to_string());
		}
		let response = request
			.send()
			.await
			.map_err(|e| BackendError::Failed(transport_notice(e)))?;
		decode(response).await
	}
}

#[async_trait]
impl BackendInterface for HttpBackend {
	async fn fetch_catalog(&self, journey: Journey) -> Result<Catalog, BackendError> {
		if let Some(catalog) = self.cache.get(journey) {
			tracing::debug!(journey = %journey, "Catalog served from cache");
			return Ok(catalog);
		}

		let response = self
			.client
			.get(self.url(journey, "catalog"))
			.send()
			.await
			.map_err(|e| BackendError::Failed(transport_notice(e)))?;
		let catalog: Catalog = decode(response).await?;

		self.cache.put(journey, catalog.clone());
		Ok(catalog)
	}

	async fn issue_code(&self, request: IssueCodeRequest) -> Result<CodeDelivery, BackendError> {
		self.post_json(self.url(request.journey, "codes"), &request, None)
			.await
	}

	async fn verify_code(&self, request: VerifyCodeRequest) -> Result<Verification, BackendError> {
		self.post_json(self.url(request.journey, "codes/verify"), &request, None)
			.await
	}

	async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionReceipt, BackendError> {
		self.post_json(
			self.url(request.journey, "submissions"),
			&request,
			Some(request.idempotency_key),
		)
		.await
	}
}

/// Error body the backend attaches to failure responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	code: Option<String>,
	message: Option<String>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
	let status = response.status().as_u16();
	if response.status().is_success() {
		return response.json::<T>().await.map_err(|e| {
			BackendError::Failed(ErrorNotice::new(
				FailureCode::ServiceUnavailable,
				format!("malformed backend response: {}", e),
			))
		});
	}

	let body = response.json::<ErrorBody>().await.unwrap_or_default();
	Err(BackendError::Failed(classify_response(status, body)))
}

fn transport_notice(e: reqwest::Error) -> ErrorNotice {
	if e.is_timeout() {
		ErrorNotice::new(FailureCode::RequestTimeout, "backend call timed out")
	} else {
		ErrorNotice::new(FailureCode::NetworkUnreachable, e.to_string())
	}
}

/// Classifies a failure response. A recognized body code wins; otherwise
/// the status decides, and statuses with no table entry are flagged as
/// unclassified rather than guessed at.
fn classify_response(status: u16, body: ErrorBody) -> ErrorNotice {
	if let Some(code) = body.code.as_deref() {
		if let Ok(parsed) =
			serde_json::from_value::<FailureCode>(serde_json::Value::String(code.to_string()))
		{
			let message = body.message.unwrap_or_else(|| parsed.to_string());
			return ErrorNotice::new(parsed, message);
		}
		tracing::warn!(code, status, "Unrecognized backend failure code");
	}

	let code = match status {
		408 => FailureCode::RequestTimeout,
		400 | 422 => FailureCode::InvalidPayload,
		500..=599 => FailureCode::ServiceUnavailable,
		other => {
			tracing::warn!(status = other, "Unclassified backend status");
			FailureCode::Unclassified(other)
		}
	};
	let message = body.message.unwrap_or_else(|| code.to_string());
	ErrorNotice::new(code, message)
}

/// Factory function to create an HTTP backend from configuration.
///
/// Configuration parameters:
/// - `base_url`: backend base URL (required)
/// - `request_timeout_seconds`: per-call deadline (default: 30)
/// - `catalog_ttl_seconds`: catalog cache lifetime (default: 300)
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, BackendError> {
	let config: HttpBackendConfig = config
		.clone()
		.try_into()
		.map_err(|e| BackendError::Configuration(format!("invalid http backend config: {}", e)))?;

	Ok(Box::new(HttpBackend::new(config)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn body_code_takes_precedence_over_status() {
		let notice = classify_response(
			409,
			ErrorBody {
				code: Some("DUPLICATE_SUBMISSION".to_string()),
				message: Some("already accepted".to_string()),
			},
		);

		assert_eq!(notice.code, FailureCode::DuplicateSubmission);
		assert_eq!(notice.message, "already accepted");
	}

	#[test]
	fn server_errors_classify_as_service_unavailable() {
		let notice = classify_response(503, ErrorBody::default());
		assert_eq!(notice.code, FailureCode::ServiceUnavailable);
	}

	#[test]
	fn rejected_payloads_classify_as_invalid() {
		let notice = classify_response(422, ErrorBody::default());
		assert_eq!(notice.code, FailureCode::InvalidPayload);
	}

	#[test]
	fn unknown_statuses_are_flagged_not_guessed() {
		let notice = classify_response(418, ErrorBody::default());
		assert_eq!(notice.code, FailureCode::Unclassified(418));
		assert!(notice.retryable());
	}

	#[test]
	fn factory_requires_a_base_url() {
		let config: toml::Value = toml::from_str("request_timeout_seconds = 5").unwrap();
		assert!(create_backend(&config).is_err());

		let config: toml::Value = toml::from_str("base_url = \"http://localhost:0\"").unwrap();
		assert!(create_backend(&config).is_ok());
	}
}
