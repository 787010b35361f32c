//! Backend data service client for the wizard engine.
//!
//! This crate abstracts the commerce backend the journeys talk to: catalog
//! reads, one-time passcode issue and verification, and final submission.
//! Catalog reads are idempotent; submissions carry a client-generated
//! idempotency key so a retried POST has at most one effect.
//!
//! Failures surface as classified [`ErrorNotice`] values. The flow
//! controller converts them into machine input; no backend error ever
//! reaches a journey unclassified.

use async_trait::async_trait;
use thiserror::Error;
use wizard_types::{
	Catalog, CodeDelivery, ErrorNotice, FailureCode, IssueCodeRequest, Journey, SubmissionReceipt,
	SubmissionRequest, Verification, VerifyCodeRequest,
};

/// Time-to-live cache for catalog reads.
pub mod cache;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during backend operations.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
	/// A classified failure from the backend or the transport.
	#[error("{0}")]
	Failed(ErrorNotice),
	/// The implementation was misconfigured.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl BackendError {
	/// The classified notice to feed back into a state machine.
	pub fn into_notice(self) -> ErrorNotice {
		match self {
			BackendError::Failed(notice) => notice,
			BackendError::Configuration(message) => {
				ErrorNotice::new(FailureCode::ServiceUnavailable, message)
			}
		}
	}
}

/// Trait defining the interface to the commerce backend.
#[async_trait]
pub trait BackendInterface: Send + Sync {
	/// Fetches the catalog for a journey. Idempotent read.
	async fn fetch_catalog(&self, journey: Journey) -> Result<Catalog, BackendError>;

	/// Sends a one-time passcode to the requested channel.
	async fn issue_code(&self, request: IssueCodeRequest) -> Result<CodeDelivery, BackendError>;

	/// Verifies a typed passcode. A wrong code is a classified failure
	/// ([`FailureCode::IncorrectCode`]), not a success with a flag.
	async fn verify_code(&self, request: VerifyCodeRequest) -> Result<Verification, BackendError>;

	/// Submits the completed order, subscription or registration.
	async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionReceipt, BackendError>;
}

/// Type alias for backend factory functions.
pub type BackendFactory = fn(&toml::Value) -> Result<Box<dyn BackendInterface>, BackendError>;

/// Service wrapping the configured backend implementation.
///
/// The service is the seam the flow controller calls through; it adds call
/// logging and keeps the trait object behind one owner.
pub struct BackendService {
	implementation: Box<dyn BackendInterface>,
}

impl BackendService {
	/// Creates the service around an implementation.
	pub fn new(implementation: Box<dyn BackendInterface>) -> Self {
		Self { implementation }
	}

	/// Fetches the catalog for a journey.
	pub async fn fetch_catalog(&self, journey: Journey) -> Result<Catalog, BackendError> {
		tracing::debug!(journey = %journey, "Fetching catalog");
		self.implementation.fetch_catalog(journey).await
	}

	/// Sends a one-time passcode.
	pub async fn issue_code(&self, request: IssueCodeRequest) -> Result<CodeDelivery, BackendError> {
		tracing::debug!(journey = %request.journey, channel = request.channel.as_str(), "Issuing code");
		self.implementation.issue_code(request).await
	}

	/// Verifies a typed passcode.
	pub async fn verify_code(
		&self,
		request: VerifyCodeRequest,
	) -> Result<Verification, BackendError> {
		tracing::debug!(journey = %request.journey, "Verifying code");
		self.implementation.verify_code(request).await
	}

	/// Submits the completed journey.
	pub async fn submit(
		&self,
		request: SubmissionRequest,
	) -> Result<SubmissionReceipt, BackendError> {
		tracing::debug!(
			journey = %request.journey,
			idempotency_key = %request.idempotency_key,
			"Submitting"
		);
		self.implementation.submit(request).await
	}
}
