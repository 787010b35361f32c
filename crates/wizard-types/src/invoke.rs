//! Async operation descriptors, request and result payloads.
//!
//! An invoking state names exactly one [`Operation`]. The flow controller
//! turns the operation into a backend call, and delivers the settled
//! [`InvokeOutcome`] back to the machine. Success payloads are typed so the
//! merge into context is explicit rather than a free-form map update.

use crate::catalog::Catalog;
use crate::contact::OtpChannel;
use crate::failure::ErrorNotice;
use crate::journey::Journey;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The async operations an invoking state can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
	/// Idempotent catalog read for the journey.
	FetchCatalog,
	/// Send a one-time passcode to the chosen channel.
	IssueCode,
	/// Verify the typed passcode.
	VerifyCode,
	/// Submit the completed order, subscription or registration.
	Submit,
}

impl Operation {
	/// Returns the stable name for this operation.
	pub fn as_str(&self) -> &'static str {
		match self {
			Operation::FetchCatalog => "fetchCatalog",
			Operation::IssueCode => "issueCode",
			Operation::VerifyCode => "verifyCode",
			Operation::Submit => "submit",
		}
	}
}

/// Request to send a one-time passcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
	pub journey: Journey,
	pub channel: OtpChannel,
	/// Unmasked destination: a mobile number or email address.
	pub destination: String,
}

/// Request to verify a typed passcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
	pub journey: Journey,
	pub channel: OtpChannel,
	pub destination: String,
	pub code: String,
}

/// Request to submit the completed journey.
///
/// The idempotency key is generated once when checkout begins and reused on
/// every retry, so a duplicated POST has at most one effect server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
	pub journey: Journey,
	pub idempotency_key: Uuid,
	/// Journey-specific submission body.
	pub payload: serde_json::Value,
}

/// Confirmation that a passcode was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDelivery {
	pub channel: OtpChannel,
	/// Masked destination for display.
	pub masked_destination: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in_seconds: Option<u64>,
}

/// Confirmation that a passcode was verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
	pub verified_at: DateTime<Utc>,
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
	/// Backend reference for the accepted order, subscription or registration.
	pub reference: String,
	pub submitted_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total_charged: Option<Decimal>,
}

/// Typed result of a successful operation, merged into context by the
/// machine's success edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvokePayload {
	Catalog(Catalog),
	CodeIssued(CodeDelivery),
	CodeVerified(Verification),
	Submitted(SubmissionReceipt),
}

/// Settled result of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
	Success(InvokePayload),
	Failure(ErrorNotice),
}
