//! Central classification of backend failures.
//!
//! Every failed backend call is classified exactly once, here, before it
//! reaches a state machine. Recoverable failures route the journey to a
//! retry-capable state with the notice recorded in context; unrecoverable
//! failures route to the journey's failure terminal and purge persisted
//! state. Call sites never re-interpret a failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a backend failure affects the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureClass {
	/// The journey moves to a retry-capable state; the user can try again.
	Recoverable,
	/// The journey ends in its failure terminal; persisted state is purged.
	Unrecoverable,
}

/// The enumerated backend failure conditions.
///
/// Statuses that do not map to a known condition become `Unclassified` and
/// are treated as recoverable; the conversion site logs them so the gap is
/// visible rather than silently guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
	/// The backend could not be reached at all.
	NetworkUnreachable,
	/// The backend answered with a server-side error.
	ServiceUnavailable,
	/// The call exceeded its deadline.
	RequestTimeout,
	/// The submitted one-time passcode was wrong.
	IncorrectCode,
	/// The one-time passcode expired before it was submitted.
	CodeExpired,
	/// The backend rejected the request payload.
	InvalidPayload,
	/// The same submission was already accepted.
	DuplicateSubmission,
	/// The requested resource was claimed by someone else in the meantime.
	ResourceClaimed,
	/// The account already holds an active subscription.
	AlreadySubscribed,
	/// A status with no entry in the classification table.
	Unclassified(u16),
}

impl FailureCode {
	/// The single place deciding recoverable versus unrecoverable.
	pub fn class(&self) -> FailureClass {
		match self {
			FailureCode::NetworkUnreachable
			| FailureCode::ServiceUnavailable
			| FailureCode::RequestTimeout
			| FailureCode::IncorrectCode
			| FailureCode::CodeExpired
			| FailureCode::InvalidPayload
			| FailureCode::Unclassified(_) => FailureClass::Recoverable,
			FailureCode::DuplicateSubmission
			| FailureCode::ResourceClaimed
			| FailureCode::AlreadySubscribed => FailureClass::Unrecoverable,
		}
	}
}

impl fmt::Display for FailureCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FailureCode::NetworkUnreachable => write!(f, "network unreachable"),
			FailureCode::ServiceUnavailable => write!(f, "service unavailable"),
			FailureCode::RequestTimeout => write!(f, "request timeout"),
			FailureCode::IncorrectCode => write!(f, "incorrect code"),
			FailureCode::CodeExpired => write!(f, "code expired"),
			FailureCode::InvalidPayload => write!(f, "invalid payload"),
			FailureCode::DuplicateSubmission => write!(f, "duplicate submission"),
			FailureCode::ResourceClaimed => write!(f, "resource claimed"),
			FailureCode::AlreadySubscribed => write!(f, "already subscribed"),
			FailureCode::Unclassified(status) => write!(f, "unclassified status {}", status),
		}
	}
}

/// A backend failure as recorded in journey context and delivered to the
/// state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
	pub code: FailureCode,
	pub message: String,
}

impl ErrorNotice {
	/// Creates a notice for the given code and human-readable message.
	pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	/// Whether the user can retry from a non-terminal state.
	pub fn retryable(&self) -> bool {
		self.code.class() == FailureClass::Recoverable
	}
}

impl fmt::Display for ErrorNotice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code, self.message)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_conditions_are_unrecoverable() {
		assert_eq!(
			FailureCode::DuplicateSubmission.class(),
			FailureClass::Unrecoverable
		);
		assert_eq!(
			FailureCode::ResourceClaimed.class(),
			FailureClass::Unrecoverable
		);
		assert_eq!(
			FailureCode::AlreadySubscribed.class(),
			FailureClass::Unrecoverable
		);
	}

	#[test]
	fn transient_and_unknown_conditions_are_recoverable() {
		assert_eq!(
			FailureCode::NetworkUnreachable.class(),
			FailureClass::Recoverable
		);
		assert_eq!(
			FailureCode::IncorrectCode.class(),
			FailureClass::Recoverable
		);
		assert_eq!(
			FailureCode::Unclassified(418).class(),
			FailureClass::Recoverable
		);
	}
}
