//! Scripted backend implementation.
//!
//! Used by controller tests and by demo configurations that run without a
//! real backend. Every call is recorded, so tests can assert exactly how
//! many requests a flow produced; failures are scripted per operation and
//! consumed in order. Submissions are idempotent by key, matching the
//! contract the HTTP backend relies on.

use crate::{BackendError, BackendInterface};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use wizard_types::{
	mask_email, mask_phone, Catalog, CodeDelivery, DeliveryFrequency, ErrorNotice,
	IssueCodeRequest, Journey, Location, MenuItem, ModifierCategory, ModifierOption, OtpChannel,
	Operation, Plan, QuantityBounds, SubmissionReceipt, SubmissionRequest, TicketedEvent,
	Verification, VerifyCodeRequest,
};

/// One backend call as the mock recorded it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
	FetchCatalog {
		journey: Journey,
	},
	IssueCode {
		journey: Journey,
		channel: OtpChannel,
		destination: String,
	},
	VerifyCode {
		journey: Journey,
		code: String,
	},
	Submit {
		journey: Journey,
		idempotency_key: Uuid,
	},
}

impl RecordedCall {
	fn operation(&self) -> Operation {
		match self {
			RecordedCall::FetchCatalog { .. } => Operation::FetchCatalog,
			RecordedCall::IssueCode { .. } => Operation::IssueCode,
			RecordedCall::VerifyCode { .. } => Operation::VerifyCode,
			RecordedCall::Submit { .. } => Operation::Submit,
		}
	}
}

#[derive(Default)]
struct MockState {
	queued_failures: HashMap<Operation, VecDeque<ErrorNotice>>,
	calls: Vec<RecordedCall>,
	receipts: HashMap<Uuid, SubmissionReceipt>,
}

struct MockInner {
	catalogs: Mutex<HashMap<Journey, Catalog>>,
	state: Mutex<MockState>,
	delay: Mutex<Option<Duration>>,
}

/// Scripted backend. Clones share one call log and failure script, so a
/// test can keep a handle after handing the backend to a controller.
#[derive(Clone)]
pub struct MockBackend {
	inner: Arc<MockInner>,
}

impl MockBackend {
	/// Creates a mock preloaded with the demo catalog for every journey.
	pub fn new() -> Self {
		let mut catalogs = HashMap::new();
		for journey in Journey::all() {
			catalogs.insert(*journey, demo_catalog(*journey));
		}
		Self {
			inner: Arc::new(MockInner {
				catalogs: Mutex::new(catalogs),
				state: Mutex::new(MockState::default()),
				delay: Mutex::new(None),
			}),
		}
	}

	/// Replaces the catalog served for a journey.
	pub fn set_catalog(&self, journey: Journey, catalog: Catalog) {
		self.inner.catalogs.lock().unwrap().insert(journey, catalog);
	}

	/// Delays every call by the given duration. `None` answers immediately.
	pub fn set_delay(&self, delay: Option<Duration>) {
		*self.inner.delay.lock().unwrap() = delay;
	}

	/// Scripts the next call of `operation` to fail with `notice`. Queued
	/// failures are consumed in order; later calls succeed again.
	pub fn fail_next(&self, operation: Operation, notice: ErrorNotice) {
		self.inner
			.state
			.lock()
			.unwrap()
			.queued_failures
			.entry(operation)
			.or_default()
			.push_back(notice);
	}

	/// Every call recorded so far, in order.
	pub fn calls(&self) -> Vec<RecordedCall> {
		self.inner.state.lock().unwrap().calls.clone()
	}

	/// How many calls of one operation were recorded.
	pub fn call_count(&self, operation: Operation) -> usize {
		self.inner
			.state
			.lock()
			.unwrap()
			.calls
			.iter()
			.filter(|c| c.operation() == operation)
			.count()
	}

	async fn answer(&self, call: RecordedCall) -> Result<(), BackendError> {
		let operation = call.operation();
		let delay = {
			let mut state = self.inner.state.lock().unwrap();
			state.calls.push(call);
			*self.inner.delay.lock().unwrap()
		};
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let scripted = self
			.inner
			.state
			.lock()
			.unwrap()
			.queued_failures
			.get_mut(&operation)
			.and_then(|queue| queue.pop_front());
		match scripted {
			Some(notice) => Err(BackendError::Failed(notice)),
			None => Ok(()),
		}
	}
}

impl Default for MockBackend {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl BackendInterface for MockBackend {
	async fn fetch_catalog(&self, journey: Journey) -> Result<Catalog, BackendError> {
		self.answer(RecordedCall::FetchCatalog { journey }).await?;
		let catalogs = self.inner.catalogs.lock().unwrap();
		Ok(catalogs.get(&journey).cloned().unwrap_or_default())
	}

	async fn issue_code(&self, request: IssueCodeRequest) -> Result<CodeDelivery, BackendError> {
		self.answer(RecordedCall::IssueCode {
			journey: request.journey,
			channel: request.channel,
			destination: request.destination.clone(),
		})
		.await?;

		let masked_destination = match request.channel {
			OtpChannel::Sms => mask_phone(&request.destination),
			OtpChannel::Email => mask_email(&request.destination),
		};
		Ok(CodeDelivery {
			channel: request.channel,
			masked_destination,
			expires_in_seconds: Some(300),
		})
	}

	async fn verify_code(&self, request: VerifyCodeRequest) -> Result<Verification, BackendError> {
		self.answer(RecordedCall::VerifyCode {
			journey: request.journey,
			code: request.code.clone(),
		})
		.await?;

		Ok(Verification {
			verified_at: Utc::now(),
		})
	}

	async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionReceipt, BackendError> {
		self.answer(RecordedCall::Submit {
			journey: request.journey,
			idempotency_key: request.idempotency_key,
		})
		.await?;

		let mut state = self.inner.state.lock().unwrap();
		if let Some(receipt) = state.receipts.get(&request.idempotency_key) {
			return Ok(receipt.clone());
		}

		let reference = format!(
			"{}-{}",
			request.journey.as_str(),
			&request.idempotency_key.as_simple().to_string()[..8]
		);
		let receipt = SubmissionReceipt {
			reference,
			submitted_at: Utc::now(),
			total_charged: None,
		};
		state
			.receipts
			.insert(request.idempotency_key, receipt.clone());
		Ok(receipt)
	}
}

/// The catalog the mock serves out of the box.
pub fn demo_catalog(journey: Journey) -> Catalog {
	match journey {
		Journey::Catering => Catalog {
			locations: vec![
				Location {
					id: "downtown".to_string(),
					name: "Downtown Kitchen".to_string(),
				},
				Location {
					id: "riverside".to_string(),
					name: "Riverside Kitchen".to_string(),
				},
			],
			items: vec![
				MenuItem {
					id: "platter".to_string(),
					name: "Party Platter".to_string(),
					price: Decimal::new(4500, 2),
					modifier_categories: vec![ModifierCategory {
						id: "sides".to_string(),
						name: "Sides".to_string(),
						bounds: QuantityBounds::new(1, 3),
						options: vec![
							ModifierOption {
								id: "slaw".to_string(),
								name: "Slaw".to_string(),
								price: Decimal::new(250, 2),
							},
							ModifierOption {
								id: "rolls".to_string(),
								name: "Rolls".to_string(),
								price: Decimal::new(150, 2),
							},
							ModifierOption {
								id: "salad".to_string(),
								name: "Green Salad".to_string(),
								price: Decimal::new(300, 2),
							},
						],
					}],
				},
				MenuItem {
					id: "coffee-urn".to_string(),
					name: "Coffee Urn".to_string(),
					price: Decimal::new(2200, 2),
					modifier_categories: vec![],
				},
			],
			..Catalog::default()
		},
		Journey::Subscription => Catalog {
			plans: vec![
				Plan {
					id: "veg-box".to_string(),
					name: "Veg Box".to_string(),
					price: Decimal::new(2900, 2),
					frequencies: vec![DeliveryFrequency::Weekly, DeliveryFrequency::Fortnightly],
				},
				Plan {
					id: "pantry".to_string(),
					name: "Pantry Staples".to_string(),
					price: Decimal::new(4100, 2),
					frequencies: vec![DeliveryFrequency::Fortnightly, DeliveryFrequency::Monthly],
				},
			],
			..Catalog::default()
		},
		Journey::Events => Catalog {
			events: vec![
				TicketedEvent {
					id: "tasting".to_string(),
					name: "Winter Tasting".to_string(),
					price: Decimal::new(6500, 2),
					ticket_bounds: QuantityBounds::new(1, 4),
				},
				TicketedEvent {
					id: "workshop".to_string(),
					name: "Bread Workshop".to_string(),
					price: Decimal::new(4000, 2),
					ticket_bounds: QuantityBounds::new(1, 8),
				},
			],
			..Catalog::default()
		},
	}
}

/// Factory function to create a mock backend from configuration.
///
/// Configuration parameters:
/// - `delay_ms`: optional artificial latency per call
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, BackendError> {
	#[derive(Debug, Default, Deserialize)]
	struct MockBackendConfig {
		#[serde(default)]
		delay_ms: Option<u64>,
	}

	let config: MockBackendConfig = config
		.clone()
		.try_into()
		.map_err(|e| BackendError::Configuration(format!("invalid mock backend config: {}", e)))?;

	let backend = MockBackend::new();
	if let Some(delay_ms) = config.delay_ms {
		backend.set_delay(Some(Duration::from_millis(delay_ms)));
	}
	Ok(Box::new(backend))
}

#[cfg(test)]
mod tests {
	use super::*;
	use wizard_types::FailureCode;

	#[tokio::test]
	async fn records_every_call() {
		let mock = MockBackend::new();

		mock.fetch_catalog(Journey::Catering).await.unwrap();
		mock.verify_code(VerifyCodeRequest {
			journey: Journey::Catering,
			channel: OtpChannel::Sms,
			destination: "+15551230123".to_string(),
			code: "123456".to_string(),
		})
		.await
		.unwrap();

		assert_eq!(mock.call_count(Operation::FetchCatalog), 1);
		assert_eq!(mock.call_count(Operation::VerifyCode), 1);
		assert_eq!(mock.calls().len(), 2);
	}

	#[tokio::test]
	async fn scripted_failures_are_consumed_in_order() {
		let mock = MockBackend::new();
		mock.fail_next(
			Operation::VerifyCode,
			ErrorNotice::new(FailureCode::IncorrectCode, "wrong code"),
		);

		let request = VerifyCodeRequest {
			journey: Journey::Catering,
			channel: OtpChannel::Sms,
			destination: "+15551230123".to_string(),
			code: "000000".to_string(),
		};
		let first = mock.verify_code(request.clone()).await;
		let second = mock.verify_code(request).await;

		assert!(matches!(
			first,
			Err(BackendError::Failed(notice)) if notice.code == FailureCode::IncorrectCode
		));
		assert!(second.is_ok());
	}

	#[tokio::test]
	async fn submissions_are_idempotent_by_key() {
		let mock = MockBackend::new();
		let request = SubmissionRequest {
			journey: Journey::Events,
			idempotency_key: Uuid::new_v4(),
			payload: serde_json::json!({ "eventId": "tasting", "tickets": 2 }),
		};

		let first = mock.submit(request.clone()).await.unwrap();
		let second = mock.submit(request).await.unwrap();

		assert_eq!(first, second);
		assert_eq!(mock.call_count(Operation::Submit), 2);
	}

	#[tokio::test]
	async fn clones_share_the_call_log() {
		let mock = MockBackend::new();
		let handle = mock.clone();

		mock.fetch_catalog(Journey::Events).await.unwrap();

		assert_eq!(handle.call_count(Operation::FetchCatalog), 1);
	}
}
