//! Per-journey machine definitions.
//!
//! Each journey module declares its state table with the builder; this
//! module holds the pieces every journey shares: contact entry, the guest
//! verification cluster (channel choice, code send, OTP entry, code
//! verification) and the checkout idempotency key.

pub mod catering;
pub mod events;
pub mod subscription;

use crate::builder::{DefinitionError, MachineBuilder};
use crate::definition::{rule, InvokeEdges, MachineDefinition, TransitionRule};
use uuid::Uuid;
use wizard_types::{
	looks_like_email, looks_like_mobile, EventKind, Journey, JourneyContext, Operation,
	OtpChannel, WizardEvent, OTP_LENGTH,
};

/// The machine definition for a journey.
pub fn definition_for(journey: Journey) -> Result<MachineDefinition, DefinitionError> {
	match journey {
		Journey::Catering => catering::definition(),
		Journey::Subscription => subscription::definition(),
		Journey::Events => events::definition(),
	}
}

/// Contact entry rules for a state hosting the contact form: a valid
/// submission stores the details and moves to `valid_target` (possibly the
/// same state), anything else re-enters the state with field-level messages.
pub(crate) fn contact_entry_rules(
	valid_target: &'static str,
	reentry: &'static str,
) -> Vec<TransitionRule> {
	vec![
		rule(EventKind::SubmitContact, valid_target)
			.when(contact_submission_valid)
			.then(store_contact),
		rule(EventKind::SubmitContact, reentry).then(record_contact_errors),
	]
}

/// Channel choice rules: each is enabled only while the stored contact has a
/// plausible destination for that channel, and each starts the checkout
/// intent so the eventual submission key is stable from here on.
pub(crate) fn channel_choice_rules() -> Vec<TransitionRule> {
	vec![
		rule(EventKind::ChooseSms, "sendingCode")
			.when(has_valid_mobile)
			.then(choose_sms),
		rule(EventKind::ChooseEmail, "sendingCode")
			.when(has_valid_email)
			.then(choose_email),
	]
}

/// Adds the guest verification states shared by catering and subscription:
/// `sendingCode` and `verifyingCode` invoking states around the `otpEntry`
/// input state. `choice_state` hosts the channel choice and is where a
/// failed code send backs out to; `after_verified` is the journey's
/// post-verification target.
pub(crate) fn verification_cluster(
	builder: MachineBuilder,
	choice_state: &'static str,
	after_verified: &'static str,
) -> MachineBuilder {
	builder
		.invoking(
			"sendingCode",
			Operation::IssueCode,
			InvokeEdges {
				on_success: "otpEntry",
				on_recoverable: choice_state,
			},
		)
		.interactive(
			"otpEntry",
			vec![
				rule(EventKind::PressOtpKey, "otpEntry")
					.when(otp_key_accepted)
					.then(record_otp_key),
				rule(EventKind::ClearOtp, "otpEntry")
					.when(has_code_input)
					.then(clear_otp),
				rule(EventKind::ResendCode, "sendingCode"),
				rule(EventKind::SubmitOtp, "verifyingCode").when(code_complete),
				rule(EventKind::Back, choice_state).then(clear_otp),
			],
		)
		.invoking(
			"verifyingCode",
			Operation::VerifyCode,
			InvokeEdges {
				on_success: after_verified,
				on_recoverable: "otpEntry",
			},
		)
}

// Guards.

pub(crate) fn contact_submission_valid(_context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::SubmitContact {
			email,
			mobile_number,
		} => looks_like_email(email) && looks_like_mobile(mobile_number),
		_ => false,
	}
}

pub(crate) fn has_valid_mobile(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context
		.contact
		.mobile_number
		.as_deref()
		.map(looks_like_mobile)
		.unwrap_or(false)
}

pub(crate) fn has_valid_email(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context
		.contact
		.email
		.as_deref()
		.map(looks_like_email)
		.unwrap_or(false)
}

pub(crate) fn otp_key_accepted(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::PressOtpKey { key } => {
			key.is_ascii_digit() && context.auth.code_input.len() < OTP_LENGTH
		}
		_ => false,
	}
}

pub(crate) fn has_code_input(context: &JourneyContext, _event: &WizardEvent) -> bool {
	!context.auth.code_input.is_empty()
}

pub(crate) fn code_complete(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context.auth.code_complete()
}

/// A verified guest with a checkout intent may resubmit after a recoverable
/// submission failure.
pub(crate) fn verified_resubmit_ready(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context.auth.authenticated && context.submission.idempotency_key.is_some()
}

pub(crate) fn has_checkout_key(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context.submission.idempotency_key.is_some()
}

// Actions.

pub(crate) fn store_contact(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::SubmitContact {
		email,
		mobile_number,
	} = event
	{
		context.contact.email = Some(email.clone());
		context.contact.mobile_number = Some(mobile_number.clone());
		context.accept_field("email");
		context.accept_field("mobileNumber");
	}
}

pub(crate) fn record_contact_errors(context: &mut JourneyContext, event: &WizardEvent) {
	let WizardEvent::SubmitContact {
		email,
		mobile_number,
	} = event
	else {
		return;
	};
	// The raw input is kept so the form round-trips what the user typed.
	context.contact.email = Some(email.clone());
	context.contact.mobile_number = Some(mobile_number.clone());
	if looks_like_email(email) {
		context.accept_field("email");
	} else {
		context.reject_field("email", "enter a valid email address");
	}
	if looks_like_mobile(mobile_number) {
		context.accept_field("mobileNumber");
	} else {
		context.reject_field("mobileNumber", "enter a valid mobile number");
	}
}

pub(crate) fn choose_sms(context: &mut JourneyContext, _event: &WizardEvent) {
	context.auth.channel = Some(OtpChannel::Sms);
	begin_checkout_intent(context);
}

pub(crate) fn choose_email(context: &mut JourneyContext, _event: &WizardEvent) {
	context.auth.channel = Some(OtpChannel::Email);
	begin_checkout_intent(context);
}

pub(crate) fn record_otp_key(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::PressOtpKey { key } = event {
		context.auth.code_input.push(*key);
	}
}

pub(crate) fn clear_otp(context: &mut JourneyContext, _event: &WizardEvent) {
	context.auth.code_input.clear();
}

pub(crate) fn begin_checkout(context: &mut JourneyContext, _event: &WizardEvent) {
	begin_checkout_intent(context);
}

/// Mints the submission idempotency key once per checkout intent. Retries
/// and the guest verification detour reuse it; only RESET discards it.
fn begin_checkout_intent(context: &mut JourneyContext) {
	if context.submission.idempotency_key.is_none() {
		context.submission.idempotency_key = Some(Uuid::new_v4());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::definition::{StateKind, StepOutcome, TerminalKind};
	use wizard_types::{
		ErrorNotice, FailureClass, FailureCode, InvokeOutcome, InvokePayload, StatePath,
		Verification,
	};

	fn step(
		definition: &MachineDefinition,
		state: &mut StatePath,
		context: &mut JourneyContext,
		event: WizardEvent,
	) -> StepOutcome {
		let outcome = definition.step(state, context, &event).unwrap();
		if let StepOutcome::Transitioned { to, .. } = &outcome {
			*state = to.clone();
		}
		outcome
	}

	fn submit_contact() -> WizardEvent {
		WizardEvent::SubmitContact {
			email: "a@b.com".to_string(),
			mobile_number: "+15555550123".to_string(),
		}
	}

	#[test]
	fn every_journey_definition_validates() {
		for journey in Journey::all() {
			let definition = definition_for(*journey).unwrap();
			assert!(definition.contains(&definition.initial_state()));
			assert!(matches!(
				definition.kind_of(&definition.initial_state()).unwrap(),
				StateKind::Invoking(Operation::FetchCatalog)
			));
			for name in ["confirmed", "cancelled", "failed"] {
				let path = StatePath::new(format!("{}.{}", journey.as_str(), name));
				assert!(matches!(
					definition.kind_of(&path).unwrap(),
					StateKind::Terminal(_)
				));
			}
		}
	}

	#[test]
	fn journey_paths_are_prefixed_with_the_journey_slug() {
		let definition = definition_for(Journey::Subscription).unwrap();
		for state in definition.states() {
			assert!(state.as_str().starts_with("subscription."));
		}
	}

	#[test]
	fn channel_choice_requires_matching_contact() {
		let definition = catering::definition().unwrap();
		let mut state = StatePath::new("catering.guestAuthChoice");
		let mut context = JourneyContext::initial(Journey::Catering);

		// No contact yet: both channels are disabled.
		let ignored = step(&definition, &mut state, &mut context, WizardEvent::ChooseSms);
		assert!(matches!(ignored, StepOutcome::Ignored(_)));

		step(&definition, &mut state, &mut context, submit_contact());
		assert_eq!(state, "catering.guestAuthChoice");
		assert!(context.field_errors.is_empty());

		step(&definition, &mut state, &mut context, WizardEvent::ChooseSms);
		assert_eq!(state, "catering.sendingCode");
		assert_eq!(context.auth.channel, Some(OtpChannel::Sms));
		assert!(context.submission.idempotency_key.is_some());
	}

	#[test]
	fn invalid_contact_records_field_errors_and_keeps_input() {
		let definition = catering::definition().unwrap();
		let mut state = StatePath::new("catering.guestAuthChoice");
		let mut context = JourneyContext::initial(Journey::Catering);

		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::SubmitContact {
				email: "not-an-email".to_string(),
				mobile_number: "+15555550123".to_string(),
			},
		);

		assert_eq!(state, "catering.guestAuthChoice");
		assert!(context.field_errors.contains_key("email"));
		assert!(!context.field_errors.contains_key("mobileNumber"));
		assert_eq!(context.contact.email.as_deref(), Some("not-an-email"));
	}

	#[test]
	fn otp_entry_accepts_exactly_six_digits() {
		let definition = catering::definition().unwrap();
		let mut state = StatePath::new("catering.otpEntry");
		let mut context = JourneyContext::initial(Journey::Catering);
		context.contact.mobile_number = Some("+15555550123".to_string());
		context.auth.channel = Some(OtpChannel::Sms);

		let rejected = step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::PressOtpKey { key: 'x' },
		);
		assert!(matches!(rejected, StepOutcome::Ignored(_)));
		assert!(context.auth.code_input.is_empty());

		let early = step(&definition, &mut state, &mut context, WizardEvent::SubmitOtp);
		assert!(matches!(early, StepOutcome::Ignored(_)));

		for key in ['1', '2', '3', '4', '5', '6', '7'] {
			step(
				&definition,
				&mut state,
				&mut context,
				WizardEvent::PressOtpKey { key },
			);
		}
		// The seventh digit was discarded.
		assert_eq!(context.auth.code_input, "123456");

		step(&definition, &mut state, &mut context, WizardEvent::SubmitOtp);
		assert_eq!(state, "catering.verifyingCode");
	}

	#[test]
	fn verification_failure_returns_to_otp_entry_unauthenticated() {
		let definition = catering::definition().unwrap();
		let mut context = JourneyContext::initial(Journey::Catering);
		context.auth.code_input = "000000".to_string();

		let resolution = definition
			.resolve_invoke(
				&StatePath::new("catering.verifyingCode"),
				&mut context,
				InvokeOutcome::Failure(ErrorNotice::new(FailureCode::IncorrectCode, "wrong code")),
			)
			.unwrap();

		assert_eq!(resolution.to, "catering.otpEntry");
		assert_eq!(resolution.failure, Some(FailureClass::Recoverable));
		assert!(!context.auth.authenticated);
		assert!(context.auth.code_input.is_empty());
		assert_eq!(
			context.last_error.as_ref().map(|e| e.code),
			Some(FailureCode::IncorrectCode)
		);
	}

	#[test]
	fn verification_success_authenticates_and_proceeds_to_submit() {
		let definition = catering::definition().unwrap();
		let mut context = JourneyContext::initial(Journey::Catering);

		let resolution = definition
			.resolve_invoke(
				&StatePath::new("catering.verifyingCode"),
				&mut context,
				InvokeOutcome::Success(InvokePayload::CodeVerified(Verification {
					verified_at: chrono::Utc::now(),
				})),
			)
			.unwrap();

		assert_eq!(resolution.to, "catering.submitting");
		assert!(context.auth.authenticated);
	}

	#[test]
	fn resend_code_reissues_from_otp_entry() {
		let definition = subscription::definition().unwrap();
		let mut state = StatePath::new("subscription.otpEntry");
		let mut context = JourneyContext::initial(Journey::Subscription);

		step(&definition, &mut state, &mut context, WizardEvent::ResendCode);

		assert_eq!(state, "subscription.sendingCode");
		assert_eq!(
			definition.operation_of(&state),
			Some(Operation::IssueCode)
		);
	}

	#[test]
	fn reset_from_a_terminal_returns_to_the_start() {
		let definition = catering::definition().unwrap();
		let mut state = StatePath::new("catering.confirmed");
		let mut context = JourneyContext::initial(Journey::Catering);
		context.auth.authenticated = true;

		let outcome = step(&definition, &mut state, &mut context, WizardEvent::Reset);

		assert!(matches!(outcome, StepOutcome::Transitioned { reset: true, .. }));
		assert_eq!(state, "catering.loadingMenu");
		assert!(!context.auth.authenticated);
	}

	#[test]
	fn cancelled_terminal_kind_is_distinct_from_failure() {
		let definition = events::definition().unwrap();

		assert_eq!(
			definition
				.kind_of(&StatePath::new("events.cancelled"))
				.unwrap(),
			StateKind::Terminal(TerminalKind::Cancelled)
		);
		assert_eq!(
			definition.kind_of(&StatePath::new("events.failed")).unwrap(),
			StateKind::Terminal(TerminalKind::Failure)
		);
	}
}
