//! Builds backend requests from journey context.
//!
//! The flow controller prepares the request synchronously, before the
//! backend call is spawned, so the call holds no borrow of context while it
//! is in flight. Preparation can fail only when context is missing data a
//! guard should have required; the controller converts that into a
//! recoverable failure rather than crashing the journey.

use crate::MachineError;
use serde_json::json;
use wizard_types::{
	IssueCodeRequest, Journey, JourneyContext, Operation, OtpChannel, SubmissionRequest,
	VerifyCodeRequest,
};

/// A fully prepared backend request for one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeRequest {
	FetchCatalog(Journey),
	IssueCode(IssueCodeRequest),
	VerifyCode(VerifyCodeRequest),
	Submit(SubmissionRequest),
}

/// Prepares the request an invoking state's operation needs.
pub fn prepare_invoke(
	context: &JourneyContext,
	operation: Operation,
) -> Result<InvokeRequest, MachineError> {
	match operation {
		Operation::FetchCatalog => Ok(InvokeRequest::FetchCatalog(context.journey)),
		Operation::IssueCode => {
			let channel = chosen_channel(context)?;
			Ok(InvokeRequest::IssueCode(IssueCodeRequest {
				journey: context.journey,
				channel,
				destination: destination_for(context, channel)?,
			}))
		}
		Operation::VerifyCode => {
			let channel = chosen_channel(context)?;
			Ok(InvokeRequest::VerifyCode(VerifyCodeRequest {
				journey: context.journey,
				channel,
				destination: destination_for(context, channel)?,
				code: context.auth.code_input.clone(),
			}))
		}
		Operation::Submit => {
			let idempotency_key = context
				.submission
				.idempotency_key
				.ok_or(MachineError::IncompleteContext("idempotency key"))?;
			Ok(InvokeRequest::Submit(SubmissionRequest {
				journey: context.journey,
				idempotency_key,
				payload: submission_payload(context),
			}))
		}
	}
}

fn chosen_channel(context: &JourneyContext) -> Result<OtpChannel, MachineError> {
	context
		.auth
		.channel
		.ok_or(MachineError::IncompleteContext("otp channel"))
}

fn destination_for(context: &JourneyContext, channel: OtpChannel) -> Result<String, MachineError> {
	match channel {
		OtpChannel::Sms => context
			.contact
			.mobile_number
			.clone()
			.ok_or(MachineError::IncompleteContext("mobile number")),
		OtpChannel::Email => context
			.contact
			.email
			.clone()
			.ok_or(MachineError::IncompleteContext("email address")),
	}
}

/// The journey-specific submission body.
fn submission_payload(context: &JourneyContext) -> serde_json::Value {
	match context.journey {
		Journey::Catering => json!({
			"locationId": context.selection.location_id,
			"slot": context.selection.slot,
			"lines": context.cart.lines,
			"total": context.cart.total(),
			"contact": context.contact,
		}),
		Journey::Subscription => json!({
			"planId": context.selection.plan_id,
			"frequency": context.selection.frequency,
			"contact": context.contact,
		}),
		Journey::Events => json!({
			"eventId": context.selection.event_id,
			"tickets": context.ticket_quantity,
			"contact": context.contact,
		}),
	}
}
