//! Events accepted by the wizard state machines.
//!
//! Wire form is a tagged JSON object, e.g. `{ "type": "CHOOSE_SMS" }` or
//! `{ "type": "CHOOSE_LOCATION", "locationId": "downtown" }`. Unknown event
//! types fail deserialization at the API edge; a known event sent to a state
//! with no matching rule is simply ignored by the machine.

use crate::catalog::DeliveryFrequency;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single wizard event, across all journeys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum WizardEvent {
	// Global.
	Reset,
	Cancel,
	Back,
	Retry,

	// Catering: browsing and item configuration.
	ChooseLocation { location_id: String },
	ChooseSlot { date: NaiveDate, time: NaiveTime },
	ChooseCategory { category_id: String },
	ChooseItem { item_id: String },
	IncrementModifier { modifier_id: String },
	DecrementModifier { modifier_id: String },
	ConfirmItem,
	AddAnotherItem,
	RemoveCartLine { index: usize },
	Checkout,

	// Subscription.
	ChoosePlan { plan_id: String },
	ChooseFrequency { frequency: DeliveryFrequency },

	// Events.
	ChooseEvent { event_id: String },
	IncrementTickets,
	DecrementTickets,
	ConfirmTickets,
	ConfirmRegistration,

	// Contact and guest verification.
	SubmitContact { email: String, mobile_number: String },
	ChooseSms,
	ChooseEmail,
	PressOtpKey { key: char },
	ClearOtp,
	ResendCode,
	SubmitOtp,
}

impl WizardEvent {
	/// The fieldless discriminant used for transition matching.
	pub fn kind(&self) -> EventKind {
		match self {
			WizardEvent::Reset => EventKind::Reset,
			WizardEvent::Cancel => EventKind::Cancel,
			WizardEvent::Back => EventKind::Back,
			WizardEvent::Retry => EventKind::Retry,
			WizardEvent::ChooseLocation { .. } => EventKind::ChooseLocation,
			WizardEvent::ChooseSlot { .. } => EventKind::ChooseSlot,
			WizardEvent::ChooseCategory { .. } => EventKind::ChooseCategory,
			WizardEvent::ChooseItem { .. } => EventKind::ChooseItem,
			WizardEvent::IncrementModifier { .. } => EventKind::IncrementModifier,
			WizardEvent::DecrementModifier { .. } => EventKind::DecrementModifier,
			WizardEvent::ConfirmItem => EventKind::ConfirmItem,
			WizardEvent::AddAnotherItem => EventKind::AddAnotherItem,
			WizardEvent::RemoveCartLine { .. } => EventKind::RemoveCartLine,
			WizardEvent::Checkout => EventKind::Checkout,
			WizardEvent::ChoosePlan { .. } => EventKind::ChoosePlan,
			WizardEvent::ChooseFrequency { .. } => EventKind::ChooseFrequency,
			WizardEvent::ChooseEvent { .. } => EventKind::ChooseEvent,
			WizardEvent::IncrementTickets => EventKind::IncrementTickets,
			WizardEvent::DecrementTickets => EventKind::DecrementTickets,
			WizardEvent::ConfirmTickets => EventKind::ConfirmTickets,
			WizardEvent::ConfirmRegistration => EventKind::ConfirmRegistration,
			WizardEvent::SubmitContact { .. } => EventKind::SubmitContact,
			WizardEvent::ChooseSms => EventKind::ChooseSms,
			WizardEvent::ChooseEmail => EventKind::ChooseEmail,
			WizardEvent::PressOtpKey { .. } => EventKind::PressOtpKey,
			WizardEvent::ClearOtp => EventKind::ClearOtp,
			WizardEvent::ResendCode => EventKind::ResendCode,
			WizardEvent::SubmitOtp => EventKind::SubmitOtp,
		}
	}
}

/// Fieldless discriminants of [`WizardEvent`], used to key transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	Reset,
	Cancel,
	Back,
	Retry,
	ChooseLocation,
	ChooseSlot,
	ChooseCategory,
	ChooseItem,
	IncrementModifier,
	DecrementModifier,
	ConfirmItem,
	AddAnotherItem,
	RemoveCartLine,
	Checkout,
	ChoosePlan,
	ChooseFrequency,
	ChooseEvent,
	IncrementTickets,
	DecrementTickets,
	ConfirmTickets,
	ConfirmRegistration,
	SubmitContact,
	ChooseSms,
	ChooseEmail,
	PressOtpKey,
	ClearOtp,
	ResendCode,
	SubmitOtp,
}

impl EventKind {
	/// The wire name of the event type, for logs.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::Reset => "RESET",
			EventKind::Cancel => "CANCEL",
			EventKind::Back => "BACK",
			EventKind::Retry => "RETRY",
			EventKind::ChooseLocation => "CHOOSE_LOCATION",
			EventKind::ChooseSlot => "CHOOSE_SLOT",
			EventKind::ChooseCategory => "CHOOSE_CATEGORY",
			EventKind::ChooseItem => "CHOOSE_ITEM",
			EventKind::IncrementModifier => "INCREMENT_MODIFIER",
			EventKind::DecrementModifier => "DECREMENT_MODIFIER",
			EventKind::ConfirmItem => "CONFIRM_ITEM",
			EventKind::AddAnotherItem => "ADD_ANOTHER_ITEM",
			EventKind::RemoveCartLine => "REMOVE_CART_LINE",
			EventKind::Checkout => "CHECKOUT",
			EventKind::ChoosePlan => "CHOOSE_PLAN",
			EventKind::ChooseFrequency => "CHOOSE_FREQUENCY",
			EventKind::ChooseEvent => "CHOOSE_EVENT",
			EventKind::IncrementTickets => "INCREMENT_TICKETS",
			EventKind::DecrementTickets => "DECREMENT_TICKETS",
			EventKind::ConfirmTickets => "CONFIRM_TICKETS",
			EventKind::ConfirmRegistration => "CONFIRM_REGISTRATION",
			EventKind::SubmitContact => "SUBMIT_CONTACT",
			EventKind::ChooseSms => "CHOOSE_SMS",
			EventKind::ChooseEmail => "CHOOSE_EMAIL",
			EventKind::PressOtpKey => "PRESS_OTP_KEY",
			EventKind::ClearOtp => "CLEAR_OTP",
			EventKind::ResendCode => "RESEND_CODE",
			EventKind::SubmitOtp => "SUBMIT_OTP",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn events_use_screaming_snake_wire_names() {
		let encoded = serde_json::to_string(&WizardEvent::ChooseSms).unwrap();
		assert_eq!(encoded, r#"{"type":"CHOOSE_SMS"}"#);

		let event: WizardEvent =
			serde_json::from_str(r#"{"type":"CHOOSE_LOCATION","locationId":"downtown"}"#).unwrap();
		assert_eq!(
			event,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string()
			}
		);
	}

	#[test]
	fn kind_matches_wire_name() {
		let event = WizardEvent::PressOtpKey { key: '7' };
		assert_eq!(event.kind(), EventKind::PressOtpKey);
		assert_eq!(event.kind().as_str(), "PRESS_OTP_KEY");
	}

	#[test]
	fn unknown_event_type_is_rejected() {
		let result = serde_json::from_str::<WizardEvent>(r#"{"type":"WARP_DRIVE"}"#);
		assert!(result.is_err());
	}
}
