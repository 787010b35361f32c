//! The event registration journey.
//!
//! `loadingEvents* -> choosingEvent -> choosingTickets -> enteringContact ->
//! reviewingRegistration -> submitting* -> confirmed | failed`. Guest
//! checkout: no OTP verification. Ticket quantity clamps against the chosen
//! event's bounds; a duplicate registration is the unrecoverable failure.

use super::{begin_checkout, contact_entry_rules, has_checkout_key};
use crate::builder::{DefinitionError, MachineBuilder};
use crate::definition::{rule, InvokeEdges, MachineDefinition, TerminalKind};
use wizard_types::{EventKind, Journey, JourneyContext, Operation, WizardEvent};

pub fn definition() -> Result<MachineDefinition, DefinitionError> {
	let mut contact_rules = contact_entry_rules("reviewingRegistration", "enteringContact");
	contact_rules.push(rule(EventKind::Back, "choosingTickets"));

	MachineBuilder::new(Journey::Events)
		.initial("loadingEvents")
		.invoking(
			"loadingEvents",
			Operation::FetchCatalog,
			InvokeEdges {
				on_success: "choosingEvent",
				on_recoverable: "loadFailed",
			},
		)
		.interactive("loadFailed", vec![rule(EventKind::Retry, "loadingEvents")])
		.interactive(
			"choosingEvent",
			vec![rule(EventKind::ChooseEvent, "choosingTickets")
				.when(event_exists)
				.then(record_event)],
		)
		.interactive(
			"choosingTickets",
			vec![
				rule(EventKind::IncrementTickets, "choosingTickets")
					.when(tickets_below_maximum)
					.then(increment_tickets),
				rule(EventKind::DecrementTickets, "choosingTickets")
					.when(tickets_above_minimum)
					.then(decrement_tickets),
				rule(EventKind::ConfirmTickets, "enteringContact").when(tickets_within_bounds),
				rule(EventKind::Back, "choosingEvent"),
			],
		)
		.interactive("enteringContact", contact_rules)
		.interactive(
			"reviewingRegistration",
			vec![
				rule(EventKind::ConfirmRegistration, "submitting").then(begin_checkout),
				rule(EventKind::Retry, "submitting").when(has_checkout_key),
				rule(EventKind::Back, "enteringContact"),
			],
		)
		.invoking(
			"submitting",
			Operation::Submit,
			InvokeEdges {
				on_success: "confirmed",
				on_recoverable: "reviewingRegistration",
			},
		)
		.terminal("confirmed", TerminalKind::Success)
		.build()
}

// Guards.

fn event_exists(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::ChooseEvent { event_id } => context
			.catalog
			.as_ref()
			.is_some_and(|c| c.event(event_id).is_some()),
		_ => false,
	}
}

fn tickets_below_maximum(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context
		.ticket_bounds()
		.is_some_and(|b| context.ticket_quantity < b.maximum)
}

fn tickets_above_minimum(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context
		.ticket_bounds()
		.is_some_and(|b| context.ticket_quantity > b.minimum)
}

fn tickets_within_bounds(context: &JourneyContext, _event: &WizardEvent) -> bool {
	context
		.ticket_bounds()
		.is_some_and(|b| b.contains(context.ticket_quantity))
}

// Actions.

fn record_event(context: &mut JourneyContext, event: &WizardEvent) {
	let WizardEvent::ChooseEvent { event_id } = event else {
		return;
	};
	context.selection.event_id = Some(event_id.clone());
	// Registrations start at the smallest allowed party size.
	if let Some(bounds) = context.ticket_bounds() {
		context.ticket_quantity = bounds.minimum;
	}
}

fn increment_tickets(context: &mut JourneyContext, _event: &WizardEvent) {
	context.ticket_quantity += 1;
}

fn decrement_tickets(context: &mut JourneyContext, _event: &WizardEvent) {
	context.ticket_quantity -= 1;
}
