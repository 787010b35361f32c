//! UI affordances derived from the current snapshot.

use serde::Serialize;
use wizard_machine::{MachineDefinition, StateKind, TerminalKind};
use wizard_types::{WizardEvent, WizardSnapshot};

/// Booleans a front end renders directly.
///
/// Projected on demand from the definition and the latest snapshot. Nothing
/// here is stored, so a flag can never disagree with the state it mirrors:
/// `can_checkout` is exactly "a CHECKOUT rule would fire right now", guard
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFlags {
	/// An operation is in flight; inputs are not being accepted.
	pub busy: bool,
	/// A BACK rule can fire from the current state.
	pub can_go_back: bool,
	/// The current step's forward confirmation can fire.
	pub can_continue: bool,
	/// CHECKOUT can fire: the cart has lines and a location is chosen.
	pub can_checkout: bool,
	/// The typed passcode is complete and submittable.
	pub can_submit_code: bool,
	/// The journey reached its success terminal.
	pub journey_complete: bool,
	/// The journey reached its failure terminal.
	pub journey_failed: bool,
}

impl DerivedFlags {
	/// Projects the flags for one snapshot.
	pub fn project(definition: &MachineDefinition, snapshot: &WizardSnapshot) -> Self {
		let state = &snapshot.value;
		let context = &snapshot.context;
		let kind = definition.kind_of(state).ok();

		let fires = |event: WizardEvent| definition.can_fire(state, context, &event);

		DerivedFlags {
			busy: matches!(kind, Some(StateKind::Invoking(_))),
			can_go_back: fires(WizardEvent::Back),
			can_continue: fires(WizardEvent::ConfirmItem)
				|| fires(WizardEvent::ConfirmTickets)
				|| fires(WizardEvent::ConfirmRegistration),
			can_checkout: fires(WizardEvent::Checkout),
			can_submit_code: fires(WizardEvent::SubmitOtp),
			journey_complete: matches!(kind, Some(StateKind::Terminal(TerminalKind::Success))),
			journey_failed: matches!(kind, Some(StateKind::Terminal(TerminalKind::Failure))),
		}
	}
}
