//! The subscription sign-up journey.
//!
//! `loadingPlans* -> choosingPlan -> choosingFrequency -> enteringContact ->
//! sendingCode* -> otpEntry -> verifyingCode* -> submitting* -> confirmed |
//! failed`. Contact entry and channel choice share one state; an account
//! that already holds an active subscription is the unrecoverable failure.

use super::{
	channel_choice_rules, contact_entry_rules, verification_cluster, verified_resubmit_ready,
};
use crate::builder::{DefinitionError, MachineBuilder};
use crate::definition::{rule, InvokeEdges, MachineDefinition, TerminalKind};
use wizard_types::{EventKind, Journey, JourneyContext, Operation, WizardEvent};

pub fn definition() -> Result<MachineDefinition, DefinitionError> {
	let mut contact_rules = contact_entry_rules("enteringContact", "enteringContact");
	contact_rules.extend(channel_choice_rules());
	contact_rules.push(rule(EventKind::Retry, "submitting").when(verified_resubmit_ready));
	contact_rules.push(rule(EventKind::Back, "choosingFrequency"));

	let builder = MachineBuilder::new(Journey::Subscription)
		.initial("loadingPlans")
		.invoking(
			"loadingPlans",
			Operation::FetchCatalog,
			InvokeEdges {
				on_success: "choosingPlan",
				on_recoverable: "loadFailed",
			},
		)
		.interactive("loadFailed", vec![rule(EventKind::Retry, "loadingPlans")])
		.interactive(
			"choosingPlan",
			vec![rule(EventKind::ChoosePlan, "choosingFrequency")
				.when(plan_exists)
				.then(record_plan)],
		)
		.interactive(
			"choosingFrequency",
			vec![
				rule(EventKind::ChooseFrequency, "enteringContact")
					.when(plan_offers_frequency)
					.then(record_frequency),
				rule(EventKind::Back, "choosingPlan"),
			],
		)
		.interactive("enteringContact", contact_rules);

	verification_cluster(builder, "enteringContact", "submitting")
		.invoking(
			"submitting",
			Operation::Submit,
			InvokeEdges {
				on_success: "confirmed",
				on_recoverable: "enteringContact",
			},
		)
		.terminal("confirmed", TerminalKind::Success)
		.build()
}

// Guards.

fn plan_exists(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::ChoosePlan { plan_id } => context
			.catalog
			.as_ref()
			.is_some_and(|c| c.plan(plan_id).is_some()),
		_ => false,
	}
}

fn plan_offers_frequency(context: &JourneyContext, event: &WizardEvent) -> bool {
	let WizardEvent::ChooseFrequency { frequency } = event else {
		return false;
	};
	let Some(plan_id) = context.selection.plan_id.as_deref() else {
		return false;
	};
	context
		.catalog
		.as_ref()
		.and_then(|c| c.plan(plan_id))
		.is_some_and(|p| p.offers(*frequency))
}

// Actions.

fn record_plan(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChoosePlan { plan_id } = event {
		context.selection.plan_id = Some(plan_id.clone());
		// Frequencies differ per plan; a stale choice never carries over.
		context.selection.frequency = None;
	}
}

fn record_frequency(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChooseFrequency { frequency } = event {
		context.selection.frequency = Some(*frequency);
	}
}
