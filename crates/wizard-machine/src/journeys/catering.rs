//! The catering order journey.
//!
//! `loadingMenu* -> browsing -> selectingSlot -> selectingCategory ->
//! editingItem -> cart -> guestAuthChoice -> sendingCode* -> otpEntry ->
//! verifyingCode* -> submitting* -> confirmed | failed` (`*` invoking).
//! A guest already verified in this session checks out straight from the
//! cart; modifier quantities clamp against the item's category bounds from
//! the fetched catalog.

use super::{
	begin_checkout, channel_choice_rules, contact_entry_rules, verification_cluster,
	verified_resubmit_ready,
};
use crate::builder::{DefinitionError, MachineBuilder};
use crate::definition::{rule, InvokeEdges, MachineDefinition, TerminalKind};
use wizard_types::{CartLine, EventKind, ItemDraft, Journey, JourneyContext, Operation, WizardEvent};

pub fn definition() -> Result<MachineDefinition, DefinitionError> {
	let mut auth_rules = contact_entry_rules("guestAuthChoice", "guestAuthChoice");
	auth_rules.extend(channel_choice_rules());
	auth_rules.push(rule(EventKind::Back, "cart"));

	let builder = MachineBuilder::new(Journey::Catering)
		.initial("loadingMenu")
		.invoking(
			"loadingMenu",
			Operation::FetchCatalog,
			InvokeEdges {
				on_success: "browsing",
				on_recoverable: "loadFailed",
			},
		)
		.interactive("loadFailed", vec![rule(EventKind::Retry, "loadingMenu")])
		.interactive(
			"browsing",
			vec![rule(EventKind::ChooseLocation, "selectingSlot")
				.when(location_exists)
				.then(record_location)],
		)
		.interactive(
			"selectingSlot",
			vec![
				rule(EventKind::ChooseSlot, "selectingCategory").then(record_slot),
				rule(EventKind::Back, "browsing"),
			],
		)
		.interactive(
			"selectingCategory",
			vec![
				rule(EventKind::ChooseCategory, "selectingCategory").then(record_category),
				rule(EventKind::ChooseItem, "editingItem")
					.when(item_in_catalog)
					.then(start_draft),
				rule(EventKind::Back, "selectingSlot"),
			],
		)
		.interactive(
			"editingItem",
			vec![
				rule(EventKind::IncrementModifier, "editingItem")
					.when(modifier_can_increment)
					.then(increment_modifier),
				rule(EventKind::DecrementModifier, "editingItem")
					.when(modifier_can_decrement)
					.then(decrement_modifier),
				rule(EventKind::ConfirmItem, "cart")
					.when(draft_within_bounds)
					.then(push_cart_line),
				rule(EventKind::Back, "selectingCategory").then(drop_draft),
			],
		)
		.interactive(
			"cart",
			vec![
				rule(EventKind::AddAnotherItem, "selectingCategory"),
				rule(EventKind::RemoveCartLine, "cart")
					.when(cart_line_index_valid)
					.then(remove_cart_line),
				rule(EventKind::Checkout, "submitting")
					.when(checkout_ready_authenticated)
					.then(begin_checkout),
				rule(EventKind::Checkout, "guestAuthChoice")
					.when(checkout_ready)
					.then(begin_checkout),
				rule(EventKind::Retry, "submitting").when(order_resubmit_ready),
				rule(EventKind::Back, "selectingCategory"),
			],
		)
		.interactive("guestAuthChoice", auth_rules);

	verification_cluster(builder, "guestAuthChoice", "submitting")
		.invoking(
			"submitting",
			Operation::Submit,
			InvokeEdges {
				on_success: "confirmed",
				on_recoverable: "cart",
			},
		)
		.terminal("confirmed", TerminalKind::Success)
		.build()
}

// Guards.

fn location_exists(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::ChooseLocation { location_id } => context
			.catalog
			.as_ref()
			.is_some_and(|c| c.location(location_id).is_some()),
		_ => false,
	}
}

fn item_in_catalog(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::ChooseItem { item_id } => context
			.catalog
			.as_ref()
			.is_some_and(|c| c.item(item_id).is_some()),
		_ => false,
	}
}

fn modifier_can_increment(context: &JourneyContext, event: &WizardEvent) -> bool {
	let WizardEvent::IncrementModifier { modifier_id } = event else {
		return false;
	};
	let Some(item) = context.draft_item() else {
		return false;
	};
	let Some(category) = item.category_of_option(modifier_id) else {
		return false;
	};
	let Some(draft) = context.draft.as_ref() else {
		return false;
	};
	draft.category_total(item, &category.id) < category.bounds.maximum
}

fn modifier_can_decrement(context: &JourneyContext, event: &WizardEvent) -> bool {
	let WizardEvent::DecrementModifier { modifier_id } = event else {
		return false;
	};
	context
		.draft
		.as_ref()
		.and_then(|d| d.modifier_counts.get(modifier_id))
		.copied()
		.unwrap_or(0) > 0
}

fn draft_within_bounds(context: &JourneyContext, _event: &WizardEvent) -> bool {
	match (context.draft.as_ref(), context.draft_item()) {
		(Some(draft), Some(item)) => draft.satisfies_bounds(item),
		_ => false,
	}
}

fn cart_line_index_valid(context: &JourneyContext, event: &WizardEvent) -> bool {
	match event {
		WizardEvent::RemoveCartLine { index } => *index < context.cart.lines.len(),
		_ => false,
	}
}

fn checkout_ready(context: &JourneyContext, _event: &WizardEvent) -> bool {
	!context.cart.is_empty() && context.selection.location_id.is_some()
}

fn checkout_ready_authenticated(context: &JourneyContext, event: &WizardEvent) -> bool {
	context.auth.authenticated && checkout_ready(context, event)
}

fn order_resubmit_ready(context: &JourneyContext, event: &WizardEvent) -> bool {
	verified_resubmit_ready(context, event) && !context.cart.is_empty()
}

// Actions.

fn record_location(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChooseLocation { location_id } = event {
		context.selection.location_id = Some(location_id.clone());
	}
}

fn record_slot(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChooseSlot { date, time } = event {
		context.selection.slot = Some(wizard_types::FulfillmentSlot {
			date: *date,
			time: *time,
		});
	}
}

fn record_category(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChooseCategory { category_id } = event {
		context.selection.category_id = Some(category_id.clone());
	}
}

fn start_draft(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::ChooseItem { item_id } = event {
		context.draft = Some(ItemDraft::new(item_id.clone()));
	}
}

fn increment_modifier(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::IncrementModifier { modifier_id } = event {
		if let Some(draft) = context.draft.as_mut() {
			*draft.modifier_counts.entry(modifier_id.clone()).or_insert(0) += 1;
		}
	}
}

fn decrement_modifier(context: &mut JourneyContext, event: &WizardEvent) {
	let WizardEvent::DecrementModifier { modifier_id } = event else {
		return;
	};
	let Some(draft) = context.draft.as_mut() else {
		return;
	};
	if let Some(count) = draft.modifier_counts.get_mut(modifier_id) {
		*count -= 1;
		if *count == 0 {
			draft.modifier_counts.remove(modifier_id);
		}
	}
}

fn push_cart_line(context: &mut JourneyContext, _event: &WizardEvent) {
	let Some(line) = context.draft.as_ref().and_then(|draft| {
		let item = context.catalog.as_ref()?.item(&draft.item_id)?;
		Some(CartLine {
			item_id: item.id.clone(),
			item_name: item.name.clone(),
			modifier_counts: draft.modifier_counts.clone(),
			line_total: draft.price(item),
		})
	}) else {
		return;
	};
	context.cart.lines.push(line);
	context.draft = None;
}

fn drop_draft(context: &mut JourneyContext, _event: &WizardEvent) {
	context.draft = None;
}

fn remove_cart_line(context: &mut JourneyContext, event: &WizardEvent) {
	if let WizardEvent::RemoveCartLine { index } = event {
		context.cart.lines.remove(*index);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::definition::{StepOutcome, IgnoreReason};
	use chrono::{NaiveDate, NaiveTime};
	use rust_decimal::Decimal;
	use wizard_types::{
		Catalog, ErrorNotice, FailureClass, FailureCode, InvokeOutcome, InvokePayload, Location,
		MenuItem, ModifierCategory, ModifierOption, QuantityBounds, StatePath,
	};

	fn catalog() -> Catalog {
		Catalog {
			locations: vec![Location {
				id: "downtown".to_string(),
				name: "Downtown Kitchen".to_string(),
			}],
			items: vec![MenuItem {
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
					],
				}],
			}],
			..Catalog::default()
		}
	}

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

	fn loaded() -> (MachineDefinition, StatePath, JourneyContext) {
		let definition = definition().unwrap();
		let mut context = JourneyContext::initial(Journey::Catering);
		let resolution = definition
			.resolve_invoke(
				&definition.initial_state(),
				&mut context,
				InvokeOutcome::Success(InvokePayload::Catalog(catalog())),
			)
			.unwrap();
		(definition, resolution.to, context)
	}

	fn slot_event() -> WizardEvent {
		WizardEvent::ChooseSlot {
			date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
			time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
		}
	}

	#[test]
	fn happy_path_reaches_guest_auth_choice() {
		let (definition, mut state, mut context) = loaded();
		assert_eq!(state, "catering.browsing");

		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);
		assert_eq!(state, "catering.editingItem");

		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::IncrementModifier {
				modifier_id: "slaw".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, WizardEvent::ConfirmItem);
		assert_eq!(state, "catering.cart");
		assert_eq!(context.cart.lines.len(), 1);
		assert_eq!(context.cart.total(), Decimal::new(4750, 2));

		step(&definition, &mut state, &mut context, WizardEvent::Checkout);
		assert_eq!(state, "catering.guestAuthChoice");
		assert!(context.submission.idempotency_key.is_some());
	}

	#[test]
	fn unknown_location_is_ignored() {
		let (definition, mut state, mut context) = loaded();

		let outcome = step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "nowhere".to_string(),
			},
		);

		assert_eq!(outcome, StepOutcome::Ignored(IgnoreReason::GuardRejected));
		assert_eq!(state, "catering.browsing");
		assert_eq!(context.selection.location_id, None);
	}

	#[test]
	fn modifier_increments_clamp_at_category_maximum() {
		let (definition, mut state, mut context) = loaded();
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);

		// An empty draft misses the category minimum of one.
		let early = step(&definition, &mut state, &mut context, WizardEvent::ConfirmItem);
		assert!(matches!(early, StepOutcome::Ignored(_)));

		for _ in 0..4 {
			step(
				&definition,
				&mut state,
				&mut context,
				WizardEvent::IncrementModifier {
					modifier_id: "slaw".to_string(),
				},
			);
		}
		let item = context.draft_item().unwrap().clone();
		let draft = context.draft.as_ref().unwrap();
		assert_eq!(draft.category_total(&item, "sides"), 3);

		step(&definition, &mut state, &mut context, WizardEvent::ConfirmItem);
		assert_eq!(state, "catering.cart");
	}

	#[test]
	fn decrement_is_a_no_op_at_zero() {
		let (definition, mut state, mut context) = loaded();
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);

		let outcome = step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::DecrementModifier {
				modifier_id: "slaw".to_string(),
			},
		);

		assert_eq!(outcome, StepOutcome::Ignored(IgnoreReason::GuardRejected));
		assert!(context.draft.as_ref().unwrap().modifier_counts.is_empty());
	}

	#[test]
	fn checkout_skips_guest_auth_when_already_verified() {
		let (definition, mut state, mut context) = loaded();
		context.auth.authenticated = true;
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::IncrementModifier {
				modifier_id: "rolls".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, WizardEvent::ConfirmItem);

		step(&definition, &mut state, &mut context, WizardEvent::Checkout);

		assert_eq!(state, "catering.submitting");
		assert!(context.submission.idempotency_key.is_some());
	}

	#[test]
	fn empty_cart_cannot_check_out() {
		let (definition, mut state, mut context) = loaded();
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::IncrementModifier {
				modifier_id: "slaw".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, WizardEvent::ConfirmItem);
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::RemoveCartLine { index: 0 },
		);

		let outcome = step(&definition, &mut state, &mut context, WizardEvent::Checkout);

		assert_eq!(outcome, StepOutcome::Ignored(IgnoreReason::GuardRejected));
		assert_eq!(state, "catering.cart");
	}

	#[test]
	fn recoverable_submit_failure_returns_to_cart_for_retry() {
		let definition = definition().unwrap();
		let mut context = JourneyContext::initial(Journey::Catering);
		context.auth.authenticated = true;
		context.submission.idempotency_key = Some(uuid::Uuid::new_v4());
		context.cart.lines.push(CartLine {
			item_id: "platter".to_string(),
			item_name: "Party Platter".to_string(),
			modifier_counts: Default::default(),
			line_total: Decimal::new(4500, 2),
		});
		let key = context.submission.idempotency_key;

		let resolution = definition
			.resolve_invoke(
				&StatePath::new("catering.submitting"),
				&mut context,
				InvokeOutcome::Failure(ErrorNotice::new(
					FailureCode::ServiceUnavailable,
					"try again shortly",
				)),
			)
			.unwrap();
		assert_eq!(resolution.to, "catering.cart");
		assert_eq!(resolution.failure, Some(FailureClass::Recoverable));

		// The retry keeps the same idempotency key.
		let mut state = resolution.to;
		let outcome = definition
			.step(&state, &mut context, &WizardEvent::Retry)
			.unwrap();
		if let StepOutcome::Transitioned { to, .. } = &outcome {
			state = to.clone();
		}
		assert_eq!(state, "catering.submitting");
		assert_eq!(context.submission.idempotency_key, key);
	}

	#[test]
	fn duplicate_submission_is_terminal() {
		let definition = definition().unwrap();
		let mut context = JourneyContext::initial(Journey::Catering);

		let resolution = definition
			.resolve_invoke(
				&StatePath::new("catering.submitting"),
				&mut context,
				InvokeOutcome::Failure(ErrorNotice::new(
					FailureCode::DuplicateSubmission,
					"order already placed",
				)),
			)
			.unwrap();

		assert_eq!(resolution.to, "catering.failed");
		assert_eq!(resolution.failure, Some(FailureClass::Unrecoverable));
	}

	#[test]
	fn backing_out_of_item_editing_drops_the_draft() {
		let (definition, mut state, mut context) = loaded();
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			},
		);
		step(&definition, &mut state, &mut context, slot_event());
		step(
			&definition,
			&mut state,
			&mut context,
			WizardEvent::ChooseItem {
				item_id: "platter".to_string(),
			},
		);
		assert!(context.draft.is_some());

		step(&definition, &mut state, &mut context, WizardEvent::Back);

		assert_eq!(state, "catering.selectingCategory");
		assert!(context.draft.is_none());
	}
}
