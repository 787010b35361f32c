//! The serializable per-journey context.
//!
//! Context is pure data: scalars, sequences and maps. It never holds
//! handles, callbacks or other live resources, so every value of
//! [`JourneyContext`] can be persisted and restored as-is.

use crate::catalog::{Catalog, MenuItem, QuantityBounds};
use crate::contact::{AuthProgress, ContactDetails};
use crate::failure::ErrorNotice;
use crate::invoke::SubmissionReceipt;
use crate::journey::Journey;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A chosen fulfilment date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentSlot {
	pub date: NaiveDate,
	pub time: NaiveTime,
}

/// What the user has picked so far, across all journeys. Unused fields stay
/// `None` for journeys they do not apply to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub slot: Option<FulfillmentSlot>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub plan_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frequency: Option<crate::catalog::DeliveryFrequency>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_id: Option<String>,
}

/// A menu item being configured, before it lands in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
	pub item_id: String,
	/// Selected count per modifier option id.
	#[serde(default)]
	pub modifier_counts: BTreeMap<String, u32>,
}

impl ItemDraft {
	/// Starts an empty draft for an item.
	pub fn new(item_id: impl Into<String>) -> Self {
		Self {
			item_id: item_id.into(),
			modifier_counts: BTreeMap::new(),
		}
	}

	/// Total selected count across the options of one category.
	pub fn category_total(&self, item: &MenuItem, category_id: &str) -> u32 {
		let Some(category) = item.category(category_id) else {
			return 0;
		};
		category
			.options
			.iter()
			.map(|o| self.modifier_counts.get(&o.id).copied().unwrap_or(0))
			.sum()
	}

	/// Whether every modifier category of the item is within its bounds.
	pub fn satisfies_bounds(&self, item: &MenuItem) -> bool {
		item.modifier_categories
			.iter()
			.all(|c| c.bounds.contains(self.category_total(item, &c.id)))
	}

	/// Price of the draft: item base price plus selected options.
	pub fn price(&self, item: &MenuItem) -> Decimal {
		let mut total = item.price;
		for category in &item.modifier_categories {
			for option in &category.options {
				let count = self.modifier_counts.get(&option.id).copied().unwrap_or(0);
				total += option.price * Decimal::from(count);
			}
		}
		total
	}
}

/// A confirmed cart line. The price is captured when the line is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
	pub item_id: String,
	pub item_name: String,
	#[serde(default)]
	pub modifier_counts: BTreeMap<String, u32>,
	pub line_total: Decimal,
}

/// The order cart for the catering journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
	#[serde(default)]
	pub lines: Vec<CartLine>,
}

impl Cart {
	/// Whether the cart holds no lines.
	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Sum of all line totals.
	pub fn total(&self) -> Decimal {
		self.lines.iter().map(|l| l.line_total).sum()
	}
}

/// Submission bookkeeping: the idempotency key minted at checkout and the
/// receipt once the backend accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionState {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub idempotency_key: Option<Uuid>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub receipt: Option<SubmissionReceipt>,
}

/// Everything a journey knows between events.
///
/// The persisted snapshot is exactly this context plus the state path, so
/// every field must serialize cleanly and tolerate absence on the way back
/// in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyContext {
	pub journey: Journey,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub catalog: Option<Catalog>,
	#[serde(default)]
	pub selection: Selection,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub draft: Option<ItemDraft>,
	#[serde(default)]
	pub cart: Cart,
	#[serde(default)]
	pub ticket_quantity: u32,
	#[serde(default)]
	pub contact: ContactDetails,
	#[serde(default)]
	pub auth: AuthProgress,
	#[serde(default)]
	pub submission: SubmissionState,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_error: Option<ErrorNotice>,
	/// Field-level validation messages; cleared when the field is accepted.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub field_errors: BTreeMap<String, String>,
}

impl JourneyContext {
	/// The canonical initial context for a journey.
	pub fn initial(journey: Journey) -> Self {
		Self {
			journey,
			catalog: None,
			selection: Selection::default(),
			draft: None,
			cart: Cart::default(),
			ticket_quantity: 0,
			contact: ContactDetails::default(),
			auth: AuthProgress::default(),
			submission: SubmissionState::default(),
			last_error: None,
			field_errors: BTreeMap::new(),
		}
	}

	/// The menu item the current draft configures, if any.
	pub fn draft_item(&self) -> Option<&MenuItem> {
		let draft = self.draft.as_ref()?;
		self.catalog.as_ref()?.item(&draft.item_id)
	}

	/// Ticket bounds for the selected event, if any.
	pub fn ticket_bounds(&self) -> Option<QuantityBounds> {
		let event_id = self.selection.event_id.as_deref()?;
		Some(self.catalog.as_ref()?.event(event_id)?.ticket_bounds)
	}

	/// Records a field-level validation message.
	pub fn reject_field(&mut self, field: &str, message: impl Into<String>) {
		self.field_errors.insert(field.to_string(), message.into());
	}

	/// Clears a field-level validation message.
	pub fn accept_field(&mut self, field: &str) {
		self.field_errors.remove(field);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{ModifierCategory, ModifierOption};
	use rust_decimal::Decimal;

	fn sides_item() -> MenuItem {
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
				],
			}],
		}
	}

	#[test]
	fn category_totals_span_options() {
		let item = sides_item();
		let mut draft = ItemDraft::new("platter");
		draft.modifier_counts.insert("slaw".to_string(), 1);
		draft.modifier_counts.insert("rolls".to_string(), 2);

		assert_eq!(draft.category_total(&item, "sides"), 3);
		assert!(draft.satisfies_bounds(&item));
	}

	#[test]
	fn empty_draft_misses_minimum() {
		let item = sides_item();
		let draft = ItemDraft::new("platter");

		assert_eq!(draft.category_total(&item, "sides"), 0);
		assert!(!draft.satisfies_bounds(&item));
	}

	#[test]
	fn draft_price_includes_options() {
		let item = sides_item();
		let mut draft = ItemDraft::new("platter");
		draft.modifier_counts.insert("slaw".to_string(), 2);

		assert_eq!(draft.price(&item), Decimal::new(5000, 2));
	}

	#[test]
	fn context_round_trips_through_json() {
		let mut context = JourneyContext::initial(Journey::Catering);
		context.contact.email = Some("guest@example.com".to_string());
		context.auth.code_input = "123456".to_string();
		context.cart.lines.push(CartLine {
			item_id: "platter".to_string(),
			item_name: "Party Platter".to_string(),
			modifier_counts: BTreeMap::new(),
			line_total: Decimal::new(4500, 2),
		});

		let encoded = serde_json::to_string(&context).unwrap();
		let decoded: JourneyContext = serde_json::from_str(&encoded).unwrap();
		assert_eq!(decoded, context);
	}
}
