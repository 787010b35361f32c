//! Catalog data returned by the backend.
//!
//! A catalog is fetched once per journey session and merged into the journey
//! context. Only the sections relevant to the journey are populated: menu
//! items for catering, plans for subscriptions, ticketed events for event
//! registration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive quantity bounds for a selectable group.
///
/// Bounds gate progression: a selection total must lie within
/// `[minimum, maximum]` before the journey can continue. Steps saturate:
/// incrementing at the maximum and decrementing at zero leave the total
/// unchanged rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityBounds {
	pub minimum: u32,
	pub maximum: u32,
}

impl QuantityBounds {
	/// Creates inclusive bounds.
	pub fn new(minimum: u32, maximum: u32) -> Self {
		Self { minimum, maximum }
	}

	/// Whether a total satisfies the bounds.
	pub fn contains(&self, total: u32) -> bool {
		total >= self.minimum && total <= self.maximum
	}

	/// One step up, saturating at the maximum.
	pub fn step_up(&self, total: u32) -> u32 {
		if total >= self.maximum {
			total
		} else {
			total + 1
		}
	}

	/// One step down, saturating at zero.
	pub fn step_down(&self, total: u32) -> u32 {
		total.saturating_sub(1)
	}
}

/// A pickup or delivery location offered for catering orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
	pub id: String,
	pub name: String,
}

/// A single selectable option within a modifier category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierOption {
	pub id: String,
	pub name: String,
	/// Price added per unit of this option.
	pub price: Decimal,
}

/// A group of modifier options with shared selection bounds, e.g.
/// "sides, choose between one and three".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierCategory {
	pub id: String,
	pub name: String,
	pub bounds: QuantityBounds,
	pub options: Vec<ModifierOption>,
}

impl ModifierCategory {
	/// Whether the category offers the given option.
	pub fn has_option(&self, option_id: &str) -> bool {
		self.options.iter().any(|o| o.id == option_id)
	}

	/// Looks up an option by id.
	pub fn option(&self, option_id: &str) -> Option<&ModifierOption> {
		self.options.iter().find(|o| o.id == option_id)
	}
}

/// A configurable catering menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
	pub id: String,
	pub name: String,
	/// Base price before modifier options.
	pub price: Decimal,
	#[serde(default)]
	pub modifier_categories: Vec<ModifierCategory>,
}

impl MenuItem {
	/// Looks up a modifier category by id.
	pub fn category(&self, category_id: &str) -> Option<&ModifierCategory> {
		self.modifier_categories.iter().find(|c| c.id == category_id)
	}

	/// The category a modifier option belongs to, if any.
	pub fn category_of_option(&self, option_id: &str) -> Option<&ModifierCategory> {
		self.modifier_categories
			.iter()
			.find(|c| c.has_option(option_id))
	}
}

/// How often a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryFrequency {
	Weekly,
	Fortnightly,
	Monthly,
}

impl DeliveryFrequency {
	/// Returns the stable slug for this frequency.
	pub fn as_str(&self) -> &'static str {
		match self {
			DeliveryFrequency::Weekly => "weekly",
			DeliveryFrequency::Fortnightly => "fortnightly",
			DeliveryFrequency::Monthly => "monthly",
		}
	}
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
	pub id: String,
	pub name: String,
	/// Price per delivery.
	pub price: Decimal,
	/// Frequencies this plan can be delivered at.
	pub frequencies: Vec<DeliveryFrequency>,
}

impl Plan {
	/// Whether the plan offers the given delivery frequency.
	pub fn offers(&self, frequency: DeliveryFrequency) -> bool {
		self.frequencies.contains(&frequency)
	}
}

/// A ticketed event open for registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketedEvent {
	pub id: String,
	pub name: String,
	/// Price per ticket.
	pub price: Decimal,
	/// How many tickets a single registration may hold.
	pub ticket_bounds: QuantityBounds,
}

/// Catalog data for one journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub locations: Vec<Location>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub items: Vec<MenuItem>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub plans: Vec<Plan>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub events: Vec<TicketedEvent>,
}

impl Catalog {
	/// Looks up a location by id.
	pub fn location(&self, id: &str) -> Option<&Location> {
		self.locations.iter().find(|l| l.id == id)
	}

	/// Looks up a menu item by id.
	pub fn item(&self, id: &str) -> Option<&MenuItem> {
		self.items.iter().find(|i| i.id == id)
	}

	/// Looks up a subscription plan by id.
	pub fn plan(&self, id: &str) -> Option<&Plan> {
		self.plans.iter().find(|p| p.id == id)
	}

	/// Looks up a ticketed event by id.
	pub fn event(&self, id: &str) -> Option<&TicketedEvent> {
		self.events.iter().find(|e| e.id == id)
	}
}
