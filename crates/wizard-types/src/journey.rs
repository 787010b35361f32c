//! Journey identifiers.
//!
//! Each guided purchase flow the engine can run is a journey. The slug form
//! is stable and is used in storage keys, configuration and API paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The guided purchase journeys supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Journey {
	/// Catering orders: menu browsing, item configuration, guest checkout.
	Catering,
	/// Recurring delivery subscriptions.
	Subscription,
	/// Ticketed event registration.
	Events,
}

impl Journey {
	/// Returns the stable slug for this journey.
	pub fn as_str(&self) -> &'static str {
		match self {
			Journey::Catering => "catering",
			Journey::Subscription => "subscription",
			Journey::Events => "events",
		}
	}

	/// All journeys, in presentation order.
	pub fn all() -> &'static [Journey] {
		&[Journey::Catering, Journey::Subscription, Journey::Events]
	}
}

impl fmt::Display for Journey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown journey slug.
#[derive(Debug, Clone, Error)]
#[error("unknown journey: {0}")]
pub struct UnknownJourney(pub String);

impl FromStr for Journey {
	type Err = UnknownJourney;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"catering" => Ok(Journey::Catering),
			"subscription" => Ok(Journey::Subscription),
			"events" => Ok(Journey::Events),
			other => Err(UnknownJourney(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slugs_round_trip() {
		for journey in Journey::all() {
			let parsed: Journey = journey.as_str().parse().unwrap();
			assert_eq!(parsed, *journey);
		}
	}

	#[test]
	fn unknown_slug_is_rejected() {
		assert!("florist".parse::<Journey>().is_err());
	}
}
