//! Builds and owns the per-journey flow controllers.

use crate::controller::FlowController;
use crate::FlowError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wizard_backend::BackendService;
use wizard_machine::journeys::definition_for;
use wizard_storage::{SnapshotStore, StorageInterface};
use wizard_types::Journey;

/// One controller per enabled journey, over shared storage and backend.
#[derive(Debug)]
pub struct WizardHost {
	controllers: HashMap<Journey, FlowController>,
}

impl WizardHost {
	/// Builds the definitions and starts a controller for every journey,
	/// resuming each from its persisted snapshot where possible.
	pub async fn start(
		journeys: &[Journey],
		storage: Arc<dyn StorageInterface>,
		backend: Arc<BackendService>,
		invoke_timeout: Duration,
	) -> Result<Self, FlowError> {
		let mut controllers = HashMap::new();
		for &journey in journeys {
			let definition = Arc::new(definition_for(journey)?);
			let store = SnapshotStore::new(storage.clone(), journey);
			let controller =
				FlowController::start(definition, store, backend.clone(), invoke_timeout).await;
			controllers.insert(journey, controller);
		}
		Ok(Self { controllers })
	}

	/// The controller for a journey, when that journey is enabled.
	pub fn controller(&self, journey: Journey) -> Option<&FlowController> {
		self.controllers.get(&journey)
	}

	/// The enabled journeys, in a stable order.
	pub fn journeys(&self) -> Vec<Journey> {
		let mut journeys: Vec<Journey> = self.controllers.keys().copied().collect();
		journeys.sort_by_key(|journey| journey.as_str());
		journeys
	}

	/// Stops every journey worker and waits for the tasks to finish.
	pub async fn shutdown(&self) {
		for controller in self.controllers.values() {
			controller.shutdown().await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use wizard_backend::implementations::mock::MockBackend;
	use wizard_storage::implementations::memory::MemoryStorage;
	use wizard_types::WizardEvent;

	#[tokio::test]
	async fn the_host_runs_an_isolated_controller_per_journey() {
		let storage = Arc::new(MemoryStorage::new());
		let backend = Arc::new(BackendService::new(Box::new(MockBackend::new())));
		let host = WizardHost::start(
			&[Journey::Catering, Journey::Subscription, Journey::Events],
			storage,
			backend,
			Duration::from_secs(5),
		)
		.await
		.unwrap();

		assert_eq!(
			host.journeys(),
			vec![Journey::Catering, Journey::Events, Journey::Subscription]
		);

		let catering = host.controller(Journey::Catering).unwrap();
		catering.idle().await.unwrap();
		catering
			.settle(WizardEvent::ChooseLocation {
				location_id: "downtown".to_string(),
			})
			.await
			.unwrap();
		assert_eq!(catering.snapshot().value, "catering.selectingSlot");

		// The same event mutated nothing in the other journeys.
		let events = host.controller(Journey::Events).unwrap();
		events.idle().await.unwrap();
		assert_eq!(events.snapshot().value, "events.choosingEvent");

		host.shutdown().await;
	}

	#[tokio::test]
	async fn a_disabled_journey_has_no_controller() {
		let storage = Arc::new(MemoryStorage::new());
		let backend = Arc::new(BackendService::new(Box::new(MockBackend::new())));
		let host = WizardHost::start(
			&[Journey::Subscription],
			storage,
			backend,
			Duration::from_secs(5),
		)
		.await
		.unwrap();

		assert!(host.controller(Journey::Subscription).is_some());
		assert!(host.controller(Journey::Catering).is_none());

		host.shutdown().await;
	}
}
