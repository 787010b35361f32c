//! Broadcast bus for flow notifications.

use tokio::sync::broadcast;
use wizard_types::FlowEvent;

/// Fan-out channel for [`FlowEvent`] notifications.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and a subscriber that falls behind observes a lag error on its
/// receiver instead of slowing the worker down.
#[derive(Clone, Debug)]
pub struct FlowEventBus {
	sender: broadcast::Sender<FlowEvent>,
}

impl FlowEventBus {
	/// Creates a bus retaining up to `capacity` undelivered events per
	/// subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from this point on.
	pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to current subscribers.
	pub fn publish(&self, event: FlowEvent) {
		let _ = self.sender.send(event);
	}
}
