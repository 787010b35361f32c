//! Flow controllers for the wizard engine.
//!
//! One controller per journey owns that journey's machine state, context and
//! persistence. All mutation happens on a single worker task: events are
//! dispatched over a command channel, operations run on spawned tasks and
//! settle back through the worker under a generation check, and every settled
//! transition is applied to storage before it is broadcast. Reads go through
//! a watch channel holding the last settled snapshot, so observers never
//! contend with the worker.

pub mod controller;
pub mod events;
pub mod flags;
pub mod host;
pub(crate) mod worker;

pub use controller::FlowController;
pub use events::FlowEventBus;
pub use flags::DerivedFlags;
pub use host::WizardHost;

use thiserror::Error;
use wizard_machine::DefinitionError;
use wizard_types::Journey;

/// Errors surfaced by controller handles and the host.
#[derive(Debug, Error)]
pub enum FlowError {
	/// The journey's worker task has stopped; the handle is stale.
	#[error("{0} journey worker is not running")]
	WorkerStopped(Journey),
	/// A journey definition failed validation during host startup.
	#[error("machine definition: {0}")]
	Definition(#[from] DefinitionError),
}
