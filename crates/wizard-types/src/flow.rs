//! Typed flow notifications.
//!
//! Every settled transition produces a [`SettledTransition`] carrying the
//! new snapshot and a persistence directive. The controller hands it to the
//! persistence adapter and broadcasts it to observers; persistence is a
//! consumer of this message, never an ambient side effect of the machine.

use crate::events::EventKind;
use crate::invoke::Operation;
use crate::journey::Journey;
use crate::snapshot::WizardSnapshot;
use crate::state::StatePath;

/// What the persistence adapter should do with a settled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceDirective {
	/// Save the snapshot under the journey's key.
	Persist,
	/// Remove the journey's key. Issued when the journey enters its failure
	/// terminal and when it is reset, so a reload never resumes into a dead
	/// end.
	Purge,
}

/// What caused a transition to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
	/// A dispatched wizard event.
	Event(EventKind),
	/// An invoking state's operation settled.
	OperationSettled(Operation),
}

/// A settled transition, published after the machine and context have both
/// reached their new values.
#[derive(Debug, Clone)]
pub struct SettledTransition {
	pub journey: Journey,
	pub from: StatePath,
	pub to: StatePath,
	pub trigger: TransitionTrigger,
	pub snapshot: WizardSnapshot,
	pub directive: PersistenceDirective,
}

/// Observer notifications broadcast by a flow controller.
#[derive(Debug, Clone)]
pub enum FlowEvent {
	/// The controller started, fresh or from a resumed snapshot.
	Started { journey: Journey, resumed: bool },
	/// A transition settled; the snapshot inside is already persisted (or
	/// purged) per its directive.
	TransitionSettled(SettledTransition),
	/// A dispatched event produced no transition.
	EventIgnored {
		journey: Journey,
		event: EventKind,
		reason: String,
	},
	/// An invoking state issued its backend call.
	InvokeStarted {
		journey: Journey,
		operation: Operation,
		generation: u64,
	},
	/// An outcome arrived for a superseded generation and was discarded.
	StaleOutcomeDiscarded {
		journey: Journey,
		operation: Operation,
		generation: u64,
	},
	/// The persistence adapter could not apply a directive; the journey
	/// continues in memory only.
	PersistenceFailed { journey: Journey },
}
