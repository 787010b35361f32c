//! Wizard state machine engine and per-journey definitions.
//!
//! A machine definition is pure data plus named guard and action functions:
//! a state table, transition rules and invocation edges, validated at build
//! time so a running machine can never target an undeclared state. The
//! engine performs no IO; invoking states only name their operation and the
//! flow controller runs it, feeding the settled outcome back through
//! [`MachineDefinition::resolve_invoke`].

pub mod builder;
pub mod definition;
pub mod journeys;
pub mod requests;

pub use builder::{DefinitionError, MachineBuilder};
pub use definition::{
	rule, Action, Guard, IgnoreReason, InvokeEdges, InvokeResolution, MachineDefinition, StateKind,
	StepOutcome, TerminalKind, TransitionRule,
};
pub use journeys::definition_for;
pub use requests::{prepare_invoke, InvokeRequest};

use thiserror::Error;
use wizard_types::StatePath;

/// Errors produced while stepping or settling a machine.
#[derive(Debug, Error)]
pub enum MachineError {
	/// The given path names no state of this definition.
	#[error("unknown state: {0}")]
	UnknownState(StatePath),
	/// `resolve_invoke` was called for a state that invokes nothing.
	#[error("state does not invoke an operation: {0}")]
	NotInvoking(StatePath),
	/// Context lacks data an operation needs; a guard should have kept the
	/// machine out of this state.
	#[error("context is missing {0}")]
	IncompleteContext(&'static str),
}
