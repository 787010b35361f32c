//! Fluent construction and validation of machine definitions.
//!
//! Every definition passes through [`MachineBuilder::build`], which indexes
//! the state table and rejects dangling references before a definition value
//! can exist. The engine itself never re-checks targets at step time.

use crate::definition::{
	InvokeEdges, MachineDefinition, StateNode, TerminalKind, TransitionRule, CANCELLED, FAILED,
};
use std::collections::HashMap;
use thiserror::Error;
use wizard_types::{Journey, Operation};

/// A structural problem in a machine definition, caught at build time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
	#[error("no initial state declared")]
	MissingInitial,
	#[error("initial state {0} is not declared")]
	UnknownInitial(&'static str),
	#[error("state {0} is declared twice")]
	DuplicateState(&'static str),
	#[error("state {state} targets undeclared state {target}")]
	UnknownTarget {
		state: &'static str,
		target: &'static str,
	},
	#[error("required terminal state {0} is missing")]
	MissingTerminal(&'static str),
}

/// Builds one journey's [`MachineDefinition`].
///
/// The `cancelled` and `failure` terminals are part of every journey's
/// vocabulary and are added automatically when not declared; the success
/// terminal is journey-specific and must be declared.
pub struct MachineBuilder {
	journey: Journey,
	initial: Option<&'static str>,
	states: Vec<StateNode>,
}

impl MachineBuilder {
	pub fn new(journey: Journey) -> Self {
		Self {
			journey,
			initial: None,
			states: Vec::new(),
		}
	}

	/// Names the initial state. It must be declared before `build`.
	pub fn initial(mut self, name: &'static str) -> Self {
		self.initial = Some(name);
		self
	}

	/// Declares an interactive state with its transition rules.
	pub fn interactive(mut self, name: &'static str, rules: Vec<TransitionRule>) -> Self {
		self.states.push(StateNode::interactive(name, rules));
		self
	}

	/// Declares an invoking state: the operation it performs and where its
	/// settlement leads.
	pub fn invoking(mut self, name: &'static str, operation: Operation, edges: InvokeEdges) -> Self {
		self.states.push(StateNode::invoking(name, operation, edges));
		self
	}

	/// Declares a terminal state.
	pub fn terminal(mut self, name: &'static str, kind: TerminalKind) -> Self {
		self.states.push(StateNode::terminal(name, kind));
		self
	}

	/// Validates and assembles the definition.
	pub fn build(mut self) -> Result<MachineDefinition, DefinitionError> {
		if !self.states.iter().any(|s| s.name == CANCELLED) {
			self.states
				.push(StateNode::terminal(CANCELLED, TerminalKind::Cancelled));
		}
		if !self.states.iter().any(|s| s.name == FAILED) {
			self.states
				.push(StateNode::terminal(FAILED, TerminalKind::Failure));
		}

		let mut index = HashMap::new();
		for (i, state) in self.states.iter().enumerate() {
			if index.insert(state.name, i).is_some() {
				return Err(DefinitionError::DuplicateState(state.name));
			}
		}

		let initial_name = self.initial.ok_or(DefinitionError::MissingInitial)?;
		let initial = index
			.get(initial_name)
			.copied()
			.ok_or(DefinitionError::UnknownInitial(initial_name))?;

		for state in &self.states {
			for rule in &state.rules {
				if !index.contains_key(rule.target) {
					return Err(DefinitionError::UnknownTarget {
						state: state.name,
						target: rule.target,
					});
				}
			}
			if let Some(edges) = &state.invoke_edges {
				for target in [edges.on_success, edges.on_recoverable] {
					if !index.contains_key(target) {
						return Err(DefinitionError::UnknownTarget {
							state: state.name,
							target,
						});
					}
				}
			}
		}

		let cancelled = index
			.get(CANCELLED)
			.copied()
			.ok_or(DefinitionError::MissingTerminal(CANCELLED))?;
		let failed = index
			.get(FAILED)
			.copied()
			.ok_or(DefinitionError::MissingTerminal(FAILED))?;

		Ok(MachineDefinition::assemble(
			self.journey,
			initial,
			self.states,
			index,
			cancelled,
			failed,
		))
	}
}
