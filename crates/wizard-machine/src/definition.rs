//! The machine engine: state table, transition rules and invoke resolution.
//!
//! A definition is immutable after build. Stepping evaluates the current
//! state's rules in declaration order and fires the first rule whose guard
//! passes; guards are pure predicates and actions are the only writers of
//! context. Invoking states hold no rules of their own: they settle through
//! [`MachineDefinition::resolve_invoke`] when their operation completes.

use crate::MachineError;
use std::collections::HashMap;
use wizard_types::{
	ErrorNotice, EventKind, FailureClass, InvokeOutcome, InvokePayload, Journey, JourneyContext,
	Operation, StatePath, WizardEvent,
};

/// Local name of the terminal every interactive state can cancel into.
pub(crate) const CANCELLED: &str = "cancelled";
/// Local name of the terminal unrecoverable failures route to.
pub(crate) const FAILED: &str = "failed";

/// A pure predicate over context and the incoming event.
pub type Guard = fn(&JourneyContext, &WizardEvent) -> bool;

/// A context mutation applied when a rule fires.
pub type Action = fn(&mut JourneyContext, &WizardEvent);

/// What kind of state a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
	/// Awaits user events.
	Interactive,
	/// Performs exactly one asynchronous operation and reacts only to its
	/// settlement.
	Invoking(Operation),
	/// No outgoing transitions; only RESET leaves it.
	Terminal(TerminalKind),
}

/// The three ways a journey ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
	Success,
	Cancelled,
	Failure,
}

/// One transition rule: event, target, optional guard and action.
#[derive(Debug, Clone)]
pub struct TransitionRule {
	pub on: EventKind,
	pub target: &'static str,
	pub guard: Option<Guard>,
	pub action: Option<Action>,
}

impl TransitionRule {
	/// Attaches a guard; the rule only fires when it returns true.
	pub fn when(mut self, guard: Guard) -> Self {
		self.guard = Some(guard);
		self
	}

	/// Attaches an action, run against context when the rule fires.
	pub fn then(mut self, action: Action) -> Self {
		self.action = Some(action);
		self
	}
}

/// Starts a rule for `on` targeting the state named `target`.
pub fn rule(on: EventKind, target: &'static str) -> TransitionRule {
	TransitionRule {
		on,
		target,
		guard: None,
		action: None,
	}
}

/// Where an invoking state goes when its operation settles. Unrecoverable
/// failures always route to the journey's failure terminal and need no edge.
#[derive(Debug, Clone)]
pub struct InvokeEdges {
	pub on_success: &'static str,
	pub on_recoverable: &'static str,
}

#[derive(Debug, Clone)]
pub(crate) struct StateNode {
	pub(crate) name: &'static str,
	pub(crate) kind: StateKind,
	pub(crate) rules: Vec<TransitionRule>,
	pub(crate) invoke_edges: Option<InvokeEdges>,
}

impl StateNode {
	pub(crate) fn interactive(name: &'static str, rules: Vec<TransitionRule>) -> Self {
		Self {
			name,
			kind: StateKind::Interactive,
			rules,
			invoke_edges: None,
		}
	}

	pub(crate) fn invoking(name: &'static str, operation: Operation, edges: InvokeEdges) -> Self {
		Self {
			name,
			kind: StateKind::Invoking(operation),
			rules: Vec::new(),
			invoke_edges: Some(edges),
		}
	}

	pub(crate) fn terminal(name: &'static str, kind: TerminalKind) -> Self {
		Self {
			name,
			kind: StateKind::Terminal(kind),
			rules: Vec::new(),
			invoke_edges: None,
		}
	}
}

/// Why a dispatched event produced no transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
	/// The current state declares no rule for the event.
	NoRule,
	/// Rules exist for the event but every guard rejected it.
	GuardRejected,
	/// Terminal states only accept RESET.
	TerminalState,
	/// The state is waiting on its operation; the event stays queued.
	InvokePending,
}

impl std::fmt::Display for IgnoreReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let reason = match self {
			IgnoreReason::NoRule => "no rule for event",
			IgnoreReason::GuardRejected => "guard rejected",
			IgnoreReason::TerminalState => "terminal state",
			IgnoreReason::InvokePending => "operation in flight",
		};
		f.write_str(reason)
	}
}

/// Result of stepping the machine with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
	Transitioned {
		from: StatePath,
		to: StatePath,
		/// True when the transition was a RESET back to the initial state.
		reset: bool,
	},
	Ignored(IgnoreReason),
}

/// Result of settling an invoking state's operation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResolution {
	pub from: StatePath,
	pub to: StatePath,
	pub operation: Operation,
	/// `None` on success, otherwise how the failure was classified.
	pub failure: Option<FailureClass>,
}

/// One journey's finite state machine. Built by
/// [`MachineBuilder`](crate::MachineBuilder); every rule target is known to
/// exist by the time a definition value exists.
#[derive(Debug)]
pub struct MachineDefinition {
	journey: Journey,
	initial: usize,
	states: Vec<StateNode>,
	index: HashMap<&'static str, usize>,
	cancelled: usize,
	failed: usize,
}

impl MachineDefinition {
	pub(crate) fn assemble(
		journey: Journey,
		initial: usize,
		states: Vec<StateNode>,
		index: HashMap<&'static str, usize>,
		cancelled: usize,
		failed: usize,
	) -> Self {
		Self {
			journey,
			initial,
			states,
			index,
			cancelled,
			failed,
		}
	}

	/// The journey this definition drives.
	pub fn journey(&self) -> Journey {
		self.journey
	}

	/// Full path of the initial state.
	pub fn initial_state(&self) -> StatePath {
		self.full_path(self.states[self.initial].name)
	}

	/// Whether `path` names a declared state of this definition. Resume
	/// validation rests on this: an unknown persisted value falls back to a
	/// fresh start instead of stepping an undefined state.
	pub fn contains(&self, path: &StatePath) -> bool {
		self.node_index(path).is_some()
	}

	/// The kind of the named state.
	pub fn kind_of(&self, path: &StatePath) -> Result<StateKind, MachineError> {
		Ok(self.node(path)?.kind)
	}

	/// The operation an invoking state performs, if the state invokes one.
	pub fn operation_of(&self, path: &StatePath) -> Option<Operation> {
		match self.node(path).ok()?.kind {
			StateKind::Invoking(operation) => Some(operation),
			_ => None,
		}
	}

	/// Full paths of every declared state, in declaration order.
	pub fn states(&self) -> Vec<StatePath> {
		self.states.iter().map(|s| self.full_path(s.name)).collect()
	}

	/// Whether dispatching `event` right now would fire a rule.
	///
	/// Guards run against the context but no action does, so the check is
	/// side-effect free. Derived flags are projected through this rather than
	/// duplicating guard logic outside the machine.
	pub fn can_fire(
		&self,
		current: &StatePath,
		context: &JourneyContext,
		event: &WizardEvent,
	) -> bool {
		let Ok(node) = self.node(current) else {
			return false;
		};
		if node.kind != StateKind::Interactive {
			return false;
		}
		let kind = event.kind();
		node.rules.iter().any(|rule| {
			if rule.on != kind {
				return false;
			}
			match rule.guard {
				Some(guard) => guard(context, event),
				None => true,
			}
		})
	}

	/// Steps the machine with one event.
	///
	/// Per-state rules are consulted first, in declaration order; the first
	/// rule whose guard passes fires. When none fires, the built-in events
	/// apply: RESET from any interactive or terminal state restores the
	/// initial state and canonical initial context, CANCEL from any
	/// interactive state moves to the cancelled terminal.
	pub fn step(
		&self,
		current: &StatePath,
		context: &mut JourneyContext,
		event: &WizardEvent,
	) -> Result<StepOutcome, MachineError> {
		let node = self.node(current)?;
		let kind = event.kind();

		match node.kind {
			StateKind::Invoking(_) => return Ok(StepOutcome::Ignored(IgnoreReason::InvokePending)),
			StateKind::Terminal(_) => {
				if kind == EventKind::Reset {
					return Ok(self.reset_transition(current, context));
				}
				return Ok(StepOutcome::Ignored(IgnoreReason::TerminalState));
			}
			StateKind::Interactive => {}
		}

		let mut saw_rule = false;
		for rule in &node.rules {
			if rule.on != kind {
				continue;
			}
			saw_rule = true;
			if let Some(guard) = rule.guard {
				if !guard(context, event) {
					continue;
				}
			}
			if let Some(action) = rule.action {
				action(context, event);
			}
			return Ok(StepOutcome::Transitioned {
				from: current.clone(),
				to: self.full_path(rule.target),
				reset: false,
			});
		}

		match kind {
			EventKind::Reset => Ok(self.reset_transition(current, context)),
			EventKind::Cancel => Ok(StepOutcome::Transitioned {
				from: current.clone(),
				to: self.full_path(self.states[self.cancelled].name),
				reset: false,
			}),
			_ => Ok(StepOutcome::Ignored(if saw_rule {
				IgnoreReason::GuardRejected
			} else {
				IgnoreReason::NoRule
			})),
		}
	}

	/// Settles the operation of an invoking state.
	///
	/// Success merges the typed payload into context and follows the success
	/// edge. A failure is classified once, centrally: recoverable failures
	/// record the notice and follow the retry edge, unrecoverable failures
	/// record the notice and route to the failure terminal.
	pub fn resolve_invoke(
		&self,
		current: &StatePath,
		context: &mut JourneyContext,
		outcome: InvokeOutcome,
	) -> Result<InvokeResolution, MachineError> {
		let node = self.node(current)?;
		let StateKind::Invoking(operation) = node.kind else {
			return Err(MachineError::NotInvoking(current.clone()));
		};
		let Some(edges) = node.invoke_edges.as_ref() else {
			return Err(MachineError::NotInvoking(current.clone()));
		};

		match outcome {
			InvokeOutcome::Success(payload) => {
				context.last_error = None;
				merge_payload(context, payload);
				Ok(InvokeResolution {
					from: current.clone(),
					to: self.full_path(edges.on_success),
					operation,
					failure: None,
				})
			}
			InvokeOutcome::Failure(notice) => {
				let class = notice.code.class();
				apply_failure(context, operation, notice);
				let to = match class {
					FailureClass::Recoverable => self.full_path(edges.on_recoverable),
					FailureClass::Unrecoverable => {
						self.full_path(self.states[self.failed].name)
					}
				};
				Ok(InvokeResolution {
					from: current.clone(),
					to,
					operation,
					failure: Some(class),
				})
			}
		}
	}

	fn reset_transition(&self, current: &StatePath, context: &mut JourneyContext) -> StepOutcome {
		*context = JourneyContext::initial(self.journey);
		StepOutcome::Transitioned {
			from: current.clone(),
			to: self.initial_state(),
			reset: true,
		}
	}

	fn full_path(&self, local: &str) -> StatePath {
		StatePath::new(format!("{}.{}", self.journey.as_str(), local))
	}

	fn node_index(&self, path: &StatePath) -> Option<usize> {
		let rest = path.as_str().strip_prefix(self.journey.as_str())?;
		let local = rest.strip_prefix('.')?;
		self.index.get(local).copied()
	}

	fn node(&self, path: &StatePath) -> Result<&StateNode, MachineError> {
		self.node_index(path)
			.map(|i| &self.states[i])
			.ok_or_else(|| MachineError::UnknownState(path.clone()))
	}
}

/// Merges a successful operation's payload into context. The merge is the
/// only place operation results touch context, so what each success changes
/// is auditable here.
fn merge_payload(context: &mut JourneyContext, payload: InvokePayload) {
	match payload {
		InvokePayload::Catalog(catalog) => context.catalog = Some(catalog),
		InvokePayload::CodeIssued(delivery) => {
			context.auth.channel = Some(delivery.channel);
			context.auth.masked_destination = Some(delivery.masked_destination);
			context.auth.code_input.clear();
		}
		InvokePayload::CodeVerified(_) => {
			context.auth.authenticated = true;
			context.auth.code_input.clear();
		}
		InvokePayload::Submitted(receipt) => context.submission.receipt = Some(receipt),
	}
}

fn apply_failure(context: &mut JourneyContext, operation: Operation, notice: ErrorNotice) {
	// A rejected code is never redisplayed; the user types it afresh.
	if operation == Operation::VerifyCode {
		context.auth.code_input.clear();
	}
	context.last_error = Some(notice);
}
