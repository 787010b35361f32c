//! The per-journey worker task.
//!
//! Everything mutable about a journey lives on one task: the current state
//! path, the context, and the persistence adapter. Commands arrive over a
//! channel and are processed strictly in order. While an operation is in
//! flight the worker waits only for its outcome or its deadline, so events
//! dispatched in the meantime settle against the post-operation state.
//!
//! Operation outcomes carry the generation they were dispatched under; an
//! outcome arriving for a superseded generation is discarded without touching
//! context. Every settled transition is handed to the snapshot store before
//! it is broadcast, so an observed snapshot is already persisted (or purged)
//! per its directive.

use crate::controller::Command;
use crate::events::FlowEventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use wizard_backend::BackendService;
use wizard_machine::{
	prepare_invoke, InvokeRequest, MachineDefinition, StateKind, StepOutcome, TerminalKind,
};
use wizard_storage::SnapshotStore;
use wizard_types::{
	ErrorNotice, FailureClass, FailureCode, FlowEvent, InvokeOutcome, InvokePayload,
	JourneyContext, Operation, PersistenceDirective, SettledTransition, StatePath,
	TransitionTrigger, WizardEvent, WizardSnapshot,
};

/// The operation currently awaiting settlement.
pub(crate) struct InFlight {
	generation: u64,
	operation: Operation,
	deadline: Instant,
}

/// Outcome of a spawned backend call, tagged with its dispatch generation.
pub(crate) struct InvokeReply {
	pub(crate) generation: u64,
	pub(crate) operation: Operation,
	pub(crate) outcome: InvokeOutcome,
}

pub(crate) struct JourneyWorker {
	pub(crate) definition: Arc<MachineDefinition>,
	pub(crate) store: SnapshotStore,
	pub(crate) backend: Arc<BackendService>,
	pub(crate) bus: FlowEventBus,
	pub(crate) snapshots: watch::Sender<WizardSnapshot>,
	pub(crate) commands: mpsc::Receiver<Command>,
	pub(crate) replies: mpsc::Receiver<InvokeReply>,
	pub(crate) reply_tx: mpsc::Sender<InvokeReply>,
	pub(crate) state: StatePath,
	pub(crate) context: JourneyContext,
	pub(crate) generation: u64,
	pub(crate) in_flight: Option<InFlight>,
	pub(crate) invoke_timeout: Duration,
}

impl JourneyWorker {
	pub(crate) async fn run(mut self, resumed: bool) {
		let journey = self.definition.journey();
		self.bus.publish(FlowEvent::Started { journey, resumed });
		// A fresh journey starts in an invoking state; a resumed one may too.
		self.pump_invokes().await;

		loop {
			let deadline = self
				.in_flight
				.as_ref()
				.map(|in_flight| in_flight.deadline)
				.unwrap_or_else(|| Instant::now() + self.invoke_timeout);

			tokio::select! {
				biased;

				Some(reply) = self.replies.recv() => {
					self.settle_reply(reply).await;
				}

				_ = sleep_until(deadline), if self.in_flight.is_some() => {
					self.expire_invoke().await;
				}

				command = self.commands.recv(), if self.in_flight.is_none() => {
					match command {
						Some(Command::Dispatch { event, settled }) => {
							self.process_event(event).await;
							if let Some(settled) = settled {
								let _ = settled.send(self.current_snapshot());
							}
						}
						Some(Command::Idle(done)) => {
							let _ = done.send(());
						}
						Some(Command::Shutdown) | None => break,
					}
				}
			}
		}

		tracing::debug!(journey = %journey, "Journey worker stopped");
	}

	/// Steps the machine with one event and settles the result.
	async fn process_event(&mut self, event: WizardEvent) {
		let journey = self.definition.journey();
		let kind = event.kind();

		match self.definition.step(&self.state, &mut self.context, &event) {
			Ok(StepOutcome::Transitioned { from, to, reset }) => {
				let failed = matches!(
					self.definition.kind_of(&to),
					Ok(StateKind::Terminal(TerminalKind::Failure))
				);
				let directive = if reset || failed {
					PersistenceDirective::Purge
				} else {
					PersistenceDirective::Persist
				};
				self.apply_transition(from, to, TransitionTrigger::Event(kind), directive)
					.await;
				self.pump_invokes().await;
			}
			Ok(StepOutcome::Ignored(reason)) => {
				tracing::debug!(journey = %journey, event = %kind, %reason, "Event ignored");
				self.bus.publish(FlowEvent::EventIgnored {
					journey,
					event: kind,
					reason: reason.to_string(),
				});
			}
			Err(e) => {
				tracing::error!(journey = %journey, event = %kind, error = %e, "Event dispatch failed");
			}
		}
	}

	/// Delivers a settled outcome to the machine, unless it is stale.
	async fn settle_reply(&mut self, reply: InvokeReply) {
		let journey = self.definition.journey();
		let current = self
			.in_flight
			.as_ref()
			.is_some_and(|in_flight| in_flight.generation == reply.generation);
		if !current {
			tracing::debug!(
				journey = %journey,
				operation = reply.operation.as_str(),
				generation = reply.generation,
				"Discarding outcome from a superseded operation"
			);
			self.bus.publish(FlowEvent::StaleOutcomeDiscarded {
				journey,
				operation: reply.operation,
				generation: reply.generation,
			});
			return;
		}

		self.in_flight = None;
		self.resolve(reply.outcome).await;
		self.pump_invokes().await;
	}

	/// Settles an operation whose deadline elapsed as a recoverable failure.
	/// The real outcome, if it ever arrives, is stale by generation.
	async fn expire_invoke(&mut self) {
		let Some(in_flight) = self.in_flight.take() else {
			return;
		};
		tracing::warn!(
			journey = %self.definition.journey(),
			operation = in_flight.operation.as_str(),
			generation = in_flight.generation,
			timeout_ms = self.invoke_timeout.as_millis() as u64,
			"Operation deadline elapsed"
		);
		let outcome = InvokeOutcome::Failure(ErrorNotice::new(
			FailureCode::RequestTimeout,
			"the request took too long to complete",
		));
		self.resolve(outcome).await;
		self.pump_invokes().await;
	}

	async fn resolve(&mut self, outcome: InvokeOutcome) {
		match self
			.definition
			.resolve_invoke(&self.state, &mut self.context, outcome)
		{
			Ok(resolution) => {
				let directive = match resolution.failure {
					Some(FailureClass::Unrecoverable) => PersistenceDirective::Purge,
					_ => PersistenceDirective::Persist,
				};
				let trigger = TransitionTrigger::OperationSettled(resolution.operation);
				self.apply_transition(resolution.from, resolution.to, trigger, directive)
					.await;
			}
			Err(e) => {
				tracing::error!(
					journey = %self.definition.journey(),
					state = %self.state,
					error = %e,
					"Dropped an outcome the current state cannot settle"
				);
			}
		}
	}

	/// Commits a transition: state, persistence, watch value, broadcast.
	async fn apply_transition(
		&mut self,
		from: StatePath,
		to: StatePath,
		trigger: TransitionTrigger,
		directive: PersistenceDirective,
	) {
		let journey = self.definition.journey();
		self.state = to.clone();
		let snapshot = self.current_snapshot();

		let settled = SettledTransition {
			journey,
			from,
			to,
			trigger,
			snapshot: snapshot.clone(),
			directive,
		};

		if !self.store.apply(&settled).await {
			self.bus.publish(FlowEvent::PersistenceFailed { journey });
		}

		let _ = self.snapshots.send(snapshot);
		tracing::info!(
			journey = %journey,
			from = %settled.from,
			to = %settled.to,
			"Transition settled"
		);
		self.bus.publish(FlowEvent::TransitionSettled(settled));
	}

	/// Dispatches the current state's operation when it has one.
	///
	/// Runs in a loop because a preparation failure settles synchronously and
	/// the resulting state may invoke again. A dispatched call breaks the
	/// loop; its settlement pumps again.
	async fn pump_invokes(&mut self) {
		while self.in_flight.is_none() {
			let Some(operation) = self.definition.operation_of(&self.state) else {
				return;
			};
			let journey = self.definition.journey();
			self.generation = self.generation.wrapping_add(1);
			let generation = self.generation;

			match prepare_invoke(&self.context, operation) {
				Ok(request) => {
					self.in_flight = Some(InFlight {
						generation,
						operation,
						deadline: Instant::now() + self.invoke_timeout,
					});
					tracing::debug!(
						journey = %journey,
						operation = operation.as_str(),
						generation,
						"Dispatching operation"
					);
					self.bus.publish(FlowEvent::InvokeStarted {
						journey,
						operation,
						generation,
					});

					let backend = self.backend.clone();
					let replies = self.reply_tx.clone();
					tokio::spawn(async move {
						let outcome = execute(&backend, request).await;
						let _ = replies
							.send(InvokeReply {
								generation,
								operation,
								outcome,
							})
							.await;
					});
				}
				Err(e) => {
					// A guard upstream should have made this unreachable; the
					// recoverable edge keeps the journey retryable.
					tracing::warn!(
						journey = %journey,
						operation = operation.as_str(),
						error = %e,
						"Operation request could not be prepared"
					);
					let outcome = InvokeOutcome::Failure(ErrorNotice::new(
						FailureCode::InvalidPayload,
						e.to_string(),
					));
					self.resolve(outcome).await;
				}
			}
		}
	}

	fn current_snapshot(&self) -> WizardSnapshot {
		WizardSnapshot::new(self.state.clone(), self.context.clone())
	}
}

/// Runs one prepared request against the backend service.
async fn execute(backend: &BackendService, request: InvokeRequest) -> InvokeOutcome {
	let result = match request {
		InvokeRequest::FetchCatalog(journey) => backend
			.fetch_catalog(journey)
			.await
			.map(InvokePayload::Catalog),
		InvokeRequest::IssueCode(request) => backend
			.issue_code(request)
			.await
			.map(InvokePayload::CodeIssued),
		InvokeRequest::VerifyCode(request) => backend
			.verify_code(request)
			.await
			.map(InvokePayload::CodeVerified),
		InvokeRequest::Submit(request) => {
			backend.submit(request).await.map(InvokePayload::Submitted)
		}
	};

	match result {
		Ok(payload) => InvokeOutcome::Success(payload),
		Err(e) => InvokeOutcome::Failure(e.into_notice()),
	}
}
