//! Flow controller: the public handle over one journey's worker.
//!
//! The controller owns no mutable state itself. Dispatch goes through a
//! command channel, reads come from a watch channel holding the last settled
//! snapshot, and notifications fan out over the bus. Cloning the handle is
//! cheap; all clones drive the same worker.

use crate::events::FlowEventBus;
use crate::flags::DerivedFlags;
use crate::worker::JourneyWorker;
use crate::FlowError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use wizard_backend::BackendService;
use wizard_machine::MachineDefinition;
use wizard_storage::SnapshotStore;
use wizard_types::{FlowEvent, Journey, JourneyContext, WizardEvent, WizardSnapshot};

/// Queued dispatches and control messages per journey.
const COMMAND_BUFFER: usize = 64;
/// Operation outcomes awaiting the worker.
const REPLY_BUFFER: usize = 8;
/// Broadcast backlog per subscriber before it lags.
const NOTIFICATION_BUFFER: usize = 128;

pub(crate) enum Command {
	Dispatch {
		event: WizardEvent,
		settled: Option<oneshot::Sender<WizardSnapshot>>,
	},
	Idle(oneshot::Sender<()>),
	Shutdown,
}

/// Handle to one running journey.
#[derive(Clone, Debug)]
pub struct FlowController {
	journey: Journey,
	definition: Arc<MachineDefinition>,
	commands: mpsc::Sender<Command>,
	snapshots: watch::Receiver<WizardSnapshot>,
	bus: FlowEventBus,
	task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl FlowController {
	/// Starts the journey worker, resuming from a persisted snapshot when a
	/// usable one exists.
	///
	/// Starting never fails: a missing, invalid or unknown persisted state
	/// falls back to a fresh journey at the initial state. Resuming into an
	/// invoking state re-issues the operation under a fresh generation.
	pub async fn start(
		definition: Arc<MachineDefinition>,
		store: SnapshotStore,
		backend: Arc<BackendService>,
		invoke_timeout: Duration,
	) -> Self {
		let journey = definition.journey();

		let resumed = match store.load().await {
			Some(snapshot) if definition.contains(&snapshot.value) => Some(snapshot),
			Some(snapshot) => {
				tracing::warn!(
					journey = %journey,
					state = %snapshot.value,
					"Persisted snapshot names an unknown state; starting fresh"
				);
				None
			}
			None => None,
		};
		let resuming = resumed.is_some();
		let snapshot = resumed.unwrap_or_else(|| {
			WizardSnapshot::new(definition.initial_state(), JourneyContext::initial(journey))
		});

		let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
		let (reply_tx, reply_rx) = mpsc::channel(REPLY_BUFFER);
		let (snapshot_tx, snapshot_rx) = watch::channel(snapshot.clone());
		let bus = FlowEventBus::new(NOTIFICATION_BUFFER);

		tracing::info!(
			journey = %journey,
			resumed = resuming,
			state = %snapshot.value,
			"Flow controller started"
		);

		let worker = JourneyWorker {
			definition: definition.clone(),
			store,
			backend,
			bus: bus.clone(),
			snapshots: snapshot_tx,
			commands: command_rx,
			replies: reply_rx,
			reply_tx,
			state: snapshot.value,
			context: snapshot.context,
			generation: 0,
			in_flight: None,
			invoke_timeout,
		};
		let task = tokio::spawn(worker.run(resuming));

		Self {
			journey,
			definition,
			commands: command_tx,
			snapshots: snapshot_rx,
			bus,
			task: Arc::new(Mutex::new(Some(task))),
		}
	}

	/// The journey this controller drives.
	pub fn journey(&self) -> Journey {
		self.journey
	}

	/// The machine definition behind this controller.
	pub fn definition(&self) -> &MachineDefinition {
		&self.definition
	}

	/// Dispatches an event without waiting for it to be processed.
	pub async fn send(&self, event: WizardEvent) -> Result<(), FlowError> {
		self.commands
			.send(Command::Dispatch {
				event,
				settled: None,
			})
			.await
			.map_err(|_| FlowError::WorkerStopped(self.journey))
	}

	/// Dispatches an event and waits until the worker has processed it,
	/// returning the snapshot current at that point.
	///
	/// While an operation is in flight the event waits its turn behind the
	/// settlement, so the returned snapshot always reflects the dispatch.
	pub async fn settle(&self, event: WizardEvent) -> Result<WizardSnapshot, FlowError> {
		let (done, processed) = oneshot::channel();
		self.commands
			.send(Command::Dispatch {
				event,
				settled: Some(done),
			})
			.await
			.map_err(|_| FlowError::WorkerStopped(self.journey))?;
		processed
			.await
			.map_err(|_| FlowError::WorkerStopped(self.journey))
	}

	/// Waits until every previously dispatched command has been processed and
	/// no operation is in flight.
	pub async fn idle(&self) -> Result<(), FlowError> {
		let (done, drained) = oneshot::channel();
		self.commands
			.send(Command::Idle(done))
			.await
			.map_err(|_| FlowError::WorkerStopped(self.journey))?;
		drained
			.await
			.map_err(|_| FlowError::WorkerStopped(self.journey))
	}

	/// The last settled snapshot.
	pub fn snapshot(&self) -> WizardSnapshot {
		self.snapshots.borrow().clone()
	}

	/// The derived flags for the last settled snapshot.
	pub fn flags(&self) -> DerivedFlags {
		DerivedFlags::project(&self.definition, &self.snapshot())
	}

	/// Subscribes to flow notifications published from this point on.
	pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
		self.bus.subscribe()
	}

	/// Stops the worker after it drains already queued commands, and waits
	/// for the task to finish. Safe to call more than once.
	pub async fn shutdown(&self) {
		let _ = self.commands.send(Command::Shutdown).await;
		let task = match self.task.lock() {
			Ok(mut slot) => slot.take(),
			Err(_) => None,
		};
		if let Some(task) = task {
			let _ = task.await;
		}
	}
}
