//! Serialized execution of mutators on a dedicated thread.
//!
//! Submission pushes a job onto an unbounded channel and returns at once.
//! The dispatcher thread runs one job at a time: the mutator under the tree's
//! write lock, then the fanout under a read lock, then the listeners with no
//! lock held. Only after the last listener returned is the job's handle
//! resolved and the next job taken.
//!
//! While a mutator runs, its tree is published to the dispatcher thread so
//! that facade reads made from inside the mutator see the in-flight tree
//! instead of waiting on the lock the cycle itself holds.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, debug_span, trace, warn};

use crate::config::StateConfig;
use crate::emitter::EventBus;
use crate::error::StateError;
use crate::fanout::{fanout, PendingEmissions};
use crate::toolset::TreeToolset;

pub(crate) type Mutator =
    Box<dyn FnOnce(&mut TreeToolset<'_>) -> Result<(), StateError> + Send + 'static>;

/// State reachable from both the facade and the dispatcher thread.
pub(crate) struct Shared {
    pub tree: RwLock<Value>,
    pub bus: Arc<dyn EventBus>,
    pub config: StateConfig,
}

thread_local! {
    static IN_FLIGHT: RefCell<Option<InFlight>> = const { RefCell::new(None) };
}

/// The tree a mutator is working on, keyed by the state that owns it.
struct InFlight {
    owner: *const Shared,
    tree: Rc<RefCell<Value>>,
}

/// Clears the published tree when the mutator returns or unwinds.
struct Publication;

impl Publication {
    fn new(shared: &Shared, tree: &Rc<RefCell<Value>>) -> Self {
        IN_FLIGHT.with(|slot| {
            *slot.borrow_mut() = Some(InFlight {
                owner: shared,
                tree: Rc::clone(tree),
            });
        });
        Self
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        IN_FLIGHT.with(|slot| slot.borrow_mut().take());
    }
}

/// Runs `read` against the tree of the mutator currently executing for
/// `shared` on this thread, if there is one.
pub(crate) fn read_in_flight<R>(shared: &Shared, read: impl FnOnce(&Value) -> R) -> Option<R> {
    IN_FLIGHT.with(|slot| {
        let slot = slot.borrow();
        let in_flight = slot
            .as_ref()
            .filter(|in_flight| std::ptr::eq(in_flight.owner, shared))?;
        let tree = in_flight.tree.borrow();
        Some(read(&*tree))
    })
}

/// Whether a mutator for `shared` is running on this thread.
pub(crate) fn in_mutator(shared: &Shared) -> bool {
    read_in_flight(shared, |_| ()).is_some()
}

struct Job {
    seq: u64,
    mutator: Mutator,
    completion: Arc<Completion>,
}

#[derive(Default)]
struct Completion {
    result: Mutex<Option<Result<(), StateError>>>,
    done: Condvar,
}

impl Completion {
    fn resolved(result: Result<(), StateError>) -> Arc<Self> {
        let completion = Arc::new(Self::default());
        completion.resolve(result);
        completion
    }

    fn resolve(&self, result: Result<(), StateError>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<(), StateError> {
        let mut result = self.result.lock();
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut result);
        }
    }

    fn peek(&self) -> Option<Result<(), StateError>> {
        self.result.lock().clone()
    }
}

/// Tracks one submitted mutation cycle.
///
/// Dropping the handle does not cancel the mutation.
#[derive(Clone)]
pub struct MutationHandle {
    seq: u64,
    completion: Arc<Completion>,
}

impl MutationHandle {
    /// Blocks until the cycle finished and its listeners ran.
    ///
    /// Must not be called from a listener: listeners run on the dispatcher
    /// thread, which would then wait for itself.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the cycle.
    pub fn wait(&self) -> Result<(), StateError> {
        self.completion.wait()
    }

    /// The outcome, if the cycle already finished.
    pub fn try_result(&self) -> Option<Result<(), StateError>> {
        self.completion.peek()
    }

    pub fn is_done(&self) -> bool {
        self.try_result().is_some()
    }

    /// Position of this cycle in submission order, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.seq
    }
}

impl std::fmt::Debug for MutationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationHandle")
            .field("seq", &self.seq)
            .field("result", &self.try_result())
            .finish()
    }
}

#[derive(Default)]
struct Counts {
    submitted: u64,
    completed: u64,
}

#[derive(Default)]
struct Progress {
    counts: Mutex<Counts>,
    drained: Condvar,
}

impl Progress {
    fn complete(&self) {
        let mut counts = self.counts.lock();
        counts.completed += 1;
        if counts.completed == counts.submitted {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut counts = self.counts.lock();
        while counts.completed < counts.submitted {
            self.drained.wait(&mut counts);
        }
    }
}

pub(crate) struct Dispatcher {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    progress: Arc<Progress>,
}

impl Dispatcher {
    pub fn spawn(shared: Arc<Shared>) -> Result<Self, StateError> {
        shared
            .config
            .validate()
            .map_err(|err| StateError::Spawn(err.to_string()))?;

        let (sender, receiver) = unbounded();
        let progress = Arc::new(Progress::default());
        let worker_progress = Arc::clone(&progress);
        let worker = thread::Builder::new()
            .name(shared.config.thread_name.clone())
            .spawn(move || run(&shared, &receiver, &worker_progress))
            .map_err(|err| StateError::Spawn(err.to_string()))?;

        Ok(Self {
            sender: Some(sender),
            worker_id: worker.thread().id(),
            worker: Some(worker),
            progress,
        })
    }

    /// Queues `mutator` behind every earlier submission.
    pub fn submit(&self, mutator: Mutator) -> MutationHandle {
        let Some(sender) = self.sender.as_ref() else {
            return closed_handle();
        };
        // Sequence allocation and send happen under one lock so channel order
        // matches sequence order across submitting threads.
        let mut counts = self.progress.counts.lock();
        let seq = counts.submitted + 1;
        let completion = Arc::new(Completion::default());
        let job = Job {
            seq,
            mutator,
            completion: Arc::clone(&completion),
        };
        if sender.send(job).is_err() {
            warn!(seq, "mutation submitted after the dispatcher stopped");
            return closed_handle();
        }
        counts.submitted = seq;
        MutationHandle { seq, completion }
    }

    /// Blocks until every cycle submitted so far has finished.
    pub fn wait_drained(&self) {
        if thread::current().id() == self.worker_id {
            warn!("wait_for_mutations called from a listener; not waiting");
            return;
        }
        self.progress.wait_drained();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish the backlog and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if thread::current().id() != self.worker_id && worker.join().is_err() {
                warn!("mutation dispatcher thread panicked");
            }
        }
    }
}

fn closed_handle() -> MutationHandle {
    MutationHandle {
        seq: 0,
        completion: Completion::resolved(Err(StateError::DispatcherClosed)),
    }
}

fn run(shared: &Shared, jobs: &Receiver<Job>, progress: &Progress) {
    for job in jobs.iter() {
        let span = debug_span!("mutation_cycle", seq = job.seq);
        let _enter = span.enter();
        let result = run_cycle(shared, job.mutator);
        job.completion.resolve(result);
        progress.complete();
    }
    debug!("mutation dispatcher stopped");
}

fn run_cycle(shared: &Shared, mutator: Mutator) -> Result<(), StateError> {
    let mut pending = PendingEmissions::new();
    let outcome = {
        let mut tree = shared.tree.write();
        let working = Rc::new(RefCell::new(std::mem::take(&mut *tree)));
        let outcome = {
            let _published = Publication::new(shared, &working);
            let mut toolset = TreeToolset::new(&working, &mut pending);
            panic::catch_unwind(AssertUnwindSafe(|| mutator(&mut toolset)))
        };
        *tree = working.take();
        outcome
    };
    let result = outcome.unwrap_or_else(|payload| {
        Err(StateError::MutatorPanicked(panic_message(payload.as_ref())))
    });

    if let Err(error) = &result {
        warn!(%error, "mutation cycle failed");
        guarded("error listener", || {
            shared.bus.emit_error(error);
        });
        return result;
    }

    let events = {
        let tree = shared.tree.read();
        fanout(&pending, &shared.bus.event_names(), &tree)
    };
    debug!(emissions = events.len(), "mutation cycle applied");
    for event in &events {
        if shared.config.log_emissions {
            trace!(event = %event.event, payload = ?event.payload, "emit");
        }
        guarded("listener", || {
            shared.bus.emit(event);
        });
    }
    Ok(())
}

/// Runs listener code so that a panicking listener cannot stop the worker.
fn guarded(what: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        warn!(panic = %panic_message(payload.as_ref()), "{what} panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
