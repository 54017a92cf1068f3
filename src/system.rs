//! Actor system: the registry that owns actors and drives scheduling.
//!
//! The system owns one record per live actor: its identity, its mailbox
//! (shared with in-flight drain jobs), and the type-erased actor value.
//! Records live in a generational slot table so that an [`Address`] held
//! after `stop` can never reach a reused slot: routing compares the
//! address's generation against the slot's current one and a mismatch is
//! a silent miss.
//!
//! # Lock ordering
//!
//! Three lock classes exist and are always taken in this order, never the
//! reverse, and never across a handler invocation:
//!
//! 1. the registry mutex (resolve/insert/remove only, released before any
//!    mailbox or cell access)
//! 2. a mailbox's flag/queue locks
//! 3. an actor cell's mutex (held exactly for one invocation)
//!
//! Sends are fire-and-forget: a lookup miss, a full bounded mailbox, and a
//! fingerprint with no handler all drop the message, counted in
//! [`SystemMetrics`] and logged at debug level. Nothing on the send or
//! drain path returns an error or aborts the process.

use crate::actor::{Actor, ActorCell, AnyCell, Context};
use crate::address::{
    next_actor_id, validate_full_name, validate_leaf, ActorId, Address, SlotKey,
};
use crate::config::{MailboxPolicy, SystemConfig};
use crate::dispatch::Envelope;
use crate::error::{Error, Result};
use crate::executor::{Executor, ThreadPool};
use crate::mailbox::Mailbox;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One live actor's owned state: identity, mailbox, and the type-erased
/// actor value with its handler table.
struct ActorRecord {
    identity: ActorId,
    mailbox: Arc<Mailbox>,
    cell: Arc<Mutex<dyn AnyCell>>,
}

struct Slot {
    generation: u32,
    record: Option<ActorRecord>,
}

/// Slot table plus name index. All mutations go through one mutex; the
/// population this runtime targets makes a single lock the simplest
/// correct choice.
struct RegistryInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_name: HashMap<Arc<str>, u32>,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn insert(&mut self, record: ActorRecord) -> SlotKey {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    record: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let name = record.identity.full_name_arc();
        let entry = &mut self.slots[slot as usize];
        entry.record = Some(record);
        self.by_name.insert(name, slot);
        SlotKey {
            slot,
            generation: entry.generation,
        }
    }

    fn resolve(&self, key: SlotKey) -> Option<&ActorRecord> {
        let entry = self.slots.get(key.slot as usize)?;
        if entry.generation != key.generation {
            return None;
        }
        entry.record.as_ref()
    }

    fn remove(&mut self, key: SlotKey) -> Option<ActorRecord> {
        let entry = self.slots.get_mut(key.slot as usize)?;
        if entry.generation != key.generation {
            return None;
        }
        let record = entry.record.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(key.slot);
        self.by_name.remove(record.identity.full_name());
        Some(record)
    }

    fn remove_all(&mut self) -> Vec<ActorRecord> {
        let mut removed = Vec::new();
        for (index, entry) in self.slots.iter_mut().enumerate() {
            if let Some(record) = entry.record.take() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
                removed.push(record);
            }
        }
        self.by_name.clear();
        removed
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }
}

/// Advisory counters. Reading them never affects control flow.
#[derive(Debug, Default)]
pub struct SystemMetrics {
    actors_spawned: AtomicU64,
    actors_stopped: AtomicU64,
    messages_sent: AtomicU64,
    messages_processed: AtomicU64,
    messages_dropped_dead: AtomicU64,
    messages_dropped_full: AtomicU64,
    messages_dropped_no_handler: AtomicU64,
    handler_panics: AtomicU64,
}

impl SystemMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            actors_stopped: self.actors_stopped.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            messages_dropped_dead: self.messages_dropped_dead.load(Ordering::Relaxed),
            messages_dropped_full: self.messages_dropped_full.load(Ordering::Relaxed),
            messages_dropped_no_handler: self.messages_dropped_no_handler.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SystemMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub actors_spawned: u64,
    pub actors_stopped: u64,
    pub messages_sent: u64,
    pub messages_processed: u64,
    pub messages_dropped_dead: u64,
    pub messages_dropped_full: u64,
    pub messages_dropped_no_handler: u64,
    pub handler_panics: u64,
}

/// Options for [`ActorSystem::spawn_with`].
#[derive(Debug, Default, Clone)]
pub struct SpawnOptions {
    name: Option<String>,
    parent: Option<Address>,
    mailbox: Option<MailboxPolicy>,
}

impl SpawnOptions {
    /// Register under this name: either a bare leaf or a full `/`-separated
    /// path. Without a parent, the name is used as given.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Register as a child of `parent`; the name option (or an
    /// auto-generated leaf) is appended to the parent's full name.
    pub fn child_of(mut self, parent: &Address) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Override the system's default mailbox policy for this actor.
    pub fn mailbox(mut self, policy: MailboxPolicy) -> Self {
        self.mailbox = Some(policy);
        self
    }
}

struct SystemInner {
    system_id: String,
    config: SystemConfig,
    registry: Mutex<RegistryInner>,
    executor: Arc<dyn Executor>,
    /// Present when the system owns its default pool; joined at shutdown.
    pool: Option<Arc<ThreadPool>>,
    metrics: SystemMetrics,
    in_flight: Mutex<u64>,
    idle: Condvar,
    shutdown: AtomicBool,
}

/// Handle to a running actor system. Cheap to clone; all clones refer to
/// the same registry and pool.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl ActorSystem {
    /// Create a system with default configuration and an owned worker
    /// pool sized to the machine.
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    /// Create a system with an owned worker pool per `config`.
    pub fn with_config(config: SystemConfig) -> Self {
        let pool = Arc::new(match config.worker_threads {
            Some(count) => ThreadPool::new(count),
            None => ThreadPool::with_default_size(),
        });
        Self::build(config, Arc::clone(&pool) as Arc<dyn Executor>, Some(pool))
    }

    /// Create a system that submits drain jobs to an external executor.
    /// The caller keeps the executor alive and running until after
    /// [`shutdown`](Self::shutdown); jobs submitted to a stopped executor
    /// are lost.
    pub fn with_executor(config: SystemConfig, executor: Arc<dyn Executor>) -> Self {
        Self::build(config, executor, None)
    }

    fn build(
        config: SystemConfig,
        executor: Arc<dyn Executor>,
        pool: Option<Arc<ThreadPool>>,
    ) -> Self {
        let system_id = format!("{}-{}", config.name, Uuid::new_v4().simple());
        info!(system = %system_id, "actor system started");
        Self {
            inner: Arc::new(SystemInner {
                system_id,
                config,
                registry: Mutex::new(RegistryInner::new()),
                executor,
                pool,
                metrics: SystemMetrics::default(),
                in_flight: Mutex::new(0),
                idle: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// This system's unique instance id, used in logs.
    pub fn system_id(&self) -> &str {
        &self.inner.system_id
    }

    /// Spawn an auto-named actor and return its address.
    ///
    /// Auto-naming cannot conflict, so this cannot fail on a running
    /// system. On a shut-down system the spawn is rejected and the
    /// returned address is permanently invalid.
    pub fn spawn<A: Actor>(&self, actor: A) -> Address {
        match self.spawn_with(actor, SpawnOptions::default()) {
            Ok(addr) => addr,
            Err(err) => {
                warn!(system = %self.inner.system_id, %err, "spawn rejected");
                Address::none()
            }
        }
    }

    /// Spawn under an explicit name: a bare leaf like `"pricer"` or a full
    /// path like `"/a/b/c"`. Fails on reserved characters, empty segments,
    /// or a name collision; never silently overwrites.
    pub fn spawn_named<A: Actor>(&self, name: &str, actor: A) -> Result<Address> {
        self.spawn_with(actor, SpawnOptions::default().named(name))
    }

    /// Spawn a named child of `parent`: the child's full name is the
    /// parent's full name, a `/`, then `leaf`.
    pub fn spawn_named_by<A: Actor>(
        &self,
        parent: &Address,
        leaf: &str,
        actor: A,
    ) -> Result<Address> {
        self.spawn_with(actor, SpawnOptions::default().named(leaf).child_of(parent))
    }

    /// Spawn with explicit options.
    pub fn spawn_with<A: Actor>(&self, actor: A, options: SpawnOptions) -> Result<Address> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShutDown);
        }
        let id = next_actor_id();
        let user_named = options.name.is_some();
        let full_name = self.full_name_for(id, &options)?;

        let identity = ActorId::new(id, full_name.as_str());
        let mailbox = Arc::new(Mailbox::new(
            options.mailbox.unwrap_or(self.inner.config.default_mailbox),
        ));
        let cell: Arc<Mutex<dyn AnyCell>> = Arc::new(Mutex::new(ActorCell::new(actor)));
        let record = ActorRecord {
            identity: identity.clone(),
            mailbox,
            cell,
        };

        // Conflict check and both index insertions happen under one
        // critical section.
        let key = {
            let mut registry = self.inner.registry.lock();
            if user_named && registry.by_name.contains_key(full_name.as_str()) {
                return Err(Error::name_conflict(full_name));
            }
            registry.insert(record)
        };

        self.inner.metrics.actors_spawned.fetch_add(1, Ordering::Relaxed);
        debug!(system = %self.inner.system_id, actor = %identity, "actor spawned");
        Ok(Address::new(key, identity))
    }

    fn full_name_for(&self, id: u64, options: &SpawnOptions) -> Result<String> {
        let parent_name = match &options.parent {
            Some(parent) => {
                if !self.contains(parent) {
                    return Err(Error::parent_stopped(parent.id().full_name()));
                }
                Some(parent.id().full_name().to_string())
            }
            None => None,
        };
        let name = match (&options.name, parent_name) {
            (None, None) => format!("actor#{id}"),
            (None, Some(parent)) => format!("{parent}/actor#{id}"),
            (Some(name), None) => {
                validate_full_name(name)?;
                name.clone()
            }
            (Some(leaf), Some(parent)) => {
                validate_leaf(leaf)?;
                format!("{parent}/{leaf}")
            }
        };
        Ok(name)
    }

    /// Send `msg` to `to` with no sender. Fire-and-forget: a dead or
    /// unknown address drops the message silently.
    pub fn send<M: Send + 'static>(&self, to: &Address, msg: M) {
        self.deliver(Address::none(), to, msg);
    }

    /// Send `msg` to `to` on behalf of `sender`; the receiving handler
    /// sees `sender` as its current sender.
    pub fn send_as<M: Send + 'static>(&self, sender: &Address, to: &Address, msg: M) {
        self.deliver(sender.clone(), to, msg);
    }

    fn deliver<M: Send + 'static>(&self, sender: Address, to: &Address, msg: M) {
        if self.inner.shutdown.load(Ordering::Acquire) {
            self.inner.metrics.messages_dropped_dead.fetch_add(1, Ordering::Relaxed);
            debug!(system = %self.inner.system_id, target = %to, "send after shutdown dropped");
            return;
        }
        let resolved = {
            let registry = self.inner.registry.lock();
            registry
                .resolve(to.key())
                .map(|record| (Arc::clone(&record.mailbox), Arc::clone(&record.cell)))
        };
        let Some((mailbox, cell)) = resolved else {
            self.inner.metrics.messages_dropped_dead.fetch_add(1, Ordering::Relaxed);
            debug!(system = %self.inner.system_id, target = %to, "send to dead address dropped");
            return;
        };

        if !mailbox.push(Envelope::new(sender, msg)) {
            self.inner.metrics.messages_dropped_full.fetch_add(1, Ordering::Relaxed);
            debug!(system = %self.inner.system_id, target = %to, "mailbox full, message dropped");
            return;
        }
        self.inner.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.schedule(to.clone(), mailbox, cell);
    }

    /// Submit one drain job if the mailbox is idle with work pending.
    fn schedule(&self, addr: Address, mailbox: Arc<Mailbox>, cell: Arc<Mutex<dyn AnyCell>>) {
        if !mailbox.try_schedule() {
            return;
        }
        self.job_started();
        let system = self.clone();
        self.inner.executor.execute(Box::new(move || {
            system.drain(addr, mailbox, cell);
        }));
    }

    /// Drain one actor's mailbox until empty. Runs on a pool worker.
    ///
    /// After the flip back to idle, `try_schedule` is re-checked: a
    /// message that arrived between the last pop and the flip wins the
    /// flag back for this same worker, which keeps draining in place
    /// instead of resubmitting itself.
    fn drain(&self, addr: Address, mailbox: Arc<Mailbox>, cell: Arc<Mutex<dyn AnyCell>>) {
        loop {
            while let Some(envelope) = mailbox.try_pop() {
                let sender = envelope.sender.clone();
                let mut ctx = Context::new(self.clone(), addr.clone(), sender);
                let mut cell_guard = cell.lock();
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| cell_guard.invoke(&mut ctx, envelope)));
                drop(cell_guard);
                match outcome {
                    Ok(true) => {
                        self.inner
                            .metrics
                            .messages_processed
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {
                        self.inner
                            .metrics
                            .messages_dropped_no_handler
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        self.inner.metrics.handler_panics.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            system = %self.inner.system_id,
                            actor = %addr,
                            "handler panicked, actor continues with next message"
                        );
                    }
                }
            }
            mailbox.leave();
            if !mailbox.try_schedule() {
                break;
            }
        }
        self.job_finished();
    }

    /// Stop the actor behind `addr`: both indices are erased atomically
    /// and queued invocations are dropped. An invocation already popped by
    /// a worker runs to completion; there is no cancellation token.
    pub fn stop(&self, addr: &Address) {
        let removed = { self.inner.registry.lock().remove(addr.key()) };
        let Some(record) = removed else {
            debug!(system = %self.inner.system_id, target = %addr, "stop on dead address ignored");
            return;
        };
        record.mailbox.clear();
        self.inner.metrics.actors_stopped.fetch_add(1, Ordering::Relaxed);
        debug!(system = %self.inner.system_id, actor = %record.identity, "actor stopped");
    }

    /// Whether `addr` still refers to a live actor. This is the derived
    /// validity of an address: copies held after `stop` observe false.
    pub fn contains(&self, addr: &Address) -> bool {
        self.inner.registry.lock().resolve(addr.key()).is_some()
    }

    /// Resolve a live actor by its full registered name.
    pub fn lookup(&self, name: &str) -> Option<Address> {
        let registry = self.inner.registry.lock();
        let slot = *registry.by_name.get(name)?;
        let entry = &registry.slots[slot as usize];
        let record = entry.record.as_ref()?;
        Some(Address::new(
            SlotKey {
                slot,
                generation: entry.generation,
            },
            record.identity.clone(),
        ))
    }

    /// Run `f` against the live actor value, if `addr` resolves and the
    /// concrete type matches. Inspection only; waits for any in-flight
    /// invocation to finish first. Calling this from inside the same
    /// actor's handler deadlocks.
    pub fn with_actor<A: Actor, R>(&self, addr: &Address, f: impl FnOnce(&A) -> R) -> Option<R> {
        let cell = {
            let registry = self.inner.registry.lock();
            registry.resolve(addr.key()).map(|r| Arc::clone(&r.cell))
        }?;
        let guard = cell.lock();
        guard.actor_any().downcast_ref::<A>().map(f)
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.inner.registry.lock().live_count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    fn job_started(&self) {
        *self.inner.in_flight.lock() += 1;
    }

    fn job_finished(&self) {
        let mut in_flight = self.inner.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.inner.idle.notify_all();
        }
    }

    /// Block until every outstanding drain job has completed, including
    /// jobs scheduled by those jobs' handlers. Messages sent by other
    /// threads after this call returns may schedule new work; quiescence
    /// is only guaranteed once senders have stopped.
    pub fn wait_idle(&self) {
        let mut in_flight = self.inner.in_flight.lock();
        while *in_flight > 0 {
            self.inner.idle.wait(&mut in_flight);
        }
    }

    /// Stop all actors, wait for outstanding drain jobs, and join the
    /// owned worker pool. Idempotent. Spawns and sends after shutdown are
    /// rejected / silently dropped.
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(system = %self.inner.system_id, "actor system shutting down");
        let removed = { self.inner.registry.lock().remove_all() };
        for record in &removed {
            record.mailbox.clear();
        }
        let stopped = removed.len() as u64;
        self.inner
            .metrics
            .actors_stopped
            .fetch_add(stopped, Ordering::Relaxed);
        drop(removed);
        self.wait_idle();
        if let Some(pool) = &self.inner.pool {
            pool.shutdown();
        }
        info!(system = %self.inner.system_id, actors_stopped = stopped, "actor system stopped");
    }
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("system_id", &self.inner.system_id)
            .field("actors", &self.actor_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::HandlerTable;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Echo {
        hits: Arc<AtomicUsize>,
    }

    impl Actor for Echo {
        fn register(&mut self, handlers: &mut HandlerTable<Self>) {
            handlers.handle(|echo: &mut Echo, _ctx: &mut Context, _msg: u32| {
                echo.hits.fetch_add(1, Ordering::SeqCst);
            });
        }
    }

    fn small_system() -> ActorSystem {
        ActorSystem::with_config(SystemConfig::default().with_worker_threads(2))
    }

    #[test]
    fn spawn_assigns_auto_name_with_reserved_marker() {
        let system = small_system();
        let addr = system.spawn(Echo {
            hits: Arc::new(AtomicUsize::new(0)),
        });
        assert!(system.contains(&addr));
        assert!(addr.id().is_valid());
        assert!(addr.id().name().starts_with("actor#"));
        system.shutdown();
    }

    #[test]
    fn spawn_named_rejects_conflicts_and_reserved() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let first = system
            .spawn_named("/a/b/c", Echo { hits: Arc::clone(&hits) })
            .unwrap();
        assert_eq!(first.id().name(), "c");
        assert_eq!(first.id().parent_name(), "/a/b");

        let conflict = system.spawn_named("/a/b/c", Echo { hits: Arc::clone(&hits) });
        assert_eq!(
            conflict.unwrap_err(),
            Error::name_conflict("/a/b/c")
        );

        let reserved = system.spawn_named("bad#name", Echo { hits: Arc::clone(&hits) });
        assert!(matches!(reserved.unwrap_err(), Error::InvalidName { .. }));
        system.shutdown();
    }

    #[test]
    fn name_is_free_again_after_stop() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = system
            .spawn_named("worker", Echo { hits: Arc::clone(&hits) })
            .unwrap();
        system.stop(&addr);
        assert!(system
            .spawn_named("worker", Echo { hits: Arc::clone(&hits) })
            .is_ok());
        system.shutdown();
    }

    #[test]
    fn child_names_extend_parent_path() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let parent = system
            .spawn_named("/root", Echo { hits: Arc::clone(&hits) })
            .unwrap();
        let child = system
            .spawn_named_by(&parent, "leaf", Echo { hits: Arc::clone(&hits) })
            .unwrap();
        assert_eq!(child.id().full_name(), "/root/leaf");
        assert_eq!(child.id().parent_name(), "/root");

        system.stop(&parent);
        let orphan = system.spawn_named_by(&parent, "other", Echo { hits: Arc::clone(&hits) });
        assert!(matches!(orphan.unwrap_err(), Error::ParentStopped { .. }));
        system.shutdown();
    }

    #[test]
    fn stale_address_does_not_reach_reused_slot() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let first = system.spawn(Echo { hits: Arc::clone(&hits) });
        system.stop(&first);

        // The freed slot is reused by the next spawn; the old address must
        // still resolve to nothing.
        let second = system.spawn(Echo { hits: Arc::clone(&hits) });
        assert!(!system.contains(&first));
        assert!(system.contains(&second));

        system.send(&first, 1u32);
        system.wait_idle();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(system.metrics().messages_dropped_dead, 1);
        system.shutdown();
    }

    #[test]
    fn lookup_finds_live_actors_by_full_name() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = system
            .spawn_named("/svc/echo", Echo { hits: Arc::clone(&hits) })
            .unwrap();
        let found = system.lookup("/svc/echo").expect("lookup should resolve");
        assert_eq!(found, addr);
        assert!(system.lookup("/svc/missing").is_none());

        system.stop(&addr);
        assert!(system.lookup("/svc/echo").is_none());
        system.shutdown();
    }

    #[test]
    fn with_actor_inspects_live_state_only() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = system.spawn(Echo { hits: Arc::clone(&hits) });
        system.send(&addr, 9u32);
        system.wait_idle();

        let observed = system.with_actor(&addr, |echo: &Echo| echo.hits.load(Ordering::SeqCst));
        assert_eq!(observed, Some(1));

        // Wrong concrete type resolves to None rather than panicking.
        struct Other;
        impl Actor for Other {
            fn register(&mut self, _handlers: &mut HandlerTable<Self>) {}
        }
        let wrong = system.with_actor(&addr, |_other: &Other| ());
        assert!(wrong.is_none());

        system.stop(&addr);
        assert!(system
            .with_actor(&addr, |echo: &Echo| echo.hits.load(Ordering::SeqCst))
            .is_none());
        system.shutdown();
    }

    #[test]
    fn bounded_mailbox_overflow_is_counted_not_fatal() {
        // One worker and a blocking first message keep the mailbox backed
        // up deterministically.
        let system = ActorSystem::with_config(SystemConfig::default().with_worker_threads(1));
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        struct Gate {
            entered: mpsc::Sender<()>,
            release: mpsc::Receiver<()>,
        }
        impl Actor for Gate {
            fn register(&mut self, handlers: &mut HandlerTable<Self>) {
                handlers.handle(|gate: &mut Gate, _ctx: &mut Context, _msg: u32| {
                    let _ = gate.entered.send(());
                    let _ = gate.release.recv_timeout(Duration::from_secs(5));
                });
            }
        }

        let addr = system
            .spawn_with(
                Gate {
                    entered: entered_tx,
                    release: release_rx,
                },
                SpawnOptions::default().mailbox(MailboxPolicy::Bounded(2)),
            )
            .unwrap();

        system.send(&addr, 0u32); // popped by the worker, then blocks
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should pop the first message");
        system.send(&addr, 1u32);
        system.send(&addr, 2u32);
        system.send(&addr, 3u32); // overflow

        let _ = release_tx.send(());
        let _ = release_tx.send(());
        let _ = release_tx.send(());
        system.wait_idle();

        let metrics = system.metrics();
        assert_eq!(metrics.messages_dropped_full, 1);
        assert_eq!(metrics.messages_processed, 3);
        system.shutdown();
    }

    #[test]
    fn panicking_handler_does_not_take_down_the_actor() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));

        struct Flaky {
            hits: Arc<AtomicUsize>,
        }
        impl Actor for Flaky {
            fn register(&mut self, handlers: &mut HandlerTable<Self>) {
                handlers.handle(|flaky: &mut Flaky, _ctx: &mut Context, explode: bool| {
                    if explode {
                        panic!("intentional test panic");
                    }
                    flaky.hits.fetch_add(1, Ordering::SeqCst);
                });
            }
        }

        let addr = system.spawn(Flaky { hits: Arc::clone(&hits) });
        system.send(&addr, true);
        system.send(&addr, false);
        system.wait_idle();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let metrics = system.metrics();
        assert_eq!(metrics.handler_panics, 1);
        assert!(system.contains(&addr));
        system.shutdown();
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let system = small_system();
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = system.spawn(Echo { hits: Arc::clone(&hits) });
        system.shutdown();

        assert_eq!(
            system
                .spawn_named("late", Echo { hits: Arc::clone(&hits) })
                .unwrap_err(),
            Error::ShutDown
        );
        let late = system.spawn(Echo { hits: Arc::clone(&hits) });
        assert!(!system.contains(&late));

        system.send(&addr, 5u32);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        system.shutdown(); // idempotent
    }
}
