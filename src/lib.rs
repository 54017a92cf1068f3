//! In-Process Actor Runtime
//!
//! Independent units of state ("actors") communicate exclusively through
//! asynchronous, typed message sends. Each actor's handlers run one at a
//! time, in arrival order, on a shared worker pool; callers never manage
//! threads.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐      ┌─────────────────────┐
//! │         Actor System         │      │     Worker Pool     │
//! │                              │      │                     │
//! │  ┌────────┐  ┌────────────┐  │      │  ┌───────────────┐  │
//! │  │ slot   │  │ ActorA     │  │ drain│  │ actor-worker-0│  │
//! │  │ table  │──│ + mailbox  │──┼──────┼─▶│ actor-worker-1│  │
//! │  │ + name │  └────────────┘  │ jobs │  │      ...      │  │
//! │  │ index  │  ┌────────────┐  │      │  └───────────────┘  │
//! │  │        │──│ ActorB     │  │      │                     │
//! │  └────────┘  │ + mailbox  │  │      │  shared job queue   │
//! │              └────────────┘  │      │                     │
//! └──────────────────────────────┘      └─────────────────────┘
//! ```
//!
//! A send looks up the target's record, binds the arguments and sender
//! into a pending invocation, pushes it into the target's mailbox, and
//! submits one drain job when the mailbox was idle. The drain job pops
//! invocations one at a time and dispatches each to the handler whose
//! fingerprint matches the message's concrete type.
//!
//! # Guarantees
//!
//! - **FIFO per actor**: messages execute in arrival order.
//! - **At most one**: a single actor never runs two handlers concurrently;
//!   distinct actors drain in parallel across the pool.
//! - **Fire-and-forget**: sends never block and never fail loudly. A dead
//!   address, a full bounded mailbox, or an unmatched message shape drops
//!   the message, counted in metrics and logged at debug level.
//!
//! # Example
//!
//! ```rust
//! use actor_runtime::{Actor, ActorSystem, Context, HandlerTable};
//!
//! struct Greeter {
//!     seen: usize,
//! }
//!
//! impl Actor for Greeter {
//!     fn register(&mut self, handlers: &mut HandlerTable<Self>) {
//!         handlers.handle(Self::on_greeting);
//!     }
//! }
//!
//! impl Greeter {
//!     fn on_greeting(&mut self, _ctx: &mut Context, (count, name): (i64, String)) {
//!         self.seen += 1;
//!         println!("hello {name} x{count}");
//!     }
//! }
//!
//! let system = ActorSystem::new();
//! let greeter = system.spawn(Greeter { seen: 0 });
//! system.send(&greeter, (3i64, "world".to_string()));
//! system.wait_idle();
//! system.shutdown();
//! ```

pub mod actor;
pub mod address;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod mailbox;
pub mod queue;
pub mod system;

pub use actor::{Actor, Context};
pub use address::{ActorId, Address, RemoteId, RESERVED_NAME_CHARS};
pub use config::{MailboxPolicy, SystemConfig};
pub use dispatch::{fingerprint_of, HandlerTable};
pub use error::{Error, Result};
pub use executor::{Executor, Job, ThreadPool};
pub use mailbox::{Mailbox, ScheduleState};
pub use queue::Queue;
pub use system::{ActorSystem, MetricsSnapshot, SpawnOptions, SystemMetrics};
