//! Actor system configuration.

use serde::{Deserialize, Serialize};

/// Capacity policy for a mailbox's backing queue.
///
/// `Bounded(0)` is treated as unbounded, mirroring the queue constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailboxPolicy {
    /// Never rejects a message. The default.
    Unbounded,
    /// Holds at most this many pending messages; overflow is dropped and
    /// counted, never blocked on.
    Bounded(usize),
}

impl Default for MailboxPolicy {
    fn default() -> Self {
        MailboxPolicy::Unbounded
    }
}

/// Configuration for [`ActorSystem`](crate::ActorSystem) construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Human-readable system name, used in logs.
    pub name: String,
    /// Worker thread count for the default pool. `None` uses the machine's
    /// available parallelism.
    pub worker_threads: Option<usize>,
    /// Mailbox policy applied to spawns that do not override it.
    pub default_mailbox: MailboxPolicy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "actor-system".to_string(),
            worker_threads: None,
            default_mailbox: MailboxPolicy::Unbounded,
        }
    }
}

impl SystemConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    pub fn with_default_mailbox(mut self, policy: MailboxPolicy) -> Self {
        self.default_mailbox = policy;
        self
    }
}
