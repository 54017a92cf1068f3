//! Actor identity and addressing.
//!
//! An [`ActorId`] is the owned identity: a process-unique numeric id plus a
//! hierarchical `/`-separated name. An [`Address`] is a non-owning view of
//! one actor: it carries a copy of the identity for naming and diagnostics,
//! plus a generational slot key into the registry table. Validity is
//! derived, never stored: an address is live only while its slot's current
//! generation still matches, so copies of an address never extend an
//! actor's lifetime, and a slot reused after `stop` can never be reached
//! through a stale address.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Characters reserved for internal use inside actor names. `/` is the
/// path separator; `#` marks auto-generated names; `.` and `@` are held
/// back for the remote addressing seam.
pub const RESERVED_NAME_CHARS: [char; 3] = ['#', '.', '@'];

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh process-unique actor id. Zero is never returned; it is
/// the invalid sentinel.
pub(crate) fn next_actor_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Owned actor identity: unique id plus full hierarchical name.
/// Equality is by `(id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorId {
    id: u64,
    name: Arc<str>,
}

impl ActorId {
    pub(crate) fn new(id: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The invalid identity: id zero, empty name.
    pub(crate) fn invalid() -> Self {
        Self {
            id: 0,
            name: Arc::from(""),
        }
    }

    /// An identity is valid when its id is nonzero and its name nonempty.
    pub fn is_valid(&self) -> bool {
        self.id != 0 && !self.name.is_empty()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Leaf name: the part after the last `/`, or the whole name.
    pub fn name(&self) -> &str {
        match self.name.rfind('/') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// The full hierarchical name as registered.
    pub fn full_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn full_name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Everything before the last `/`, or `"/"` when the name has no
    /// parent component.
    pub fn parent_name(&self) -> &str {
        match self.name.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.name[..pos],
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}#{}", self.name, self.id)
        } else {
            write!(f, "-")
        }
    }
}

/// Placeholder for a remote actor identity.
///
/// The remote transport layer is an extension seam, not shipped here: a
/// `RemoteId` never compares equal to anything (itself included) and is
/// never valid.
#[derive(Debug, Clone, Default)]
pub struct RemoteId(());

impl RemoteId {
    pub fn is_valid(&self) -> bool {
        false
    }
}

impl PartialEq for RemoteId {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-")
    }
}

/// Generational key into the registry's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl SlotKey {
    /// A key that resolves to nothing in any registry.
    pub(crate) const DETACHED: SlotKey = SlotKey {
        slot: u32::MAX,
        generation: u32::MAX,
    };
}

/// Non-owning reference to an actor.
///
/// Cheap to clone and safe to hold after the actor stops: all routing goes
/// through the registry, which rejects stale generations. Use
/// [`ActorSystem::contains`](crate::ActorSystem::contains) to observe
/// liveness.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    key: SlotKey,
    id: ActorId,
}

impl Address {
    pub(crate) fn new(key: SlotKey, id: ActorId) -> Self {
        Self { key, id }
    }

    /// The "no sender" address used for plain sends from outside any
    /// handler. Its identity is invalid and it resolves to nothing.
    pub(crate) fn none() -> Self {
        Self {
            key: SlotKey::DETACHED,
            id: ActorId::invalid(),
        }
    }

    pub(crate) fn key(&self) -> SlotKey {
        self.key
    }

    /// The identity this address was minted for.
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Always false: remote addressing is an unimplemented extension seam.
    pub fn is_remote(&self) -> bool {
        false
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@-", self.id)
    }
}

/// Validate one path segment: nonempty, no separator, no reserved chars.
pub(crate) fn validate_leaf(leaf: &str) -> Result<()> {
    if leaf.is_empty() {
        return Err(Error::invalid_name(leaf, "empty name segment"));
    }
    if leaf.contains('/') {
        return Err(Error::invalid_name(leaf, "leaf name contains '/'"));
    }
    if let Some(ch) = leaf.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
        return Err(Error::invalid_name(
            leaf,
            format!("reserved character {:?}", ch),
        ));
    }
    Ok(())
}

/// Validate a full name: an optional leading `/` followed by one or more
/// valid segments.
pub(crate) fn validate_full_name(name: &str) -> Result<()> {
    let path = name.strip_prefix('/').unwrap_or(name);
    if path.is_empty() {
        return Err(Error::invalid_name(name, "missing leaf name"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(Error::invalid_name(name, "empty name segment"));
        }
        if let Some(ch) = segment.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
            return Err(Error::invalid_name(
                name,
                format!("reserved character {:?}", ch),
            ));
        }
    }
    Ok(())
}
