//! Type-erased handler dispatch.
//!
//! Every handler is registered against a concrete message type; the
//! registration is keyed by a dispatch fingerprint derived from that type
//! (the stable [`TypeId`]). A multi-parameter signature is expressed as a
//! tuple message, so `(i64, String)` and `(f64, String)` carry distinct
//! fingerprints. Dispatch is exact fingerprint equality only, never a
//! subtype or partial match: a message whose fingerprint matches no entry
//! is dropped silently. That drop is deliberate policy, not an error, and
//! is observable only through metrics and debug logs.
//!
//! At most one handler exists per fingerprint; re-registering the same
//! message type replaces the previous entry.

use crate::actor::{Actor, Context};
use crate::address::Address;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tracing::debug;

/// The dispatch fingerprint of a message type.
pub fn fingerprint_of<M: 'static>() -> TypeId {
    TypeId::of::<M>()
}

/// A pending invocation: the captured sender and argument values queued
/// for later execution against one actor.
pub struct Envelope {
    pub(crate) sender: Address,
    pub(crate) fingerprint: TypeId,
    pub(crate) payload: Box<dyn Any + Send>,
    pub(crate) type_name: &'static str,
}

impl Envelope {
    pub(crate) fn new<M: Send + 'static>(sender: Address, msg: M) -> Self {
        Self {
            sender,
            fingerprint: TypeId::of::<M>(),
            payload: Box::new(msg),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// Address the invocation was sent from; invalid for plain sends.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// Human-readable message type, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("sender", &self.sender)
            .field("type_name", &self.type_name)
            .finish()
    }
}

type BoxedHandler<A> = Box<dyn Fn(&mut A, &mut Context, Box<dyn Any + Send>) + Send>;

/// Per-actor table mapping dispatch fingerprints to bound callables.
pub struct HandlerTable<A> {
    handlers: HashMap<TypeId, BoxedHandler<A>>,
}

impl<A: Actor> HandlerTable<A> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for message type `M`. Replaces any previous
    /// handler with the same fingerprint; the last registration wins.
    pub fn handle<M, F>(&mut self, handler: F) -> &mut Self
    where
        M: Send + 'static,
        F: Fn(&mut A, &mut Context, M) + Send + 'static,
    {
        let erased: BoxedHandler<A> = Box::new(move |actor, ctx, payload| {
            match payload.downcast::<M>() {
                Ok(msg) => handler(actor, ctx, *msg),
                // Unreachable while dispatch keys by fingerprint; kept as a
                // silent drop so a bug here can never escalate.
                Err(_) => debug!(
                    expected = std::any::type_name::<M>(),
                    "payload failed to downcast, dropping"
                ),
            }
        });
        if self.handlers.insert(TypeId::of::<M>(), erased).is_some() {
            debug!(
                message_type = std::any::type_name::<M>(),
                "handler re-registered, previous entry replaced"
            );
        }
        self
    }

    /// Remove the handler for message type `M`. Returns whether one was
    /// registered.
    pub fn unhandle<M: 'static>(&mut self) -> bool {
        self.handlers.remove(&TypeId::of::<M>()).is_some()
    }

    pub(crate) fn remove_fingerprint(&mut self, fingerprint: TypeId) -> bool {
        self.handlers.remove(&fingerprint).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler whose fingerprint matches the envelope. Returns
    /// false when no handler matched and the message was dropped.
    pub(crate) fn dispatch(&self, actor: &mut A, ctx: &mut Context, envelope: Envelope) -> bool {
        match self.handlers.get(&envelope.fingerprint) {
            Some(handler) => {
                handler(actor, ctx, envelope.payload);
                true
            }
            None => {
                debug!(
                    message_type = envelope.type_name,
                    "no handler registered for message shape, dropping"
                );
                false
            }
        }
    }
}

impl<A> std::fmt::Debug for HandlerTable<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
