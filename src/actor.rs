//! Actor behavior and the per-invocation handler context.

use crate::address::Address;
use crate::dispatch::{Envelope, HandlerTable};
use crate::error::Result;
use crate::system::ActorSystem;
use std::any::{Any, TypeId};

/// A unit of state reachable only through asynchronous message sends.
///
/// Handlers registered in [`register`](Actor::register) execute one at a
/// time, in arrival order, on pool worker threads. The actor value itself
/// is owned by the registry and never shared, so handlers get `&mut self`
/// without further synchronization.
pub trait Actor: Send + Sized + 'static {
    /// Populate the handler table. Called once at spawn, before the first
    /// message is delivered.
    fn register(&mut self, handlers: &mut HandlerTable<Self>);
}

/// Execution context bound to a single handler invocation.
///
/// A fresh context is created for every popped invocation; the sender it
/// reports is only meaningful during that invocation.
pub struct Context {
    system: ActorSystem,
    self_addr: Address,
    sender: Address,
    removals: Vec<TypeId>,
}

impl Context {
    pub(crate) fn new(system: ActorSystem, self_addr: Address, sender: Address) -> Self {
        Self {
            system,
            self_addr,
            sender,
            removals: Vec::new(),
        }
    }

    /// Address of the actor that sent the current message. Invalid when
    /// the message came from outside any handler via a plain `send`.
    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// Address of the actor currently executing.
    pub fn self_addr(&self) -> &Address {
        &self.self_addr
    }

    /// Handle to the owning system.
    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    /// Send `msg` to `to` with this actor as the sender.
    pub fn send<M: Send + 'static>(&self, to: &Address, msg: M) {
        self.system.send_as(&self.self_addr, to, msg);
    }

    /// Send `msg` back to the sender of the current message. A no-op when
    /// the current message had no live sender.
    pub fn reply<M: Send + 'static>(&self, msg: M) {
        self.system.send_as(&self.self_addr, &self.sender, msg);
    }

    /// Pass `msg` on to `next`, preserving the original sender: a reply
    /// from `next` goes to whoever sent the current message, not to this
    /// actor.
    pub fn forward<M: Send + 'static>(&self, next: &Address, msg: M) {
        self.system.send_as(&self.sender, next, msg);
    }

    /// Spawn a new auto-named actor.
    pub fn spawn<A: Actor>(&self, actor: A) -> Address {
        self.system.spawn(actor)
    }

    /// Spawn a named actor; see [`ActorSystem::spawn_named`].
    pub fn spawn_named<A: Actor>(&self, name: &str, actor: A) -> Result<Address> {
        self.system.spawn_named(name, actor)
    }

    /// Stop an actor, this one included. Stopping self lets the current
    /// invocation finish and drops the rest of the mailbox.
    pub fn stop(&self, addr: &Address) {
        self.system.stop(addr);
    }

    /// Deregister this actor's handler for message type `M` once the
    /// current invocation returns. Later queued messages of that shape are
    /// silently dropped.
    pub fn unhandle<M: 'static>(&mut self) {
        self.removals.push(TypeId::of::<M>());
    }

    pub(crate) fn take_removals(&mut self) -> Vec<TypeId> {
        std::mem::take(&mut self.removals)
    }
}

/// An actor value paired with its handler table, owned by the registry.
pub(crate) struct ActorCell<A: Actor> {
    actor: A,
    handlers: HandlerTable<A>,
}

impl<A: Actor> ActorCell<A> {
    pub(crate) fn new(mut actor: A) -> Self {
        let mut handlers = HandlerTable::new();
        actor.register(&mut handlers);
        Self { actor, handlers }
    }
}

/// Object-safe view of an [`ActorCell`], so the registry can own actors of
/// arbitrary concrete type behind one record shape.
pub(crate) trait AnyCell: Send {
    /// Dispatch one envelope; returns false when no handler matched.
    fn invoke(&mut self, ctx: &mut Context, envelope: Envelope) -> bool;

    /// The actor value, for typed inspection.
    fn actor_any(&self) -> &dyn Any;
}

impl<A: Actor> AnyCell for ActorCell<A> {
    fn invoke(&mut self, ctx: &mut Context, envelope: Envelope) -> bool {
        let handled = self.handlers.dispatch(&mut self.actor, ctx, envelope);
        for fingerprint in ctx.take_removals() {
            self.handlers.remove_fingerprint(fingerprint);
        }
        handled
    }

    fn actor_any(&self) -> &dyn Any {
        &self.actor
    }
}
