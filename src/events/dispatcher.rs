//! One-slot-per-event callback registry.

use std::sync::RwLock;

use crate::events::types::{
    BalanceUpdateEvent, ErrorEvent, SessionClosedEvent, SessionCreatedEvent, TipReceivedEvent,
    TipSentEvent,
};

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A single handler slot. Setting a new handler replaces the previous one.
struct Slot<T>(RwLock<Option<Handler<T>>>);

impl<T> Slot<T> {
    fn set(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        *self.0.write().unwrap() = Some(Box::new(handler));
    }

    fn fire(&self, payload: &T) {
        if let Some(handler) = self.0.read().unwrap().as_ref() {
            handler(payload);
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(RwLock::new(None))
    }
}

/// Registers and fires the typed callbacks consumed by the presentation
/// layer.
///
/// Each event name has exactly one slot; the last registration wins.
/// Handlers run inline on the firing task, so they must not block and must
/// not register handlers from inside their own invocation.
#[derive(Default)]
pub struct EventDispatcher {
    connected: Slot<()>,
    disconnected: Slot<()>,
    session_created: Slot<SessionCreatedEvent>,
    tip_sent: Slot<TipSentEvent>,
    tip_received: Slot<TipReceivedEvent>,
    balance_update: Slot<BalanceUpdateEvent>,
    session_closed: Slot<SessionClosedEvent>,
    error: Slot<ErrorEvent>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connected(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.connected.set(move |_: &()| handler());
    }

    pub fn on_disconnected(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.disconnected.set(move |_: &()| handler());
    }

    pub fn on_session_created(
        &self,
        handler: impl Fn(&SessionCreatedEvent) + Send + Sync + 'static,
    ) {
        self.session_created.set(handler);
    }

    pub fn on_tip_sent(&self, handler: impl Fn(&TipSentEvent) + Send + Sync + 'static) {
        self.tip_sent.set(handler);
    }

    pub fn on_tip_received(&self, handler: impl Fn(&TipReceivedEvent) + Send + Sync + 'static) {
        self.tip_received.set(handler);
    }

    pub fn on_balance_update(&self, handler: impl Fn(&BalanceUpdateEvent) + Send + Sync + 'static) {
        self.balance_update.set(handler);
    }

    pub fn on_session_closed(
        &self,
        handler: impl Fn(&SessionClosedEvent) + Send + Sync + 'static,
    ) {
        self.session_closed.set(handler);
    }

    pub fn on_error(&self, handler: impl Fn(&ErrorEvent) + Send + Sync + 'static) {
        self.error.set(handler);
    }

    pub(crate) fn emit_connected(&self) {
        self.connected.fire(&());
    }

    pub(crate) fn emit_disconnected(&self) {
        self.disconnected.fire(&());
    }

    pub(crate) fn emit_session_created(&self, event: SessionCreatedEvent) {
        self.session_created.fire(&event);
    }

    pub(crate) fn emit_tip_sent(&self, event: TipSentEvent) {
        self.tip_sent.fire(&event);
    }

    pub(crate) fn emit_tip_received(&self, event: TipReceivedEvent) {
        self.tip_received.fire(&event);
    }

    pub(crate) fn emit_balance_update(&self, event: BalanceUpdateEvent) {
        self.balance_update.fire(&event);
    }

    pub(crate) fn emit_session_closed(&self, event: SessionClosedEvent) {
        self.session_closed.fire(&event);
    }

    pub(crate) fn emit_error(&self, event: ErrorEvent) {
        tracing::debug!(kind = %event.kind, message = %event.message, "error event");
        self.error.fire(&event);
    }
}
