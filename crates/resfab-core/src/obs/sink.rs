//! Observability sink boundary.
//!
//! Engine logic MUST NOT depend on `obs::metrics` directly. All
//! instrumentation flows through [`ObsEvent`] and [`ObsSink`]; this module
//! is the only bridge between pipeline code and counter state. Tests
//! install a scoped sink override to assert on emitted events.

use crate::{access::Operation, obs::metrics};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn ObsSink>>> = const { RefCell::new(None) };
}

///
/// OpKind
///
/// The five orchestrated pipelines plus custom named operations.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpKind {
    Create,
    Get,
    List,
    Update,
    Delete,
    Custom,
}

///
/// ObsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum ObsEvent {
    OpStart {
        op: OpKind,
        entity_kind: &'static str,
    },
    OpFinish {
        op: OpKind,
        entity_kind: &'static str,
        ok: bool,
    },
    PermissionDenied {
        operation: Operation,
        entity_kind: &'static str,
    },
    StaleUpdateRejected {
        entity_kind: &'static str,
    },
    /// Emitted when a list had no blanket grant and fell back to
    /// entity-by-entity filtering.
    ListFilterFallback {
        entity_kind: &'static str,
    },
}

///
/// ObsSink
///

pub trait ObsSink {
    fn record(&self, event: ObsEvent);
}

/// GlobalObsSink
/// Default process-local sink that writes into global counter state.

struct GlobalObsSink;

impl ObsSink for GlobalObsSink {
    fn record(&self, event: ObsEvent) {
        metrics::with_state_mut(|m| m.apply(event));
    }
}

/// Route an event to the scoped override, or the global sink.
pub fn record(event: ObsEvent) {
    let handled = SINK_OVERRIDE.with_borrow(|sink| {
        sink.as_ref().map(|s| s.record(event)).is_some()
    });

    if !handled {
        GlobalObsSink.record(event);
    }
}

///
/// SinkOverrideGuard
///
/// Scoped sink override for tests; the previous sink is restored on drop.
///

pub struct SinkOverrideGuard {
    previous: Option<Rc<dyn ObsSink>>,
}

impl Drop for SinkOverrideGuard {
    fn drop(&mut self) {
        SINK_OVERRIDE.with_borrow_mut(|sink| *sink = self.previous.take());
    }
}

#[must_use]
pub fn override_sink(sink: Rc<dyn ObsSink>) -> SinkOverrideGuard {
    let previous = SINK_OVERRIDE.with_borrow_mut(|slot| slot.replace(sink));

    SinkOverrideGuard { previous }
}
