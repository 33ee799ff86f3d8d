//! Global operation counters, keyed per entity kind.
//!
//! Written only through the sink boundary in `obs::sink`.

use crate::obs::sink::{ObsEvent, OpKind};
use std::{cell::RefCell, collections::BTreeMap};

thread_local! {
    static STATE: RefCell<ObsState> = RefCell::new(ObsState::default());
}

///
/// OpCounters
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpCounters {
    pub create_calls: u64,
    pub get_calls: u64,
    pub list_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub custom_calls: u64,
    pub failures: u64,
    pub permission_denials: u64,
    pub stale_rejections: u64,
    pub list_filter_fallbacks: u64,
}

impl OpCounters {
    fn bump_start(&mut self, op: OpKind) {
        let slot = match op {
            OpKind::Create => &mut self.create_calls,
            OpKind::Get => &mut self.get_calls,
            OpKind::List => &mut self.list_calls,
            OpKind::Update => &mut self.update_calls,
            OpKind::Delete => &mut self.delete_calls,
            OpKind::Custom => &mut self.custom_calls,
        };
        *slot = slot.saturating_add(1);
    }
}

///
/// ObsState
///

#[derive(Clone, Debug, Default)]
pub struct ObsState {
    pub totals: OpCounters,
    pub entities: BTreeMap<String, OpCounters>,
}

impl ObsState {
    pub(crate) fn apply(&mut self, event: ObsEvent) {
        match event {
            ObsEvent::OpStart { op, entity_kind } => {
                self.totals.bump_start(op);
                self.entity(entity_kind).bump_start(op);
            }
            ObsEvent::OpFinish {
                ok, entity_kind, ..
            } => {
                if !ok {
                    self.totals.failures = self.totals.failures.saturating_add(1);
                    let entry = self.entity(entity_kind);
                    entry.failures = entry.failures.saturating_add(1);
                }
            }
            ObsEvent::PermissionDenied { entity_kind, .. } => {
                self.totals.permission_denials =
                    self.totals.permission_denials.saturating_add(1);
                let entry = self.entity(entity_kind);
                entry.permission_denials = entry.permission_denials.saturating_add(1);
            }
            ObsEvent::StaleUpdateRejected { entity_kind } => {
                self.totals.stale_rejections = self.totals.stale_rejections.saturating_add(1);
                let entry = self.entity(entity_kind);
                entry.stale_rejections = entry.stale_rejections.saturating_add(1);
            }
            ObsEvent::ListFilterFallback { entity_kind } => {
                self.totals.list_filter_fallbacks =
                    self.totals.list_filter_fallbacks.saturating_add(1);
                let entry = self.entity(entity_kind);
                entry.list_filter_fallbacks = entry.list_filter_fallbacks.saturating_add(1);
            }
        }
    }

    fn entity(&mut self, kind: &str) -> &mut OpCounters {
        self.entities.entry(kind.to_owned()).or_default()
    }
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut ObsState) -> R) -> R {
    STATE.with_borrow_mut(f)
}

/// Snapshot of the current counter state.
#[must_use]
pub fn snapshot() -> ObsState {
    STATE.with_borrow(Clone::clone)
}

/// Reset all counters. Intended for tests.
pub fn reset() {
    STATE.with_borrow_mut(|state| *state = ObsState::default());
}
