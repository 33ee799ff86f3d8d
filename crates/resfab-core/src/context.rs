//! Ambient request context.
//!
//! One context per in-flight request, installed by the protocol adapter
//! before dispatching to a factory and cleared when the guard drops.
//! Deeply nested code (lifecycle hooks, secondary permission checks) reads
//! the acting principal from here instead of threading it through every
//! signature. The thread-local is request-scoped state, never shared or
//! mutated across requests.

use std::cell::RefCell;

thread_local! {
    static CONTEXT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

///
/// Principal
///
/// The acting identity for the current request, as authenticated by the
/// protocol adapter.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Principal {
    pub id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

///
/// RequestContext
///

#[derive(Clone, Debug)]
struct RequestContext {
    principal: Principal,
    // kind + external id of the most recently resolved entity
    entity: Option<(String, String)>,
}

///
/// ContextScope
///
/// RAII guard for the ambient context. Created at request start; the
/// context is cleared (and the previous one restored, for adapters that
/// impersonate) when the guard drops.
///

pub struct ContextScope {
    previous: Option<RequestContext>,
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        CONTEXT.with_borrow_mut(|ctx| *ctx = self.previous.take());
    }
}

/// Install the acting principal for the current request.
#[must_use]
pub fn enter(principal: Principal) -> ContextScope {
    let previous = CONTEXT.with_borrow_mut(|ctx| {
        ctx.replace(RequestContext {
            principal,
            entity: None,
        })
    });

    ContextScope { previous }
}

/// The acting principal, if a request scope is active.
#[must_use]
pub fn current_principal() -> Option<Principal> {
    CONTEXT.with_borrow(|ctx| ctx.as_ref().map(|c| c.principal.clone()))
}

/// Record the resolved entity for audit/diagnostic purposes.
///
/// No-op outside a request scope.
pub fn set_entity_info(kind: &str, id: &str) {
    CONTEXT.with_borrow_mut(|ctx| {
        if let Some(ctx) = ctx.as_mut() {
            ctx.entity = Some((kind.to_owned(), id.to_owned()));
        }
    });
}

/// The kind and external id recorded by the most recent resolution.
#[must_use]
pub fn entity_info() -> Option<(String, String)> {
    CONTEXT.with_borrow(|ctx| ctx.as_ref().and_then(|c| c.entity.clone()))
}
