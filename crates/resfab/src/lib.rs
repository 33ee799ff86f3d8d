//! ## Crate layout
//! - `core`: the runtime engine: entity contracts, selector resolution,
//!   the access gate, transactions, and the generic CRUD orchestrator.
//!
//! The `prelude` module mirrors the surface a protocol adapter and the
//! per-kind mappers use; everything else is reached through `core`.

pub use resfab_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Adapter Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        access::{AccessControl, Operation},
        context::{self, ContextScope, Principal},
        entity::{EntityBag, EntityHeader, EntityId, PersistentEntity, ValidationIssue},
        error::{InvalidKind, ResourceError},
        factory::{
            CustomOperation, EntityResourceFactory, FactoryOptions, ManagedResource, Page,
            ResourceFactory as _, ResourceMapper,
        },
        selector::SelectorMap,
        store::{EntityStore, MemoryStore, StoreError},
        tx::{CompositeTransactions, MemoryTransactions, NoopTransactions, TransactionManager},
    };
}
