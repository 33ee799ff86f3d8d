//! Core engine for resfab: entity contracts, selector resolution, the
//! access gate, optimistic concurrency, and the generic CRUD orchestrator
//! composed from per-kind mappers.
#![warn(unreachable_pub)]

pub mod access;
pub mod context;
pub mod entity;
pub mod error;
pub mod factory;
pub mod obs;
pub mod selector;
pub mod store;
pub mod tx;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No stores, sinks, or transaction machinery are re-exported here.
///

pub mod prelude {
    pub use crate::{
        access::Operation,
        entity::{EntityBag, EntityHeader, EntityId, PersistentEntity},
        error::ResourceError,
        factory::{ManagedResource, ResourceFactory, ResourceMapper},
        selector::SelectorMap,
    };
}
