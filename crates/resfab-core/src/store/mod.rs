mod memory;

pub use memory::*;

use crate::entity::{EntityHeader, EntityId, PersistentEntity};
use thiserror::Error as ThisError;

///
/// StoreError
///
/// The single failure category a persistence backend surfaces. The
/// transaction boundary translates it into `ResourceError::ResourceAccess`
/// before it leaves the engine; pipeline code never matches on variants.
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("no persisted entity for id {0}")]
    MissingRow(String),

    #[error("transaction failure: {0}")]
    Transaction(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

///
/// EntityStore
///
/// The persistence collaborator for one entity kind.
///
/// Contract:
/// - `save` assigns the identity and persists version as given.
/// - `update` requires the row to exist and bumps the persisted version
///   by exactly one.
/// - Lookups return `None` for absent rows; only backend trouble is an
///   error.
///
/// `find_by_guid` and the `*_roles` methods are optional capabilities;
/// kinds without them keep the defaults.
///

pub trait EntityStore<E: PersistentEntity> {
    /// Persist a new entity, minting and assigning its identity.
    fn save(&mut self, entity: &mut E) -> Result<EntityId, StoreError>;

    /// Persist a new entity under a caller-chosen identity.
    fn save_with_id(&mut self, id: EntityId, entity: &mut E) -> Result<(), StoreError>;

    /// Persist changes to an existing entity, bumping its version.
    fn update(&mut self, entity: &mut E) -> Result<(), StoreError>;

    fn delete(&mut self, id: EntityId) -> Result<(), StoreError>;

    fn find_by_primary_key(&self, id: EntityId) -> Result<Option<E>, StoreError>;

    fn find_by_unique_name(&self, name: &str) -> Result<Option<E>, StoreError>;

    /// Secondary unique-key lookup, for kinds that carry a guid.
    fn find_by_guid(&self, _guid: &str) -> Result<Option<E>, StoreError> {
        Ok(None)
    }

    fn find_all_headers(&self) -> Result<Vec<EntityHeader>, StoreError>;

    /// Materialized page of entities in stable id order.
    fn find_page(&self, offset: usize, limit: Option<usize>) -> Result<Vec<E>, StoreError>;

    // Secondary role/permission wiring for role-aware entity kinds.
    // Invoked inside the operation's transaction, right around the
    // primary persistence call. Defaults are no-ops.

    fn create_roles(&mut self, _entity: &E) -> Result<(), StoreError> {
        Ok(())
    }

    fn update_roles(&mut self, _entity: &E) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete_roles(&mut self, _entity: &E) -> Result<(), StoreError> {
        Ok(())
    }
}
