use crate::{
    entity::{EntityHeader, EntityId, PersistentEntity},
    store::{EntityStore, StoreError},
};
use std::collections::BTreeMap;

///
/// MemoryStore
///
/// Reference `EntityStore` backed by an ordered map. Identities are
/// minted from a per-store sequence, so ids are deterministic within a
/// store's lifetime. Unique-name collisions surface as `DuplicateKey`.
///
/// The store is `Clone`; transaction managers snapshot it wholesale to
/// implement rollback.
///

#[derive(Clone, Debug)]
pub struct MemoryStore<E: PersistentEntity> {
    rows: BTreeMap<EntityId, E>,
    seq: u64,
}

impl<E: PersistentEntity> MemoryStore<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            seq: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn mint_id(&mut self) -> EntityId {
        self.seq += 1;
        EntityId::from_parts(self.seq, u128::from(self.seq))
    }

    fn check_unique_name(&self, entity: &E, skip: Option<EntityId>) -> Result<(), StoreError> {
        let Some(name) = entity.name() else {
            return Ok(());
        };

        let clash = self.rows.values().any(|row| {
            Some(row.id()) != skip
                && row
                    .name()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
        });

        if clash {
            Err(StoreError::DuplicateKey(format!("name '{name}'")))
        } else {
            Ok(())
        }
    }

    fn insert_new(&mut self, id: EntityId, entity: &mut E) -> Result<(), StoreError> {
        if self.rows.contains_key(&id) {
            return Err(StoreError::DuplicateKey(format!("id {id}")));
        }
        self.check_unique_name(entity, None)?;

        entity.set_id(id);
        self.rows.insert(id, entity.clone());

        Ok(())
    }
}

impl<E: PersistentEntity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PersistentEntity> EntityStore<E> for MemoryStore<E> {
    fn save(&mut self, entity: &mut E) -> Result<EntityId, StoreError> {
        let id = self.mint_id();
        self.insert_new(id, entity)?;

        Ok(id)
    }

    fn save_with_id(&mut self, id: EntityId, entity: &mut E) -> Result<(), StoreError> {
        self.insert_new(id, entity)
    }

    fn update(&mut self, entity: &mut E) -> Result<(), StoreError> {
        let id = entity.id();
        if !self.rows.contains_key(&id) {
            return Err(StoreError::MissingRow(id.to_string()));
        }
        self.check_unique_name(entity, Some(id))?;

        // version bump is the store's responsibility
        entity.set_version(entity.version() + 1);
        self.rows.insert(id, entity.clone());

        Ok(())
    }

    fn delete(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::MissingRow(id.to_string()))
    }

    fn find_by_primary_key(&self, id: EntityId) -> Result<Option<E>, StoreError> {
        Ok(self.rows.get(&id).cloned())
    }

    fn find_by_unique_name(&self, name: &str) -> Result<Option<E>, StoreError> {
        Ok(self
            .rows
            .values()
            .find(|row| row.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .cloned())
    }

    fn find_by_guid(&self, guid: &str) -> Result<Option<E>, StoreError> {
        Ok(self
            .rows
            .values()
            .find(|row| row.guid() == Some(guid))
            .cloned())
    }

    fn find_all_headers(&self) -> Result<Vec<EntityHeader>, StoreError> {
        Ok(self.rows.values().map(EntityHeader::of).collect())
    }

    fn find_page(&self, offset: usize, limit: Option<usize>) -> Result<Vec<E>, StoreError> {
        let iter = self.rows.values().skip(offset);

        Ok(match limit {
            Some(limit) => iter.take(limit).cloned().collect(),
            None => iter.cloned().collect(),
        })
    }
}
