use crate::entity::{AnyEntity, PersistentEntity};
use std::fmt;

///
/// EntityBag
///
/// A primary entity plus the tightly-coupled dependents that must be
/// persisted or rolled back with it. Only the primary exposes identity
/// and version to callers; dependents are reached through the object-safe
/// [`AnyEntity`] view by the mapper that put them there.
///

pub struct EntityBag<E: PersistentEntity> {
    primary: E,
    dependents: Vec<Box<dyn AnyEntity>>,
}

impl<E: PersistentEntity> EntityBag<E> {
    #[must_use]
    pub const fn new(primary: E) -> Self {
        Self {
            primary,
            dependents: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dependents(primary: E, dependents: Vec<Box<dyn AnyEntity>>) -> Self {
        Self {
            primary,
            dependents,
        }
    }

    #[must_use]
    pub const fn primary(&self) -> &E {
        &self.primary
    }

    pub const fn primary_mut(&mut self) -> &mut E {
        &mut self.primary
    }

    #[must_use]
    pub fn dependents(&self) -> &[Box<dyn AnyEntity>] {
        &self.dependents
    }

    pub fn dependents_mut(&mut self) -> &mut Vec<Box<dyn AnyEntity>> {
        &mut self.dependents
    }

    pub fn push_dependent(&mut self, dependent: Box<dyn AnyEntity>) {
        self.dependents.push(dependent);
    }

    /// Iterate every member, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyEntity> {
        std::iter::once(&self.primary as &dyn AnyEntity)
            .chain(self.dependents.iter().map(|d| d.as_ref() as &dyn AnyEntity))
    }

    /// Iterate every member mutably, primary first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn AnyEntity> {
        let Self {
            primary,
            dependents,
        } = self;

        std::iter::once(primary as &mut dyn AnyEntity)
            .chain(dependents.iter_mut().map(|d| d.as_mut() as &mut dyn AnyEntity))
    }

    /// Deconstruct into the primary entity, dropping dependents.
    #[must_use]
    pub fn into_primary(self) -> E {
        self.primary
    }
}

impl<E: PersistentEntity> fmt::Debug for EntityBag<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBag")
            .field("primary", &self.primary)
            .field("dependents", &self.dependents.len())
            .finish()
    }
}
