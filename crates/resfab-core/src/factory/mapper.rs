use crate::{
    access::Operation,
    entity::{EntityBag, EntityId, PersistentEntity},
    error::ResourceError,
    selector::SelectorMap,
};

///
/// ManagedResource
///
/// Wire-representable projection carrying read-only identity and version
/// stamps. The engine stamps both after conversion on reads and consumes
/// them on update payloads.
///

pub trait ManagedResource {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: Option<String>);

    fn version(&self) -> Option<i64>;
    fn set_version(&mut self, version: Option<i64>);
}

///
/// CustomOperation
///
/// Descriptor for an entity-specific verb beyond the five CRUD
/// operations. `operation` names the permission class checked before the
/// mapper runs; `needs_selection` decides whether selectors are resolved
/// to a bag first.
///

#[derive(Clone, Copy, Debug)]
pub struct CustomOperation {
    pub name: &'static str,
    pub operation: Operation,
    pub needs_selection: bool,
}

///
/// ResourceMapper
///
/// The per-entity-kind conversion layer. This is the only place
/// entity-specific knowledge lives; a mapper supplies the subset of
/// extension points its kind needs and inherits "operation not
/// supported" for the rest.
///
/// Conversion is asymmetric by design: `to_resource` may drop write-only
/// fields (secrets), `from_resource` may default fields the wire form
/// does not carry. Identity and version never need to be copied by
/// mappers; the engine stamps and verifies them.
///

pub trait ResourceMapper {
    type Entity: PersistentEntity;
    type Resource: ManagedResource;

    /// Project an entity to its wire representation.
    fn to_resource(&self, entity: &Self::Entity) -> Result<Self::Resource, ResourceError>;

    /// Project a whole bag. Defaults to the primary entity only.
    fn to_resource_from_bag(
        &self,
        bag: &EntityBag<Self::Entity>,
    ) -> Result<Self::Resource, ResourceError> {
        self.to_resource(bag.primary())
    }

    /// Build a new entity from a payload. Kinds that support create or
    /// update must implement this.
    fn from_resource(&self, _resource: &Self::Resource) -> Result<Self::Entity, ResourceError> {
        Err(ResourceError::update_not_supported())
    }

    /// Build an entity bag from a payload. Defaults to a single-entity
    /// bag around `from_resource`.
    fn from_resource_to_bag(
        &self,
        resource: &Self::Resource,
    ) -> Result<EntityBag<Self::Entity>, ResourceError> {
        Ok(EntityBag::new(self.from_resource(resource)?))
    }

    /// Copy updatable fields from `new` onto the persisted `old` entity.
    /// Read-only data must not be copied; identity and version are
    /// checked by the engine.
    fn apply_update(
        &self,
        _old: &mut Self::Entity,
        _new: &Self::Entity,
    ) -> Result<(), ResourceError> {
        Err(ResourceError::update_not_supported())
    }

    /// Bag-level update. Defaults to delegating to `apply_update` on the
    /// primary entities.
    fn apply_update_to_bag(
        &self,
        old: &mut EntityBag<Self::Entity>,
        new: &EntityBag<Self::Entity>,
    ) -> Result<(), ResourceError> {
        self.apply_update(old.primary_mut(), new.primary())
    }

    /// Load the dependents of a resolved entity. Defaults to a
    /// single-entity bag.
    fn load_bag(&self, entity: Self::Entity) -> Result<EntityBag<Self::Entity>, ResourceError> {
        Ok(EntityBag::new(entity))
    }

    /// Hide listing headers the kind never exposes (system/internal
    /// records). Runs after access filtering.
    fn filter_headers(&self, headers: Vec<crate::entity::EntityHeader>) -> Vec<crate::entity::EntityHeader> {
        headers
    }

    /// Veto a resolved entity; returning `None` yields NotFound.
    fn filter_entity(&self, entity: Self::Entity) -> Option<Self::Entity> {
        Some(entity)
    }

    /// Names of entity-specific selectors beyond id/name/version/guid.
    fn custom_selectors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Entity lookup through custom selectors, consulted when none of
    /// the standard lookups produced a candidate. A returned entity must
    /// still satisfy every supplied selector conjunctively.
    fn select_custom(
        &self,
        _selectors: &SelectorMap,
    ) -> Result<Option<Self::Entity>, ResourceError> {
        Ok(None)
    }

    // Lifecycle hooks. Each runs inside the operation's transaction,
    // immediately around the primary persistence call. Defaults do
    // nothing.

    fn before_create(&self, _bag: &mut EntityBag<Self::Entity>) -> Result<(), ResourceError> {
        Ok(())
    }

    fn after_create(
        &self,
        _bag: &mut EntityBag<Self::Entity>,
        _id: EntityId,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    fn before_update(&self, _bag: &mut EntityBag<Self::Entity>) -> Result<(), ResourceError> {
        Ok(())
    }

    fn after_update(&self, _bag: &mut EntityBag<Self::Entity>) -> Result<(), ResourceError> {
        Ok(())
    }

    fn before_delete(&self, _bag: &EntityBag<Self::Entity>) -> Result<(), ResourceError> {
        Ok(())
    }

    fn after_delete(&self, _bag: &EntityBag<Self::Entity>) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Custom named operations this kind supports.
    fn custom_operations(&self) -> &'static [CustomOperation] {
        &[]
    }

    /// Execute a custom operation. `bag` is present when the descriptor
    /// asked for selection.
    fn invoke_custom(
        &self,
        op: &str,
        _bag: Option<EntityBag<Self::Entity>>,
        _payload: Option<&Self::Resource>,
    ) -> Result<Self::Resource, ResourceError> {
        Err(ResourceError::unsupported_operation(op))
    }
}
