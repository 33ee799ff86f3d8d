//! Shared fixtures for engine tests: a connector entity kind with the
//! full capability set, an endpoint/transport pair exercising entity
//! bags, and a recording access-control fake.

use crate::{
    access::{AccessControl, Operation},
    context::Principal,
    entity::{AnyEntity, EntityBag, EntityHeader, EntityId, PersistentEntity, ValidationIssue},
    error::ResourceError,
    factory::{CustomOperation, ManagedResource, ResourceMapper},
    selector::SelectorMap,
    store::{EntityStore, MemoryStore, StoreError},
};
use serde::{Deserialize, Serialize};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

// ============================================================================
// Connector: a single-entity kind with name/guid/zone and a write-only
// secret
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct Connector {
    id: EntityId,
    version: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
    pub secret: Option<String>,
    pub guid: Option<String>,
    pub zone: Option<String>,
    pub system: bool,
}

impl Connector {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            host: "localhost".to_owned(),
            port: 8443,
            enabled: true,
            ..Self::default()
        }
    }
}

impl PersistentEntity for Connector {
    const KIND: &'static str = "connector";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn name(&self) -> Option<&str> {
        (!self.name.is_empty()).then_some(self.name.as_str())
    }

    fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    fn security_zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.name.is_empty() {
            issues.push(ValidationIssue::missing("name", "name is required"));
        }
        if self.port == 0 {
            issues.push(ValidationIssue::invalid("port", "port must be non-zero"));
        }
        issues
    }
}

///
/// ConnectorResource
///
/// Wire form of a connector. `secret` is write-only: accepted on
/// create/update, never returned on read.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConnectorResource {
    pub id: Option<String>,
    pub version: Option<i64>,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
    pub secret: Option<String>,
}

impl ConnectorResource {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            host: "localhost".to_owned(),
            port: 8443,
            enabled: true,
            ..Self::default()
        }
    }
}

impl ManagedResource for ConnectorResource {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn version(&self) -> Option<i64> {
        self.version
    }

    fn set_version(&mut self, version: Option<i64>) {
        self.version = version;
    }
}

///
/// ConnectorMapper
///
/// Full-featured mapper: custom `host` selector, a `disable` custom
/// operation, header/entity filters hiding system records, and
/// injectable hook failures for atomicity tests.
///

pub struct ConnectorMapper {
    pub store: Rc<RefCell<MemoryStore<Connector>>>,
    pub fail_after_create: Cell<bool>,
    pub fail_after_update: Cell<bool>,
}

impl ConnectorMapper {
    pub fn new(store: Rc<RefCell<MemoryStore<Connector>>>) -> Self {
        Self {
            store,
            fail_after_create: Cell::new(false),
            fail_after_update: Cell::new(false),
        }
    }
}

impl ResourceMapper for ConnectorMapper {
    type Entity = Connector;
    type Resource = ConnectorResource;

    fn to_resource(&self, entity: &Connector) -> Result<ConnectorResource, ResourceError> {
        Ok(ConnectorResource {
            id: None,
            version: None,
            name: entity.name.clone(),
            host: entity.host.clone(),
            port: entity.port,
            enabled: entity.enabled,
            // write-only
            secret: None,
        })
    }

    fn from_resource(&self, resource: &ConnectorResource) -> Result<Connector, ResourceError> {
        Ok(Connector {
            name: resource.name.clone(),
            host: resource.host.clone(),
            port: resource.port,
            enabled: resource.enabled,
            secret: resource.secret.clone(),
            ..Connector::default()
        })
    }

    fn apply_update(&self, old: &mut Connector, new: &Connector) -> Result<(), ResourceError> {
        old.name = new.name.clone();
        old.host = new.host.clone();
        old.port = new.port;
        old.enabled = new.enabled;
        // secret only changes when freshly supplied
        if new.secret.is_some() {
            old.secret = new.secret.clone();
        }
        Ok(())
    }

    fn filter_headers(&self, headers: Vec<EntityHeader>) -> Vec<EntityHeader> {
        headers
            .into_iter()
            .filter(|h| !h.name.as_deref().is_some_and(|n| n.starts_with("sys.")))
            .collect()
    }

    fn filter_entity(&self, entity: Connector) -> Option<Connector> {
        (!entity.system).then_some(entity)
    }

    fn custom_selectors(&self) -> &'static [&'static str] {
        &["host"]
    }

    fn select_custom(
        &self,
        selectors: &SelectorMap,
    ) -> Result<Option<Connector>, ResourceError> {
        let Some(host) = selectors.get("host") else {
            return Ok(None);
        };

        let store = self.store.borrow();
        let page = store.find_page(0, None).map_err(ResourceError::from_store)?;

        Ok(page.into_iter().find(|c| c.host == host))
    }

    fn after_create(
        &self,
        _bag: &mut EntityBag<Connector>,
        _id: EntityId,
    ) -> Result<(), ResourceError> {
        if self.fail_after_create.get() {
            return Err(ResourceError::ResourceAccess(
                "injected after-create failure".to_owned(),
            ));
        }
        Ok(())
    }

    fn after_update(&self, _bag: &mut EntityBag<Connector>) -> Result<(), ResourceError> {
        if self.fail_after_update.get() {
            return Err(ResourceError::ResourceAccess(
                "injected after-update failure".to_owned(),
            ));
        }
        Ok(())
    }

    fn custom_operations(&self) -> &'static [CustomOperation] {
        &[CustomOperation {
            name: "disable",
            operation: Operation::Update,
            needs_selection: true,
        }]
    }

    fn invoke_custom(
        &self,
        op: &str,
        bag: Option<EntityBag<Connector>>,
        _payload: Option<&ConnectorResource>,
    ) -> Result<ConnectorResource, ResourceError> {
        match (op, bag) {
            ("disable", Some(mut bag)) => {
                bag.primary_mut().enabled = false;
                self.store
                    .borrow_mut()
                    .update(bag.primary_mut())
                    .map_err(ResourceError::from_store)?;
                self.to_resource(bag.primary())
            }
            _ => Err(ResourceError::unsupported_operation(op)),
        }
    }
}

// ============================================================================
// Endpoint + Transport: a bagged kind with a dependent in a sibling store
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct Endpoint {
    id: EntityId,
    version: i64,
    pub name: String,
    pub transport_id: EntityId,
}

impl PersistentEntity for Endpoint {
    const KIND: &'static str = "endpoint";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn name(&self) -> Option<&str> {
        (!self.name.is_empty()).then_some(self.name.as_str())
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        if self.name.is_empty() {
            vec![ValidationIssue::missing("name", "name is required")]
        } else {
            Vec::new()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Transport {
    id: EntityId,
    version: i64,
    pub protocol: String,
}

impl PersistentEntity for Transport {
    const KIND: &'static str = "transport";

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EndpointResource {
    pub id: Option<String>,
    pub version: Option<i64>,
    pub name: String,
    pub protocol: String,
}

impl ManagedResource for EndpointResource {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn version(&self) -> Option<i64> {
        self.version
    }

    fn set_version(&mut self, version: Option<i64>) {
        self.version = version;
    }
}

///
/// EndpointMapper
///
/// Bag-producing mapper: the endpoint owns one transport persisted in a
/// sibling store, created/updated/deleted through lifecycle hooks inside
/// the endpoint operation's transaction.
///

pub struct EndpointMapper {
    pub transports: Rc<RefCell<MemoryStore<Transport>>>,
}

impl EndpointMapper {
    fn transport_of(bag: &EntityBag<Endpoint>) -> Option<&Transport> {
        bag.dependents()
            .first()
            .and_then(|d| d.as_any().downcast_ref::<Transport>())
    }
}

impl ResourceMapper for EndpointMapper {
    type Entity = Endpoint;
    type Resource = EndpointResource;

    fn to_resource_from_bag(
        &self,
        bag: &EntityBag<Endpoint>,
    ) -> Result<EndpointResource, ResourceError> {
        let protocol = Self::transport_of(bag)
            .map(|t| t.protocol.clone())
            .unwrap_or_default();

        Ok(EndpointResource {
            id: None,
            version: None,
            name: bag.primary().name.clone(),
            protocol,
        })
    }

    fn to_resource(&self, entity: &Endpoint) -> Result<EndpointResource, ResourceError> {
        self.to_resource_from_bag(&EntityBag::new(entity.clone()))
    }

    fn from_resource_to_bag(
        &self,
        resource: &EndpointResource,
    ) -> Result<EntityBag<Endpoint>, ResourceError> {
        let endpoint = Endpoint {
            name: resource.name.clone(),
            ..Endpoint::default()
        };
        let transport = Transport {
            protocol: resource.protocol.clone(),
            ..Transport::default()
        };

        Ok(EntityBag::with_dependents(
            endpoint,
            vec![Box::new(transport)],
        ))
    }

    fn apply_update_to_bag(
        &self,
        old: &mut EntityBag<Endpoint>,
        new: &EntityBag<Endpoint>,
    ) -> Result<(), ResourceError> {
        old.primary_mut().name = new.primary().name.clone();

        let protocol = Self::transport_of(new)
            .map(|t| t.protocol.clone())
            .unwrap_or_default();
        if let Some(dep) = old.dependents_mut().first_mut()
            && let Some(transport) = dep.as_any_mut().downcast_mut::<Transport>()
        {
            transport.protocol = protocol;
        }

        Ok(())
    }

    fn load_bag(&self, entity: Endpoint) -> Result<EntityBag<Endpoint>, ResourceError> {
        let transport = self
            .transports
            .borrow()
            .find_by_primary_key(entity.transport_id)
            .map_err(ResourceError::from_store)?;

        let mut bag = EntityBag::new(entity);
        if let Some(transport) = transport {
            bag.push_dependent(Box::new(transport));
        }

        Ok(bag)
    }

    fn before_create(&self, bag: &mut EntityBag<Endpoint>) -> Result<(), ResourceError> {
        // persist the dependent first; the primary references it
        let mut transport_id = EntityId::DEFAULT;
        if let Some(dep) = bag.dependents_mut().first_mut()
            && let Some(transport) = dep.as_any_mut().downcast_mut::<Transport>()
        {
            transport_id = self
                .transports
                .borrow_mut()
                .save(transport)
                .map_err(ResourceError::from_store)?;
        }
        bag.primary_mut().transport_id = transport_id;

        Ok(())
    }

    fn after_update(&self, bag: &mut EntityBag<Endpoint>) -> Result<(), ResourceError> {
        if let Some(dep) = bag.dependents_mut().first_mut()
            && let Some(transport) = dep.as_any_mut().downcast_mut::<Transport>()
        {
            self.transports
                .borrow_mut()
                .update(transport)
                .map_err(ResourceError::from_store)?;
        }
        Ok(())
    }

    fn after_delete(&self, bag: &EntityBag<Endpoint>) -> Result<(), ResourceError> {
        if let Some(transport) = Self::transport_of(bag) {
            self.transports
                .borrow_mut()
                .delete(PersistentEntity::id(transport))
                .map_err(ResourceError::from_store)?;
        }
        Ok(())
    }
}

// ============================================================================
// RoleTrackingStore: counts the secondary role-wiring calls
// ============================================================================

#[derive(Default)]
pub struct RoleTrackingStore {
    inner: MemoryStore<Connector>,
    pub role_creates: Cell<u32>,
    pub role_updates: Cell<u32>,
    pub role_deletes: Cell<u32>,
}

impl EntityStore<Connector> for RoleTrackingStore {
    fn save(&mut self, entity: &mut Connector) -> Result<EntityId, StoreError> {
        self.inner.save(entity)
    }

    fn save_with_id(&mut self, id: EntityId, entity: &mut Connector) -> Result<(), StoreError> {
        self.inner.save_with_id(id, entity)
    }

    fn update(&mut self, entity: &mut Connector) -> Result<(), StoreError> {
        self.inner.update(entity)
    }

    fn delete(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn find_by_primary_key(&self, id: EntityId) -> Result<Option<Connector>, StoreError> {
        self.inner.find_by_primary_key(id)
    }

    fn find_by_unique_name(&self, name: &str) -> Result<Option<Connector>, StoreError> {
        self.inner.find_by_unique_name(name)
    }

    fn find_all_headers(&self) -> Result<Vec<EntityHeader>, StoreError> {
        self.inner.find_all_headers()
    }

    fn find_page(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Connector>, StoreError> {
        self.inner.find_page(offset, limit)
    }

    fn create_roles(&mut self, _entity: &Connector) -> Result<(), StoreError> {
        self.role_creates.set(self.role_creates.get() + 1);
        Ok(())
    }

    fn update_roles(&mut self, _entity: &Connector) -> Result<(), StoreError> {
        self.role_updates.set(self.role_updates.get() + 1);
        Ok(())
    }

    fn delete_roles(&mut self, _entity: &Connector) -> Result<(), StoreError> {
        self.role_deletes.set(self.role_deletes.get() + 1);
        Ok(())
    }
}

// ============================================================================
// RecordingAccess: configurable access-control fake with call counters
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingAccess {
    blanket: Cell<bool>,
    denied: RefCell<Vec<(Operation, String)>>,
    pub entity_checks: Cell<u32>,
    pub filter_calls: Cell<u32>,
}

impl RecordingAccess {
    pub fn allow_all() -> Self {
        Self {
            blanket: Cell::new(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_blanket_grants(self) -> Self {
        self.blanket.set(false);
        self
    }

    /// Deny `operation` on any entity whose name equals `name`.
    #[must_use]
    pub fn deny(self, operation: Operation, name: &str) -> Self {
        self.denied.borrow_mut().push((operation, name.to_owned()));
        self
    }

    fn is_denied(&self, operation: Operation, name: Option<&str>) -> bool {
        self.denied
            .borrow()
            .iter()
            .any(|(op, n)| *op == operation && Some(n.as_str()) == name)
    }
}

impl AccessControl for RecordingAccess {
    fn permitted_entity(
        &self,
        _principal: &Principal,
        operation: Operation,
        entity: &dyn AnyEntity,
    ) -> bool {
        self.entity_checks.set(self.entity_checks.get() + 1);
        !self.is_denied(operation, entity.name())
    }

    fn permitted_any(&self, _principal: &Principal, _operation: Operation, _kind: &str) -> bool {
        self.blanket.get()
    }

    fn filter_headers(
        &self,
        _principal: &Principal,
        operation: Operation,
        headers: Vec<EntityHeader>,
    ) -> Vec<EntityHeader> {
        self.filter_calls.set(self.filter_calls.get() + 1);
        headers
            .into_iter()
            .filter(|h| !self.is_denied(operation, h.name.as_deref()))
            .collect()
    }
}
