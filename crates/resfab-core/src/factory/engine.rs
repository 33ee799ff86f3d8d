use crate::{
    access::{AccessControl, AccessGate, Operation},
    context,
    entity::{EntityBag, EntityId, PersistentEntity, VERSION_NOT_PRESENT},
    error::ResourceError,
    factory::{FactoryOptions, ManagedResource, Page, ResourceFactory, ResourceMapper},
    obs::sink::{self, ObsEvent, OpKind},
    selector::{SelectorMap, selector_names},
    store::{EntityStore, StoreError},
    tx::{TransactionManager, transactional},
};
use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

///
/// EntityResourceFactory
///
/// The generic CRUD orchestrator: one instance per entity kind, composed
/// from the kind's mapper, a persistence collaborator, a transaction
/// manager and the access-control gate. Each operation is a fixed
/// pipeline of selector resolution, permission checks, conversion,
/// validation, persistence and lifecycle hooks, executed inside a single
/// transaction.
///

pub struct EntityResourceFactory<M, S, T>
where
    M: ResourceMapper,
    S: EntityStore<M::Entity>,
    T: TransactionManager,
{
    mapper: M,
    store: Rc<RefCell<S>>,
    tx: T,
    gate: AccessGate,
    options: FactoryOptions,
}

impl<M, S, T> EntityResourceFactory<M, S, T>
where
    M: ResourceMapper,
    S: EntityStore<M::Entity>,
    T: TransactionManager,
{
    pub fn new(
        mapper: M,
        store: Rc<RefCell<S>>,
        tx: T,
        access: Rc<dyn AccessControl>,
        options: FactoryOptions,
    ) -> Self {
        Self {
            mapper,
            store,
            tx,
            gate: AccessGate::new(access),
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> FactoryOptions {
        self.options
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    // ======================================================================
    // Pipeline plumbing
    // ======================================================================

    /// Run one pipeline inside a single transaction, bracketed by
    /// observability events.
    fn run_op<R>(
        &self,
        op: OpKind,
        read_only: bool,
        f: impl FnOnce() -> Result<R, ResourceError>,
    ) -> Result<R, ResourceError> {
        sink::record(ObsEvent::OpStart {
            op,
            entity_kind: M::Entity::KIND,
        });

        let result = transactional(&self.tx, read_only, f);

        sink::record(ObsEvent::OpFinish {
            op,
            entity_kind: M::Entity::KIND,
            ok: result.is_ok(),
        });

        result
    }

    fn with_store<R>(
        &self,
        f: impl FnOnce(&S) -> Result<R, StoreError>,
    ) -> Result<R, ResourceError> {
        f(&self.store.borrow()).map_err(ResourceError::from_store)
    }

    fn with_store_mut<R>(
        &self,
        f: impl FnOnce(&mut S) -> Result<R, StoreError>,
    ) -> Result<R, ResourceError> {
        f(&mut self.store.borrow_mut()).map_err(ResourceError::from_store)
    }

    fn check_writable(&self) -> Result<(), ResourceError> {
        if self.options.read_only {
            Err(ResourceError::ResourceAccess("factory is read only".to_owned()))
        } else {
            Ok(())
        }
    }

    // ======================================================================
    // Selector resolution
    // ======================================================================

    /// Resolve the selector map to exactly one visible entity.
    ///
    /// Lookup order: id, unique name, guid, then the mapper's custom
    /// lookup. Every supplied selector must match the candidate
    /// (conjunctive); the mapper's entity filter may still veto it. A
    /// malformed external id matches nothing rather than erroring, so
    /// mismatches report uniformly as NotFound.
    fn select_entity(&self, selectors: &SelectorMap) -> Result<M::Entity, ResourceError> {
        let id = selectors.id();
        let name = selectors.name();
        let guid = selectors.guid();
        let version = selectors.version();
        let has_custom = self
            .mapper
            .custom_selectors()
            .iter()
            .any(|s| selectors.contains(s));

        if id.is_none() && name.is_none() && guid.is_none() && !has_custom {
            return Err(ResourceError::InvalidSelectors);
        }

        let mut entity: Option<M::Entity> = None;

        if let Some(id_str) = id
            && let Ok(key) = id_str.parse::<EntityId>()
        {
            entity = self.with_store(|s| s.find_by_primary_key(key))?;
        }

        if entity.is_none()
            && self.options.allow_name_selection
            && let Some(name) = name
        {
            entity = self.with_store(|s| s.find_by_unique_name(name))?;
        }

        if entity.is_none()
            && self.options.allow_guid_selection
            && let Some(guid) = guid
        {
            entity = self.with_store(|s| s.find_by_guid(guid))?;
        }

        if entity.is_none() && has_custom {
            entity = self.mapper.select_custom(selectors)?;
        }

        // selectors are conjunctive: any mismatch invalidates the candidate
        let entity = entity.filter(|e| {
            id.is_none_or(|v| e.id().matches_str(v))
                && name.is_none_or(|v| e.name().is_some_and(|n| n.eq_ignore_ascii_case(v)))
                && version.is_none_or(|v| v == e.version().to_string())
                && guid.is_none_or(|v| e.guid() == Some(v))
        });

        let entity = entity.and_then(|e| self.mapper.filter_entity(e));

        match entity {
            Some(entity) => {
                context::set_entity_info(M::Entity::KIND, &entity.id().to_string());
                Ok(entity)
            }
            None => Err(ResourceError::not_found(selectors.to_string())),
        }
    }

    fn select_bag(&self, selectors: &SelectorMap) -> Result<EntityBag<M::Entity>, ResourceError> {
        self.mapper.load_bag(self.select_entity(selectors)?)
    }

    // ======================================================================
    // Optimistic concurrency & identity checks
    // ======================================================================

    /// Identity is immutable: when both sides carry a real identity they
    /// must match exactly.
    fn verify_identifier(current: EntityId, update: EntityId) -> Result<(), ResourceError> {
        if !current.is_default() && !update.is_default() && current != update {
            return Err(ResourceError::invalid_values("identifier mismatch"));
        }
        Ok(())
    }

    /// The submitted version must be present and must equal the persisted
    /// version exactly; a mismatch is a lost-update race.
    fn verify_version(current: i64, submitted: i64) -> Result<(), ResourceError> {
        if submitted == VERSION_NOT_PRESENT {
            return Err(ResourceError::missing_values("version is required"));
        }
        if submitted != current {
            sink::record(ObsEvent::StaleUpdateRejected {
                entity_kind: M::Entity::KIND,
            });
            return Err(ResourceError::StaleUpdate {
                current,
                submitted,
            });
        }
        Ok(())
    }

    fn validate_bag_members(&self, bag: &EntityBag<M::Entity>) -> Result<(), ResourceError> {
        for member in bag.iter() {
            if let Some(issue) = member.validate().into_iter().next() {
                let message = if issue.path.is_empty() {
                    issue.message
                } else {
                    format!("{}: {}", issue.path, issue.message)
                };
                return Err(ResourceError::InvalidResource {
                    kind: issue.kind,
                    message,
                });
            }
        }
        Ok(())
    }

    /// Stamp identity and version onto a converted resource.
    fn identify(resource: &mut M::Resource, entity: &M::Entity) {
        resource.set_id(Some(entity.id().to_string()));
        resource.set_version(Some(entity.version()));
    }

    // ======================================================================
    // Create pipeline
    // ======================================================================

    fn do_create(
        &self,
        forced_id: Option<EntityId>,
        resource: &M::Resource,
    ) -> Result<SelectorMap, ResourceError> {
        self.check_writable()?;

        let id = self.run_op(OpKind::Create, false, || {
            let mut bag = self.mapper.from_resource_to_bag(resource)?;

            // stamp identity/version carried by the payload so misuse is
            // caught by the checks below rather than silently ignored
            if let Some(id_str) = resource.id() {
                let id = id_str
                    .parse::<EntityId>()
                    .map_err(|_| ResourceError::invalid_values("invalid identifier"))?;
                bag.primary_mut().set_id(id);
            }
            if let Some(version) = resource.version() {
                bag.primary_mut().set_version(version);
            }

            for member in bag.iter_mut() {
                if member.version() == VERSION_NOT_PRESENT {
                    member.set_version(0);
                }

                // some entity constructors pre-seed version 1
                if !member.id().is_default()
                    || (member.version() != 0 && member.version() != 1)
                {
                    return Err(ResourceError::invalid_values("invalid identity or version"));
                }
            }

            self.gate.check_permitted(Operation::Create, bag.primary())?;

            self.mapper.before_create(&mut bag)?;
            self.validate_bag_members(&bag)?;

            let id = match forced_id {
                Some(id) => {
                    self.with_store_mut(|s| s.save_with_id(id, bag.primary_mut()))?;
                    id
                }
                None => self.with_store_mut(|s| s.save(bag.primary_mut()))?,
            };

            self.with_store_mut(|s| s.create_roles(bag.primary()))?;
            self.mapper.after_create(&mut bag, id)?;

            context::set_entity_info(M::Entity::KIND, &id.to_string());

            Ok(id)
        })?;

        Ok(SelectorMap::single_id(id))
    }
}

impl<M, S, T> ResourceFactory for EntityResourceFactory<M, S, T>
where
    M: ResourceMapper,
    S: EntityStore<M::Entity>,
    T: TransactionManager,
{
    type Resource = M::Resource;

    fn kind(&self) -> &'static str {
        M::Entity::KIND
    }

    fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    fn selectors(&self) -> BTreeSet<String> {
        selector_names(
            self.options.allow_name_selection,
            self.options.allow_guid_selection,
            self.mapper.custom_selectors(),
        )
    }

    fn create(&self, resource: &Self::Resource) -> Result<SelectorMap, ResourceError> {
        self.do_create(None, resource)
    }

    fn create_with_id(
        &self,
        id: &str,
        resource: &Self::Resource,
    ) -> Result<SelectorMap, ResourceError> {
        let id = id
            .parse::<EntityId>()
            .map_err(|_| ResourceError::invalid_values("invalid identifier"))?;

        self.do_create(Some(id), resource)
    }

    fn get(&self, selectors: &SelectorMap) -> Result<Self::Resource, ResourceError> {
        self.run_op(OpKind::Get, true, || {
            let bag = self.select_bag(selectors)?;
            self.gate.check_permitted(Operation::Read, bag.primary())?;

            let mut resource = self.mapper.to_resource_from_bag(&bag)?;
            Self::identify(&mut resource, bag.primary());

            Ok(resource)
        })
    }

    fn list(&self) -> Result<Vec<SelectorMap>, ResourceError> {
        self.run_op(OpKind::List, true, || {
            let headers = self.with_store(EntityStore::find_all_headers)?;
            let headers = self
                .gate
                .filter_list(Operation::Read, M::Entity::KIND, headers)?;
            let headers = self.mapper.filter_headers(headers);

            // headers map to minimal selector maps; no entity materialization
            Ok(headers
                .into_iter()
                .map(|h| SelectorMap::single_id(h.id))
                .collect())
        })
    }

    fn list_resources(&self, page: Page) -> Result<Vec<Self::Resource>, ResourceError> {
        self.run_op(OpKind::List, true, || {
            let entities = self.with_store(|s| s.find_page(page.offset, page.limit))?;
            let entities = self.gate.filter_entities(Operation::Read, entities)?;

            let mut resources = Vec::with_capacity(entities.len());
            for entity in entities {
                let Some(entity) = self.mapper.filter_entity(entity) else {
                    continue;
                };
                let mut resource = self.mapper.to_resource(&entity)?;
                Self::identify(&mut resource, &entity);
                resources.push(resource);
            }

            Ok(resources)
        })
    }

    fn update(
        &self,
        selectors: &SelectorMap,
        resource: &Self::Resource,
    ) -> Result<Option<Self::Resource>, ResourceError> {
        self.check_writable()?;

        let id = self.run_op(OpKind::Update, false, || {
            let mut old_bag = self.select_bag(selectors)?;
            self.gate
                .check_permitted(Operation::Update, old_bag.primary())?;

            let mut new_bag = self.mapper.from_resource_to_bag(resource)?;

            // stamp identity/version carried by the managed resource
            if let Some(id_str) = resource.id() {
                let id = id_str
                    .parse::<EntityId>()
                    .map_err(|_| ResourceError::invalid_values("invalid identifier"))?;
                new_bag.primary_mut().set_id(id);
            }
            new_bag
                .primary_mut()
                .set_version(resource.version().unwrap_or(VERSION_NOT_PRESENT));

            self.mapper.apply_update_to_bag(&mut old_bag, &new_bag)?;

            Self::verify_identifier(old_bag.primary().id(), new_bag.primary().id())?;
            Self::verify_version(old_bag.primary().version(), new_bag.primary().version())?;

            self.gate
                .check_permitted(Operation::Update, new_bag.primary())?;

            self.mapper.before_update(&mut old_bag)?;
            self.validate_bag_members(&old_bag)?;

            self.with_store_mut(|s| s.update(old_bag.primary_mut()))?;
            self.with_store_mut(|s| s.update_roles(old_bag.primary()))?;

            self.mapper.after_update(&mut old_bag)?;

            Ok(old_bag.primary().id())
        })?;

        // Re-select for the authoritative post-update state; hooks or the
        // store may have mutated fields beyond what the caller submitted.
        match self.get(&SelectorMap::single_id(id)) {
            Ok(resource) => Ok(Some(resource)),
            Err(ResourceError::PermissionDenied { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete(&self, selectors: &SelectorMap) -> Result<String, ResourceError> {
        self.check_writable()?;

        self.run_op(OpKind::Delete, false, || {
            let bag = self.select_bag(selectors)?;
            self.gate.check_permitted(Operation::Delete, bag.primary())?;

            self.mapper.before_delete(&bag)?;

            self.with_store_mut(|s| s.delete(bag.primary().id()))?;
            self.with_store_mut(|s| s.delete_roles(bag.primary()))?;

            self.mapper.after_delete(&bag)?;

            Ok(bag.primary().id().to_string())
        })
    }

    fn invoke(
        &self,
        op: &str,
        selectors: &SelectorMap,
        payload: Option<&Self::Resource>,
    ) -> Result<Self::Resource, ResourceError> {
        let Some(descriptor) = self
            .mapper
            .custom_operations()
            .iter()
            .find(|d| d.name == op)
            .copied()
        else {
            return Err(ResourceError::unsupported_operation(op));
        };

        let read_only = descriptor.operation == Operation::Read;
        if !read_only {
            self.check_writable()?;
        }

        self.run_op(OpKind::Custom, read_only, || {
            let bag = if descriptor.needs_selection {
                let bag = self.select_bag(selectors)?;
                self.gate
                    .check_permitted(descriptor.operation, bag.primary())?;
                Some(bag)
            } else {
                self.gate
                    .check_permitted_kind(descriptor.operation, M::Entity::KIND)?;
                None
            };

            self.mapper.invoke_custom(descriptor.name, bag, payload)
        })
    }
}
