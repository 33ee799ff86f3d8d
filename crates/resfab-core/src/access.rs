use crate::{
    context::{self, Principal},
    entity::{AnyEntity, EntityHeader, PersistentEntity},
    error::ResourceError,
    obs::sink::{self, ObsEvent},
};
use derive_more::Display;
use std::rc::Rc;

///
/// Operation
///
/// The access-controlled operation classes. Custom named operations
/// declare one of these for their permission check.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Operation {
    #[display("create")]
    Create,

    #[display("read")]
    Read,

    #[display("update")]
    Update,

    #[display("delete")]
    Delete,
}

///
/// AccessControl
///
/// The authorization collaborator. Implementations answer point checks
/// and bulk-filter listing candidates; they never raise errors, only
/// grant or withhold.
///

pub trait AccessControl {
    /// May `principal` perform `operation` on this concrete entity?
    fn permitted_entity(
        &self,
        principal: &Principal,
        operation: Operation,
        entity: &dyn AnyEntity,
    ) -> bool;

    /// Does `principal` hold a blanket grant for `operation` across the
    /// whole entity kind?
    fn permitted_any(&self, principal: &Principal, operation: Operation, kind: &str) -> bool;

    /// Reduce `headers` to those `principal` may see.
    fn filter_headers(
        &self,
        principal: &Principal,
        operation: Operation,
        headers: Vec<EntityHeader>,
    ) -> Vec<EntityHeader>;
}

///
/// AccessGate
///
/// Interposition point wrapping every orchestrated operation. Permission
/// checks are evaluated against the ambient acting principal so that
/// nested lifecycle hooks can perform secondary checks without
/// re-plumbing the principal.
///

#[derive(Clone)]
pub struct AccessGate {
    control: Rc<dyn AccessControl>,
}

impl AccessGate {
    #[must_use]
    pub fn new(control: Rc<dyn AccessControl>) -> Self {
        Self { control }
    }

    /// Instance-level check; aborts the pipeline with `PermissionDenied`.
    pub fn check_permitted(
        &self,
        operation: Operation,
        entity: &dyn AnyEntity,
    ) -> Result<(), ResourceError> {
        let principal = self.acting_principal()?;

        if self
            .control
            .permitted_entity(&principal, operation, entity)
        {
            Ok(())
        } else {
            sink::record(ObsEvent::PermissionDenied {
                operation,
                entity_kind: entity.kind(),
            });
            Err(ResourceError::PermissionDenied {
                operation,
                kind: entity.kind().to_owned(),
            })
        }
    }

    /// Type-level check, for operations with no concrete entity to check
    /// against (custom verbs without selection).
    pub fn check_permitted_kind(
        &self,
        operation: Operation,
        kind: &'static str,
    ) -> Result<(), ResourceError> {
        let principal = self.acting_principal()?;

        if self.control.permitted_any(&principal, operation, kind) {
            Ok(())
        } else {
            sink::record(ObsEvent::PermissionDenied {
                operation,
                entity_kind: kind,
            });
            Err(ResourceError::PermissionDenied {
                operation,
                kind: kind.to_owned(),
            })
        }
    }

    /// Two-tier listing filter: a blanket type-level grant short-circuits
    /// the per-entity round-trips; otherwise the candidates are filtered
    /// entity-by-entity by the collaborator.
    pub fn filter_list(
        &self,
        operation: Operation,
        kind: &'static str,
        headers: Vec<EntityHeader>,
    ) -> Result<Vec<EntityHeader>, ResourceError> {
        let principal = self.acting_principal()?;

        if self.control.permitted_any(&principal, operation, kind) {
            return Ok(headers);
        }

        sink::record(ObsEvent::ListFilterFallback { entity_kind: kind });
        Ok(self.control.filter_headers(&principal, operation, headers))
    }

    /// Two-tier filter over materialized entities, for paged listings.
    pub fn filter_entities<E: PersistentEntity>(
        &self,
        operation: Operation,
        entities: Vec<E>,
    ) -> Result<Vec<E>, ResourceError> {
        let principal = self.acting_principal()?;

        if self.control.permitted_any(&principal, operation, E::KIND) {
            return Ok(entities);
        }

        sink::record(ObsEvent::ListFilterFallback {
            entity_kind: E::KIND,
        });
        Ok(entities
            .into_iter()
            .filter(|e| self.control.permitted_entity(&principal, operation, e))
            .collect())
    }

    // A missing ambient principal means the adapter never installed a
    // request scope; that is a programming error, not a denial.
    fn acting_principal(&self) -> Result<Principal, ResourceError> {
        context::current_principal().ok_or_else(|| {
            ResourceError::ResourceAccess("no acting principal in request scope".to_owned())
        })
    }
}
