mod bag;

pub use bag::*;

use crate::error::InvalidKind;
use std::{any::Any, fmt, str::FromStr};
use ulid::Ulid;

/// Sentinel for "no version supplied" on an incoming resource.
///
/// Persisted versions are small non-negative integers; the sentinel can
/// never collide with one.
pub const VERSION_NOT_PRESENT: i64 = i64::MIN;

///
/// EntityId
///
/// The primary key of a persisted entity. Assigned exactly once, by the
/// store, at creation; `DEFAULT` marks an entity that has not been
/// persisted yet. The external string form is the canonical ULID encoding
/// and is compared case-insensitively in selectors.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId(Ulid);

impl EntityId {
    pub const DEFAULT: Self = Self(Ulid::nil());

    /// Build an id from raw parts. Intended for stores minting identities
    /// and for deterministic test fixtures.
    #[must_use]
    pub const fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(Ulid::from_parts(timestamp_ms, random))
    }

    /// True while the identity has not been assigned.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.0.is_nil()
    }

    /// Case-insensitive match against an external identifier string.
    #[must_use]
    pub fn matches_str(&self, external: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(external)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntityId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

///
/// ValidationIssue
///
/// One structural or semantic problem found while validating an entity.
/// Issues are collected, not thrown; the orchestrator interprets them.
///

#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub kind: InvalidKind,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn missing(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: InvalidKind::MissingValues,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: InvalidKind::InvalidValues,
            path: path.into(),
            message: message.into(),
        }
    }
}

///
/// PersistentEntity
///
/// The contract every managed entity kind implements.
///
/// Identity is assigned once by the store and never reassigned; the
/// version strictly increases by one per successful update. `name`,
/// `guid` and `security_zone` are optional capabilities; kinds without
/// them keep the defaults.
///

pub trait PersistentEntity: Clone + fmt::Debug + 'static {
    /// Stable external name of the entity kind, used for permission
    /// checks and diagnostics.
    const KIND: &'static str;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);

    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);

    /// Unique display name, for kinds that have one.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Stable secondary unique key, for kinds that carry one.
    fn guid(&self) -> Option<&str> {
        None
    }

    /// Classification tag consulted by access-control backends.
    fn security_zone(&self) -> Option<&str> {
        None
    }

    /// Structural validation, run before any persistence call on create
    /// and update. The default accepts everything.
    fn validate(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }
}

///
/// AnyEntity
///
/// Object-safe view over a persisted entity, used where heterogeneous bag
/// members and access-control backends need identity, version and
/// validation without the concrete type.
///

pub trait AnyEntity: fmt::Debug {
    fn kind(&self) -> &'static str;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);

    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);

    fn name(&self) -> Option<&str>;
    fn security_zone(&self) -> Option<&str>;

    fn validate(&self) -> Vec<ValidationIssue>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: PersistentEntity> AnyEntity for E {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn id(&self) -> EntityId {
        PersistentEntity::id(self)
    }

    fn set_id(&mut self, id: EntityId) {
        PersistentEntity::set_id(self, id);
    }

    fn version(&self) -> i64 {
        PersistentEntity::version(self)
    }

    fn set_version(&mut self, version: i64) {
        PersistentEntity::set_version(self, version);
    }

    fn name(&self) -> Option<&str> {
        PersistentEntity::name(self)
    }

    fn security_zone(&self) -> Option<&str> {
        PersistentEntity::security_zone(self)
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        PersistentEntity::validate(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

///
/// EntityHeader
///
/// Lightweight listing projection: enough to address and access-filter an
/// entity without materializing it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityHeader {
    pub id: EntityId,
    pub kind: &'static str,
    pub name: Option<String>,
    pub security_zone: Option<String>,
}

impl EntityHeader {
    #[must_use]
    pub fn of<E: PersistentEntity>(entity: &E) -> Self {
        Self {
            id: entity.id(),
            kind: E::KIND,
            name: entity.name().map(str::to_owned),
            security_zone: entity.security_zone().map(str::to_owned),
        }
    }
}
