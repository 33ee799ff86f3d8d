mod engine;
mod mapper;


pub use engine::*;
pub use mapper::*;

use crate::{error::ResourceError, selector::SelectorMap};
use std::collections::BTreeSet;

///
/// FactoryOptions
///
/// Per-factory configuration: whether mutation is allowed at all, and
/// which optional selectors the kind supports.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct FactoryOptions {
    pub read_only: bool,
    pub allow_name_selection: bool,
    pub allow_guid_selection: bool,
}

impl FactoryOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_only: false,
            allow_name_selection: false,
            allow_guid_selection: false,
        }
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub const fn with_name_selection(mut self) -> Self {
        self.allow_name_selection = true;
        self
    }

    #[must_use]
    pub const fn with_guid_selection(mut self) -> Self {
        self.allow_guid_selection = true;
        self
    }
}

///
/// Page
///
/// Offset/limit window for materialized listings.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub const ALL: Self = Self {
        offset: 0,
        limit: None,
    };

    #[must_use]
    pub const fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }
}

///
/// ResourceFactory
///
/// The operation surface a protocol adapter drives, one instance per
/// entity kind. Every operation expects an ambient request scope (see
/// `context`) carrying the acting principal.
///

pub trait ResourceFactory {
    type Resource;

    /// Stable name of the entity kind this factory manages.
    fn kind(&self) -> &'static str;

    fn is_read_only(&self) -> bool;

    /// The selector names this factory understands.
    fn selectors(&self) -> BTreeSet<String>;

    /// Create a new resource; returns the selector map addressing it
    /// (identity only).
    fn create(&self, resource: &Self::Resource) -> Result<SelectorMap, ResourceError>;

    /// Create under a caller-chosen external identifier.
    fn create_with_id(
        &self,
        id: &str,
        resource: &Self::Resource,
    ) -> Result<SelectorMap, ResourceError>;

    fn get(&self, selectors: &SelectorMap) -> Result<Self::Resource, ResourceError>;

    /// Header listing: one selector map per visible entity, without
    /// materializing full resources.
    fn list(&self) -> Result<Vec<SelectorMap>, ResourceError>;

    /// Paged listing of fully converted resources.
    fn list_resources(&self, page: Page) -> Result<Vec<Self::Resource>, ResourceError>;

    /// Update; returns the authoritative post-update resource, or `None`
    /// when the re-read was denied by READ permission.
    fn update(
        &self,
        selectors: &SelectorMap,
        resource: &Self::Resource,
    ) -> Result<Option<Self::Resource>, ResourceError>;

    /// Delete; returns the deleted entity's external identifier.
    fn delete(&self, selectors: &SelectorMap) -> Result<String, ResourceError>;

    /// Execute a custom named operation following the same
    /// selector/resource conventions.
    fn invoke(
        &self,
        op: &str,
        selectors: &SelectorMap,
        payload: Option<&Self::Resource>,
    ) -> Result<Self::Resource, ResourceError>;
}
