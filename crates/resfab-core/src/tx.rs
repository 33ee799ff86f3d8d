use crate::{
    entity::PersistentEntity,
    error::ResourceError,
    store::{MemoryStore, StoreError},
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

///
/// TransactionManager
///
/// The transaction collaborator. Every orchestrated operation runs inside
/// exactly one begin/commit (or begin/rollback) pair; hooks and dependent
/// persistence execute within the outer transaction, never their own.
///

pub trait TransactionManager {
    fn begin(&self, read_only: bool) -> Result<(), StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self);
}

/// Run one logical operation inside a single transaction.
///
/// Checked, caller-meaningful failures produced by `op` pass through
/// untouched (they still roll the transaction back); transaction-machinery
/// failures are translated to the uniform `ResourceAccess` category.
pub fn transactional<T>(
    mgr: &dyn TransactionManager,
    read_only: bool,
    op: impl FnOnce() -> Result<T, ResourceError>,
) -> Result<T, ResourceError> {
    mgr.begin(read_only).map_err(ResourceError::from_store)?;

    match op() {
        Ok(value) => {
            mgr.commit().map_err(|err| {
                mgr.rollback();
                ResourceError::from_store(err)
            })?;
            Ok(value)
        }
        Err(err) => {
            mgr.rollback();
            Err(err)
        }
    }
}

///
/// NoopTransactions
///
/// For backends that are transactional on their own (or not at all).
/// Still rejects nested transactions.
///

#[derive(Debug, Default)]
pub struct NoopTransactions {
    active: Cell<bool>,
}

impl NoopTransactions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: Cell::new(false),
        }
    }
}

impl TransactionManager for NoopTransactions {
    fn begin(&self, _read_only: bool) -> Result<(), StoreError> {
        if self.active.replace(true) {
            return Err(StoreError::Transaction("nested transaction".to_owned()));
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.active.set(false);
        Ok(())
    }

    fn rollback(&self) {
        self.active.set(false);
    }
}

///
/// MemoryTransactions
///
/// Snapshot-based transactions over a shared [`MemoryStore`]. `begin` on
/// a write transaction clones the store; `rollback` writes the clone
/// back. Read-only transactions skip the snapshot.
///

pub struct MemoryTransactions<E: PersistentEntity> {
    store: Rc<RefCell<MemoryStore<E>>>,
    snapshot: RefCell<Option<MemoryStore<E>>>,
    active: Cell<bool>,
}

impl<E: PersistentEntity> MemoryTransactions<E> {
    #[must_use]
    pub fn new(store: Rc<RefCell<MemoryStore<E>>>) -> Self {
        Self {
            store,
            snapshot: RefCell::new(None),
            active: Cell::new(false),
        }
    }
}

impl<E: PersistentEntity> TransactionManager for MemoryTransactions<E> {
    fn begin(&self, read_only: bool) -> Result<(), StoreError> {
        if self.active.replace(true) {
            return Err(StoreError::Transaction("nested transaction".to_owned()));
        }

        if !read_only {
            *self.snapshot.borrow_mut() = Some(self.store.borrow().clone());
        }

        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.snapshot.borrow_mut().take();
        self.active.set(false);
        Ok(())
    }

    fn rollback(&self) {
        if let Some(snapshot) = self.snapshot.borrow_mut().take() {
            *self.store.borrow_mut() = snapshot;
        }
        self.active.set(false);
    }
}

///
/// CompositeTransactions
///
/// One boundary over several per-store managers, for entity bags whose
/// dependents live in sibling stores. Members begin in order and roll
/// back in reverse write order.
///

#[derive(Default)]
pub struct CompositeTransactions {
    members: Vec<Box<dyn TransactionManager>>,
}

impl CompositeTransactions {
    #[must_use]
    pub fn new(members: Vec<Box<dyn TransactionManager>>) -> Self {
        Self { members }
    }
}

impl TransactionManager for CompositeTransactions {
    fn begin(&self, read_only: bool) -> Result<(), StoreError> {
        for (n, member) in self.members.iter().enumerate() {
            if let Err(err) = member.begin(read_only) {
                for begun in self.members[..n].iter().rev() {
                    begun.rollback();
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        for member in &self.members {
            member.commit()?;
        }
        Ok(())
    }

    fn rollback(&self) {
        for member in self.members.iter().rev() {
            member.rollback();
        }
    }
}
