//! Shared state handles.

use crate::error::EnvError;
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A named, typed mutable value visible to more than one participant.
///
/// Cloning a `SharedState` yields another handle to the same cell, so a
/// handle returned by a store lookup observes (and performs) updates made
/// through any other handle. The value type is fixed at construction;
/// reads and writes with a different type are rejected.
#[derive(Clone)]
pub struct SharedState {
    name: Arc<str>,
    type_name: &'static str,
    cell: Arc<RwLock<Box<dyn Any + Send + Sync>>>,
}

impl SharedState {
    /// Creates a new state entry.
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: Arc::from(name.into()),
            type_name: type_name::<T>(),
            cell: Arc::new(RwLock::new(Box::new(value))),
        }
    }

    /// The entry's name (its key in the store).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the held value.
    pub fn value_type(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the held value is a `T`.
    pub fn holds<T: Any>(&self) -> bool {
        self.cell.read().is::<T>()
    }

    /// Returns a copy of the value, or `None` if it is not a `T`.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.cell.read().downcast_ref::<T>().cloned()
    }

    /// Replaces the value.
    pub fn set<T: Any + Send + Sync>(&self, value: T) -> Result<(), EnvError> {
        let mut cell = self.cell.write();
        if !cell.is::<T>() {
            return Err(self.type_mismatch::<T>());
        }
        *cell = Box::new(value);
        Ok(())
    }

    /// Read-modify-write under the entry's write lock.
    pub fn update<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, EnvError>
    where
        T: Any + Send + Sync,
    {
        let mut cell = self.cell.write();
        match cell.downcast_mut::<T>() {
            Some(value) => Ok(f(value)),
            None => Err(self.type_mismatch::<T>()),
        }
    }

    /// True if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &SharedState) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn type_mismatch<T>(&self) -> EnvError {
        EnvError::invalid_request(format!(
            "state '{}' holds {}, not {}",
            self.name,
            self.type_name,
            type_name::<T>()
        ))
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}
