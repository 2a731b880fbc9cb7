//! Wrapper type to get and store resolved services.

use crate::error::{Result, ScopeError};
use crate::internal_helpers::SharedAny;
use crate::key::ServiceKey;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

///////////////////////////////////////////////////////////////////////////////
// Shared Instance
///////////////////////////////////////////////////////////////////////////////

/// A pointer to an instance resolved from a scope.
///
/// Does not carry a lifetime, so it can be stored in the fields of other
/// services. Keeping a `Shared` alive does not keep the scope alive, but the
/// instance stays valid even after the scope is disposed.
#[repr(transparent)]
pub struct Shared<T> {
    /// The actual smart pointer to the instance.
    inner: Arc<T>,
}

impl<T> Shared<T> {
    /// Creates a shared instance from the inner smart pointer.
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// Returns the inner smart pointer of the shared instance.
    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }

    /// Returns a reference to the inner smart pointer.
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// Returns true if two shared instances point to the same instance.
    ///
    /// Only compares the pointers, not the contents of the shared instances,
    /// and is therefore always cheap.
    pub fn is(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Send + Sync + 'static> Shared<T> {
    /// Restores the concrete type of a type-erased instance.
    pub(crate) fn from_any(instance: SharedAny) -> Result<Self> {
        instance
            .downcast::<T>()
            .map(Shared::new)
            .map_err(|_| ScopeError::IncompatibleValue(ServiceKey::of::<T>().name()))
    }

    /// Erases the type of the instance.
    pub(crate) fn into_any(self) -> SharedAny {
        self.inner
    }
}

impl<T> From<Arc<T>> for Shared<T> {
    fn from(inner: Arc<T>) -> Self {
        Self::new(inner)
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<T> Clone for Shared<T> {
    /// Clones the pointer to the shared instance.
    ///
    /// Only increases the reference count, so this is very cheap.
    fn clone(&self) -> Self {
        Shared {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared").field("inner", &self.inner).finish()
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_is() {
        let s1 = Shared::new(Arc::new(100u32));
        let s2 = s1.clone();
        let s3 = Shared::new(Arc::new(100u32));

        assert!(s1.is(&s2));
        assert!(!s1.is(&s3));
    }

    #[test]
    fn from_any_restores_type() {
        let any: SharedAny = Arc::new(String::from("value"));
        let shared = Shared::<String>::from_any(any).unwrap();
        assert_eq!(&*shared, "value");
    }

    #[test]
    fn from_any_wrong_type() {
        let any: SharedAny = Arc::new(5u8);
        let result = Shared::<String>::from_any(any);
        assert!(matches!(result, Err(ScopeError::IncompatibleValue(..))));
    }

    #[test]
    fn into_any_keeps_identity() {
        let shared = Shared::new(Arc::new(1i64));
        let any = shared.clone().into_any();
        let back = Shared::<i64>::from_any(any).unwrap();
        assert!(shared.is(&back));
    }
}
