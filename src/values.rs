//! Storage of scope-supplied singleton values.

use crate::error::{Result, ScopeError};
use crate::internal_helpers::SharedAny;
use crate::key::ServiceKey;
use fnv::{FnvHashMap, FnvHashSet};
use std::sync::Arc;

/// The singleton types of a factory. Frozen when the factory is built.
pub(crate) type SingletonTypes = Arc<FnvHashSet<ServiceKey>>;

/// Values supplied by the caller for the singleton types of one scope.
#[derive(Debug)]
pub(crate) struct InScopeValuesHolder {
    singleton_types: SingletonTypes,
    values: FnvHashMap<ServiceKey, SharedAny>,
}

impl InScopeValuesHolder {
    pub fn new(singleton_types: SingletonTypes) -> Self {
        Self {
            singleton_types,
            values: FnvHashMap::default(),
        }
    }

    pub fn validate(&self, key: ServiceKey) -> Result<()> {
        validate_singleton_type(&self.singleton_types, key)
    }

    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: ServiceKey) -> Result<Option<SharedAny>> {
        self.validate(key)?;
        Ok(self.values.get(&key).cloned())
    }

    /// Stores `value` for `key`. `None` removes the stored value.
    pub fn set(&mut self, key: ServiceKey, value: Option<SharedAny>) -> Result<()> {
        self.validate(key)?;

        match value {
            Some(value) => {
                if (*value).type_id() != key.id() {
                    return Err(ScopeError::IncompatibleValue(key.name()));
                }
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }

        Ok(())
    }

    /// Drops all values.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Fails if `key` is not one of `singleton_types`.
pub(crate) fn validate_singleton_type(
    singleton_types: &FnvHashSet<ServiceKey>,
    key: ServiceKey,
) -> Result<()> {
    if singleton_types.contains(&key) {
        Ok(())
    } else {
        Err(ScopeError::NotSingletonType(key.name()))
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct CustomValue(i32);

    fn holder() -> InScopeValuesHolder {
        let mut types = FnvHashSet::default();
        types.insert(ServiceKey::of::<CustomValue>());
        InScopeValuesHolder::new(Arc::new(types))
    }

    #[test]
    fn get_unset_is_none() {
        let holder = holder();
        assert!(holder.get(ServiceKey::of::<CustomValue>()).unwrap().is_none());
    }

    #[test]
    fn set_then_get() {
        let mut holder = holder();
        let key = ServiceKey::of::<CustomValue>();
        holder.set(key, Some(Arc::new(CustomValue(8)))).unwrap();

        let value = holder.get(key).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<CustomValue>(), Some(&CustomValue(8)));
    }

    #[test]
    fn set_none_removes() {
        let mut holder = holder();
        let key = ServiceKey::of::<CustomValue>();
        holder.set(key, Some(Arc::new(CustomValue(1)))).unwrap();
        holder.set(key, None).unwrap();

        assert_eq!(holder.len(), 0);
    }

    #[test]
    fn unregistered_type_fails() {
        let mut holder = holder();
        let key = ServiceKey::of::<String>();

        assert!(matches!(
            holder.get(key),
            Err(ScopeError::NotSingletonType(..))
        ));
        assert!(matches!(
            holder.set(key, Some(Arc::new(String::new()))),
            Err(ScopeError::NotSingletonType(..))
        ));
    }

    #[test]
    fn incompatible_value_fails() {
        let mut holder = holder();
        let key = ServiceKey::of::<CustomValue>();
        let result = holder.set(key, Some(Arc::new(123i32)));

        assert!(matches!(result, Err(ScopeError::IncompatibleValue(..))));
        assert_eq!(holder.len(), 0);
    }
}
