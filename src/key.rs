//! Identity of a service type.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// The identity of a type that can be resolved or stored in a scope.
///
/// Two keys are equal if their `TypeId` is equal. The type name is only
/// carried along for diagnostics.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// Returns the key of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The `TypeId` of the type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The name of the type, as returned by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnv::FnvHashSet;

    #[test]
    fn same_type_same_key() {
        assert_eq!(ServiceKey::of::<u32>(), ServiceKey::of::<u32>());
        assert_ne!(ServiceKey::of::<u32>(), ServiceKey::of::<u64>());
    }

    #[test]
    fn hash_by_type_id() {
        let mut set = FnvHashSet::default();
        set.insert(ServiceKey::of::<String>());
        assert!(set.contains(&ServiceKey::of::<String>()));
        assert!(!set.contains(&ServiceKey::of::<str>()));
    }

    #[test]
    fn display_uses_type_name() {
        assert_eq!(ServiceKey::of::<u8>().to_string(), "u8");
        assert_eq!(format!("{:?}", ServiceKey::of::<u8>()), "ServiceKey(\"u8\")");
    }
}
