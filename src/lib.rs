//! Scoped object graphs for Rust.
//!
//! # Features
//!
//! * Per-request / per-unit-of-work scopes that own the services resolved
//!   through them
//! * Disposal of every service a scope created, exactly once, when the scope
//!   is disposed or dropped
//! * Scoped, transient and singleton reuse
//! * A resolver that services can keep to look up other services of their
//!   scope
//! * Singleton types: values supplied by the caller per scope instead of
//!   being constructed
//!
//! # Creating a Factory
//!
//! A [`ScopeContextFactory`] holds the registrations of an application and
//! opens scopes. Create it with [`create_factory`] or the [`FactoryBuilder`].
//!
//! ```rust
//! use scope_context::{create_factory, IService, Resolver, Result, Shared};
//!
//! struct Database;
//!
//! impl IService for Database {
//!     fn construct(_: &Resolver) -> Result<Self> {
//!         Ok(Database)
//!     }
//! }
//!
//! struct UserService {
//!     db: Shared<Database>,
//! }
//!
//! impl IService for UserService {
//!     fn construct(resolver: &Resolver) -> Result<Self> {
//!         Ok(UserService { db: resolver.get_required()? })
//!     }
//! }
//!
//! let factory = create_factory(|setup| {
//!     setup.register_services(|registry, reuse| {
//!         registry
//!             .register::<Database>(reuse)
//!             .register::<UserService>(reuse);
//!     });
//! });
//!
//! let scope = factory.create_scope().unwrap();
//! let users = scope.get_required::<UserService>().unwrap();
//! let db = scope.get_required::<Database>().unwrap();
//! assert!(users.db.is(&db));
//! ```
//!
//! # Singleton Types
//!
//! A singleton type is not constructed by the scope. The caller supplies the
//! value, and every service of that scope resolving the type receives it.
//! Other scopes don't see it.
//!
//! ```rust
//! use scope_context::{create_factory, ScopeError};
//!
//! struct CurrentUser(&'static str);
//!
//! let factory = create_factory(|setup| {
//!     setup.register_singleton_type::<CurrentUser>();
//! });
//!
//! let scope = factory.create_scope().unwrap();
//! scope.set_singleton_value(CurrentUser("alice")).unwrap();
//! assert_eq!(scope.get::<CurrentUser>().unwrap().unwrap().0, "alice");
//!
//! let other = factory.create_scope().unwrap();
//! assert!(other.get::<CurrentUser>().unwrap().is_none());
//!
//! // Only registered singleton types can be set.
//! assert!(matches!(
//!     scope.set_singleton_value(42u32),
//!     Err(ScopeError::NotSingletonType(..))
//! ));
//! ```

mod builder;
mod container;
mod error;
mod getters;
mod helper;
mod internal_helpers;
mod key;
mod registry;
mod resolver;
mod scope;
mod service_traits;
mod values;


pub use crate::builder::FactoryBuilder;
pub use crate::container::ScopeContextFactory;
pub use crate::error::{BoxError, Result, ScopeError};
pub use crate::getters::Shared;
pub use crate::helper::create_factory;
pub use crate::internal_helpers::SharedAny;
pub use crate::key::ServiceKey;
pub use crate::registry::{IfUnresolved, Reuse, ServiceRegistry};
pub use crate::resolver::Resolver;
pub use crate::scope::ScopeContext;
pub use crate::service_traits::IService;
