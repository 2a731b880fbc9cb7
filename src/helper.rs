//! Helpers to create factories and run work inside a scope.

use crate::builder::FactoryBuilder;
use crate::container::ScopeContextFactory;
use crate::error::Result;
use crate::getters::Shared;
use crate::scope::ScopeContext;
use log::debug;
use std::thread::{self, JoinHandle};

/// Creates a scope context factory.
///
/// `setup` binds the services of the application and registers the
/// singleton types.
///
/// ```
/// use scope_context::{create_factory, Reuse};
///
/// struct Settings;
///
/// let factory = create_factory(|setup| {
///     setup.register_services(|registry, reuse| {
///         registry.register_delegate(reuse, |_| Ok(String::from("service")));
///     });
///     setup.register_singleton_type::<Settings>();
/// });
///
/// let scope = factory.create_scope().unwrap();
/// assert_eq!(&*scope.get_required::<String>().unwrap(), "service");
/// ```
pub fn create_factory<F>(setup: F) -> ScopeContextFactory
where
    F: FnOnce(&mut FactoryBuilder),
{
    let mut builder = FactoryBuilder::new();
    setup(&mut builder);
    builder.build()
}

impl ScopeContextFactory {
    /// Resolves `S` in a new scope and runs `action` with it. The scope is
    /// disposed afterwards.
    pub fn execute<S, R, F>(&self, action: F) -> Result<R>
    where
        S: Send + Sync + 'static,
        F: FnOnce(Shared<S>) -> R,
    {
        self.execute_with(|_| Ok(()), action)
    }

    /// Like [`execute`](Self::execute), but lets `prepare` set up the scope
    /// (usually its singleton values) before `S` is resolved.
    pub fn execute_with<S, R, P, F>(&self, prepare: P, action: F) -> Result<R>
    where
        S: Send + Sync + 'static,
        P: FnOnce(&ScopeContext) -> Result<()>,
        F: FnOnce(Shared<S>) -> R,
    {
        let scope = self.create_scope()?;
        prepare(&scope)?;
        let service = scope.get_required::<S>()?;
        let output = action(service);
        scope.dispose();
        Ok(output)
    }

    /// Runs [`execute_with`](Self::execute_with) on a new thread.
    pub fn spawn_execute<S, R, P, F>(&self, prepare: P, action: F) -> JoinHandle<Result<R>>
    where
        S: Send + Sync + 'static,
        R: Send + 'static,
        P: FnOnce(&ScopeContext) -> Result<()> + Send + 'static,
        F: FnOnce(Shared<S>) -> R + Send + 'static,
    {
        let factory = self.clone();
        thread::spawn(move || {
            debug!("Executing {} on {:?}", std::any::type_name::<S>(), thread::current().id());
            factory.execute_with(prepare, action)
        })
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScopeError;

    #[derive(Debug, PartialEq)]
    struct Greeting(String);

    fn factory() -> ScopeContextFactory {
        create_factory(|setup| {
            setup.register_singleton_type::<Greeting>();
            setup.register_services(|registry, reuse| {
                registry.register_delegate(reuse, |_| Ok(5u32));
            });
        })
    }

    #[test]
    fn execute_resolves_and_runs() {
        let doubled = factory().execute::<u32, _, _>(|n| *n * 2).unwrap();
        assert_eq!(doubled, 10);
    }

    #[test]
    fn execute_unresolvable_fails() {
        let result = factory().execute::<String, _, _>(|_| ());
        assert!(matches!(result, Err(ScopeError::Unresolved(..))));
    }

    #[test]
    fn execute_with_prepares_scope() {
        let greeting = factory()
            .execute_with::<Greeting, _, _, _>(
                |scope| scope.set_singleton_value(Greeting("hi".into())),
                |g| g.0.clone(),
            )
            .unwrap();
        assert_eq!(greeting, "hi");
    }

    #[test]
    fn spawn_execute_runs_on_other_thread() {
        let caller = thread::current().id();
        let handle = factory().spawn_execute::<Greeting, _, _, _>(
            |scope| scope.set_singleton_value(Greeting("321".into())),
            move |g| (g.0.clone(), thread::current().id() != caller),
        );

        let (value, other_thread) = handle.join().unwrap().unwrap();
        assert_eq!(value, "321");
        assert!(other_thread);
    }
}
