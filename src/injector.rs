//! Dependency container and handler resolution.
//!
//! Route tables do not name handlers directly. They name a [`Builder`]: a
//! descriptor the [`Injector`] turns into a handler once, at startup, with
//! access to every dependency the application provided.
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis::{Builder, Injector, Request, Response};
//!
//! struct Greeter { greeting: String }
//!
//! let mut injector = Injector::new();
//! injector.provide(Greeter { greeting: "hello".into() });
//!
//! let hello = Builder::new(|inj: &Injector| {
//!     let greeter = inj.get::<Greeter>()?;
//!     Ok(move |_req: Request| {
//!         let greeter = Arc::clone(&greeter);
//!         async move { Response::text(greeter.greeting.clone()) }
//!     })
//! });
//!
//! injector.register("hello", hello);
//! assert!(injector.resolve(&Builder::named("hello")).is_ok());
//! ```

use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};

/// Produces a handler from the injector's dependencies.
pub trait Factory: Send + Sync + 'static {
    fn build(&self, injector: &Injector) -> Result<BoxedHandler, Error>;
}

impl<F, H> Factory for F
where
    F: Fn(&Injector) -> Result<H, Error> + Send + Sync + 'static,
    H: Handler,
{
    fn build(&self, injector: &Injector) -> Result<BoxedHandler, Error> {
        self(injector).map(Handler::into_boxed_handler)
    }
}

/// Describes how to obtain a handler.
#[derive(Clone)]
pub enum Builder {
    /// Built by calling the factory against the injector.
    Factory(Arc<dyn Factory>),
    /// Looked up in the injector's registry by name.
    Named(Cow<'static, str>),
}

impl Builder {
    pub fn new<F, H>(factory: F) -> Self
    where
        F: Fn(&Injector) -> Result<H, Error> + Send + Sync + 'static,
        H: Handler,
    {
        Self::from_factory(factory)
    }

    /// Wraps a hand-written [`Factory`] implementation.
    pub fn from_factory(factory: impl Factory) -> Self {
        Self::Factory(Arc::new(factory))
    }

    /// Refers to a builder registered with [`Injector::register`].
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// A builder that needs no dependencies: every resolution returns
    /// `handler` itself.
    pub fn handler(handler: impl Handler) -> Self {
        let handler = handler.into_boxed_handler();
        Self::new(move |_: &Injector| Ok(handler.clone()))
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Builder::Factory"),
            Self::Named(name) => write!(f, "Builder::Named({name:?})"),
        }
    }
}

/// The dependency container every [`Mapper`](crate::Mapper) resolves through.
///
/// Filled in during bootstrap, then shared read-only by every mapper derived
/// from the root one.
#[derive(Default)]
pub struct Injector {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    builders: HashMap<Cow<'static, str>, Builder>,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `value` available to factories. Providing the same type twice
    /// replaces the earlier value.
    pub fn provide<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Fetches a dependency provided with [`provide`](Self::provide).
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
            .ok_or(Error::MissingDependency(type_name::<T>()))
    }

    /// Registers a builder under `name` for later [`Builder::named`] lookups.
    ///
    /// A `Named` builder may itself be registered, giving an alias.
    /// Aliases are followed at resolution time.
    pub fn register(&mut self, name: impl Into<Cow<'static, str>>, builder: Builder) -> &mut Self {
        self.builders.insert(name.into(), builder);
        self
    }

    /// Turns a descriptor into a handler.
    ///
    /// Alias chains are followed until a factory is reached. A name that
    /// comes round again is an [`Error::AliasCycle`].
    pub fn resolve(&self, builder: &Builder) -> Result<BoxedHandler, Error> {
        let mut seen: Vec<&str> = Vec::new();
        let mut current = builder;
        loop {
            match current {
                Builder::Factory(f) => return f.build(self),
                Builder::Named(name) => {
                    if seen.contains(&name.as_ref()) {
                        return Err(Error::AliasCycle(name.to_string()));
                    }
                    seen.push(name);
                    current = self
                        .builders
                        .get(name)
                        .ok_or_else(|| Error::UnresolvedBuilder(name.to_string()))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Request, Response};

    struct Counter(u32);

    fn counter_builder() -> Builder {
        Builder::new(|inj: &Injector| {
            let counter = inj.get::<Counter>()?;
            Ok(move |_req: Request| {
                let n = counter.0;
                async move { Response::text(n.to_string()) }
            })
        })
    }

    #[tokio::test]
    async fn factory_sees_provided_values() {
        let mut inj = Injector::new();
        inj.provide(Counter(7));

        let h = inj.resolve(&counter_builder()).unwrap();
        let res = h.call(Request::new(Method::Get, "/")).await;
        assert_eq!(res.body(), b"7");
    }

    #[test]
    fn missing_dependency_fails() {
        let err = Injector::new().resolve(&counter_builder()).unwrap_err();
        assert!(matches!(err, Error::MissingDependency(name) if name.ends_with("Counter")));
    }

    #[test]
    fn unknown_name_fails() {
        let err = Injector::new().resolve(&Builder::named("nope")).unwrap_err();
        assert!(matches!(err, Error::UnresolvedBuilder(name) if name == "nope"));
    }

    #[tokio::test]
    async fn named_builders_and_aliases_resolve() {
        let mut inj = Injector::new();
        inj.provide(Counter(3))
            .register("count", counter_builder())
            .register("count.alias", Builder::named("count"));

        let res = inj.resolve(&Builder::named("count.alias")).unwrap()
            .call(Request::new(Method::Get, "/"))
            .await;
        assert_eq!(res.body(), b"3");
    }

    #[test]
    fn alias_cycle_is_an_error() {
        let mut inj = Injector::new();
        inj.register("a", Builder::named("b"))
            .register("b", Builder::named("c"))
            .register("c", Builder::named("a"));

        let err = inj.resolve(&Builder::named("a")).unwrap_err();
        assert!(matches!(err, Error::AliasCycle(name) if name == "a"));
    }

    #[test]
    fn self_alias_is_an_error() {
        let mut inj = Injector::new();
        inj.register("loop", Builder::named("loop"));
        assert!(matches!(inj.resolve(&Builder::named("loop")), Err(Error::AliasCycle(_))));
    }

    #[test]
    fn provide_replaces_previous_value() {
        let mut inj = Injector::new();
        inj.provide(Counter(1)).provide(Counter(2));
        assert_eq!(inj.get::<Counter>().unwrap().0, 2);
    }

    #[test]
    fn ready_handler_resolves_to_itself() {
        let h = (|_req: Request| async { "hi" }).into_boxed_handler();
        let builder = Builder::handler(h.clone());
        let resolved = Injector::new().resolve(&builder).unwrap();
        assert!(BoxedHandler::ptr_eq(&h, &resolved));
    }
}
