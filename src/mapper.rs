//! Declarative route tables.
//!
//! A [`Mapping`] says *what* should answer a method and path; a [`Mapper`]
//! resolves its [`Builder`] through the [`Injector`], wraps the result in the
//! middleware chain and registers it on the [`Router`].
//!
//! ```rust
//! use trellis::{Builder, Injector, Mapper, Mapping, Method, Request, Router};
//!
//! async fn list(_req: Request) -> &'static str { "[]" }
//! async fn missing(_req: Request) -> &'static str { "nothing here" }
//!
//! # fn main() -> Result<(), trellis::Error> {
//! let injector = Injector::new();
//! let mut router = Router::new();
//! let mut mapper = Mapper::new(&mut router, &injector);
//!
//! mapper.map_group("/api", |api| {
//!     api.map_all(&[
//!         Mapping::new(Method::Get, "/users", Builder::handler(list)),
//!         Mapping::new(Method::Get, "404", Builder::handler(missing)),
//!     ], &[])
//! })?;
//! # Ok(())
//! # }
//! ```

use tracing::debug;

use crate::error::Error;
use crate::injector::{Builder, Injector};
use crate::method::Method;
use crate::middleware::{self, BoxedMiddleware};
use crate::router::{Router, RouterNode};

/// Endpoint value that installs a not-found handler instead of a route.
pub const NOT_FOUND: &str = "404";

/// One row of a route table.
#[derive(Clone, Debug)]
pub struct Mapping {
    pub method: Method,
    pub endpoint: String,
    pub builder: Builder,
}

impl Mapping {
    pub fn new(method: Method, endpoint: impl Into<String>, builder: Builder) -> Self {
        Self { method, endpoint: endpoint.into(), builder }
    }
}

/// Interprets [`Mapping`]s into registered, middleware-wrapped routes.
///
/// Every mapper owns a router node for its prefix and shares the injector
/// with the mapper it was derived from.
pub struct Mapper<'a> {
    node: RouterNode<'a>,
    injector: &'a Injector,
}

impl<'a> Mapper<'a> {
    /// A mapper at the root of `router`.
    pub fn new(router: &'a mut Router, injector: &'a Injector) -> Self {
        Self { node: router.scope(""), injector }
    }

    /// The path prefix every endpoint of this mapper is registered under.
    pub fn prefix(&self) -> &str {
        self.node.prefix()
    }

    /// Resolves, wraps and registers one mapping.
    ///
    /// The endpoint is registered both with and without a trailing slash.
    /// The endpoint `"404"` installs the handler as this scope's not-found
    /// handler, whatever the method.
    pub fn map(&mut self, mapping: &Mapping, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        let handler = self.injector.resolve(&mapping.builder)?;
        let handler = middleware::chain(middlewares, handler);

        if mapping.endpoint == NOT_FOUND {
            debug!(prefix = self.prefix(), "not-found handler mapped");
            self.node.register_not_found(handler);
            return Ok(());
        }

        for path in slash_variants(self.prefix(), &mapping.endpoint) {
            debug!(method = %mapping.method, path = %format!("{}{path}", self.prefix()), "route mapped");
            self.node.register(mapping.method, &path, handler.clone())?;
        }
        Ok(())
    }

    /// Maps every entry in order with the same middleware.
    pub fn map_all(&mut self, mappings: &[Mapping], middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        mappings.iter().try_for_each(|m| self.map(m, middlewares))
    }

    /// `GET` on the root of this mapper's scope.
    pub fn map_root(&mut self, builder: Builder) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Get, "", builder), &[])
    }

    /// Declares routes under `prefix` through a derived mapper.
    pub fn map_group<F>(&mut self, prefix: &str, group: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Mapper<'_>) -> Result<(), Error>,
    {
        let mut sub = Mapper { node: self.node.scope(prefix), injector: self.injector };
        group(&mut sub)
    }

    pub fn get(&mut self, endpoint: &str, builder: Builder, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Get, endpoint, builder), middlewares)
    }

    pub fn post(&mut self, endpoint: &str, builder: Builder, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Post, endpoint, builder), middlewares)
    }

    pub fn delete(&mut self, endpoint: &str, builder: Builder, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Delete, endpoint, builder), middlewares)
    }

    pub fn put(&mut self, endpoint: &str, builder: Builder, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Put, endpoint, builder), middlewares)
    }

    pub fn patch(&mut self, endpoint: &str, builder: Builder, middlewares: &[BoxedMiddleware]) -> Result<(), Error> {
        self.map(&Mapping::new(Method::Patch, endpoint, builder), middlewares)
    }
}

/// The endpoint paths (relative to `prefix`) a mapping is registered under.
///
/// Trailing slashes are stripped to get the base, then both the base and
/// base + `/` are returned. A catch-all must stay last, so it only gets the
/// exact form. When prefix and endpoint are both empty the only path is `/`.
fn slash_variants(prefix: &str, endpoint: &str) -> Vec<String> {
    let last_segment = endpoint.rsplit('/').next().unwrap_or_default();
    if last_segment.starts_with("{*") {
        return vec![endpoint.to_owned()];
    }

    let base = endpoint.trim_end_matches('/');
    if prefix.is_empty() && base.is_empty() {
        return vec!["/".to_owned()];
    }
    vec![base.to_owned(), format!("{base}/")]
}
