//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router only knows
//! paths and handlers; middleware, builders and the trailing-slash policy
//! are applied by the [`Mapper`](crate::Mapper) before anything lands here.

use std::collections::{HashMap, HashSet};

use http::StatusCode;
use matchit::Router as MatchitRouter;
use tracing::warn;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup, then hand it to
/// [`Server::serve`](crate::Server::serve). After that it is only read.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    registered: HashSet<(Method, String)>,
    not_found: Vec<(String, BoxedHandler)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` on `path`.
    ///
    /// Path parameters use `{name}` syntax and catch-alls `{*name}`.
    /// Registering the exact same method and path twice keeps the first
    /// handler. Patterns matchit cannot tell apart (`/{id}` next to
    /// `/{name}`) are an error.
    pub fn register(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        if !self.registered.insert((method, path.to_owned())) {
            warn!(%method, path, "route already registered, keeping the first handler");
            return Ok(());
        }
        let inserted = self.routes.entry(method).or_default().insert(path, handler);
        if let Err(source) = inserted {
            self.registered.remove(&(method, path.to_owned()));
            return Err(Error::Route { method, path: path.to_owned(), source });
        }
        Ok(())
    }

    /// Installs the handler used when nothing under `prefix` matches.
    ///
    /// The longest registered prefix containing the request path wins; the
    /// empty prefix covers every path. Installing a prefix again replaces
    /// its handler.
    pub fn register_not_found(&mut self, prefix: &str, handler: BoxedHandler) {
        match self.not_found.iter_mut().find(|(p, _)| p == prefix) {
            Some(entry) => entry.1 = handler,
            None => self.not_found.push((prefix.to_owned(), handler)),
        }
    }

    /// A view of this router that prefixes every registration with `prefix`.
    /// Trailing slashes on `prefix` are dropped, since paths start with one.
    pub fn scope(&mut self, prefix: &str) -> RouterNode<'_> {
        RouterNode { router: self, prefix: prefix.trim_end_matches('/').to_owned() }
    }

    /// Routes one request and produces one response.
    ///
    /// Unmatched requests go to the not-found handler of the innermost
    /// enclosing scope. Without one, a path known under other methods gets
    /// `405` with an `allow` header and anything else gets `404`.
    pub async fn respond(&self, mut req: Request) -> Response {
        let found = req.method.parse::<Method>().ok()
            .and_then(|m| self.lookup(m, &req.path));
        if let Some((handler, params)) = found {
            req.params = params;
            return handler.call(req).await;
        }

        if let Some(handler) = self.not_found_for(&req.path) {
            return handler.call(req).await;
        }

        let allowed = self.allowed(&req.path);
        if allowed.is_empty() {
            return Response::status(StatusCode::NOT_FOUND);
        }
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", &allowed.join(", "))
            .no_body()
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = matched.value.clone();
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn not_found_for(&self, path: &str) -> Option<&BoxedHandler> {
        self.not_found.iter()
            .filter(|(prefix, _)| within(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, handler)| handler)
    }

    fn allowed(&self, path: &str) -> Vec<&'static str> {
        Method::ALL.into_iter()
            .filter(|m| self.routes.get(m).is_some_and(|tree| tree.at(path).is_ok()))
            .map(Method::as_str)
            .collect()
    }
}

fn within(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.is_empty() || prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// A mutable view of a [`Router`] rooted at a path prefix.
///
/// Obtained from [`Router::scope`] or, nested, from [`RouterNode::scope`].
/// Prefixes concatenate: `scope("/api").scope("/v1")` registers under
/// `/api/v1`.
pub struct RouterNode<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl RouterNode<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers under `prefix + path`. See [`Router::register`].
    pub fn register(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        let full = format!("{}{path}", self.prefix);
        self.router.register(method, &full, handler)
    }

    /// Installs the not-found handler for this node's prefix.
    pub fn register_not_found(&mut self, handler: BoxedHandler) {
        self.router.register_not_found(&self.prefix, handler);
    }

    pub fn scope(&mut self, prefix: &str) -> RouterNode<'_> {
        let prefix = format!("{}{}", self.prefix, prefix.trim_end_matches('/'));
        RouterNode { router: &mut *self.router, prefix }
    }
}
