//! Middleware layer.
//!
//! A middleware takes a handler and returns a handler of the same shape. It
//! is the place for cross-cutting concerns: tracing, request ids,
//! authentication-header inspection.
//!
//! Order matters. [`chain`] composes a list so that the **first** middleware
//! is the **outermost** wrapper: it sees the request first and the response
//! last.
//!
//! ```rust
//! use trellis::middleware::{self, BoxedMiddleware, Next};
//! use trellis::{Request, Response};
//!
//! async fn powered_by(req: Request, next: Next) -> Response {
//!     let mut res = next.run(req).await;
//!     res.insert_header("x-powered-by", "trellis");
//!     res
//! }
//!
//! let stack: Vec<BoxedMiddleware> = vec![
//!     middleware::trace(),
//!     middleware::from_fn(powered_by),
//! ];
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

pub use trace::trace;

/// Wraps a handler, returning a new handler with the same contract.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// A shared middleware, as stored in route tables.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Composes `middlewares` around `handler`, first element outermost.
///
/// `chain(&[m1, m2, m3], h)` behaves as `m1(m2(m3(h)))`. An empty list
/// returns `handler` itself.
pub fn chain(middlewares: &[BoxedMiddleware], handler: BoxedHandler) -> BoxedHandler {
    middlewares.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}

/// The rest of the chain, as seen from inside a [`from_fn`] middleware.
pub struct Next(BoxedHandler);

impl Next {
    /// Runs the inner handler (and every middleware inside this one).
    pub async fn run(self, req: Request) -> Response {
        self.0.call(req).await
    }
}

/// Builds a middleware from an `async fn(Request, Next) -> Response`.
pub fn from_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(Request, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |next: BoxedHandler| {
        let f = f.clone();
        (move |req: Request| f(req, Next(next.clone()))).into_boxed_handler()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Method;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(name: &'static str, log: Log) -> BoxedMiddleware {
        from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name} in"));
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{name} out"));
                res
            }
        })
    }

    fn terminal(log: Log) -> BoxedHandler {
        (move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                "done"
            }
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log: Log = Arc::default();
        let mws = [recorder("a", log.clone()), recorder("b", log.clone()), recorder("c", log.clone())];

        let h = chain(&mws, terminal(log.clone()));
        h.call(Request::new(Method::Get, "/")).await;

        assert_eq!(
            *log.lock().unwrap(),
            ["a in", "b in", "c in", "handler", "c out", "b out", "a out"],
        );
    }

    #[tokio::test]
    async fn chain_matches_manual_nesting() {
        let chained_log: Log = Arc::default();
        let nested_log: Log = Arc::default();

        let mws = [recorder("a", chained_log.clone()), recorder("b", chained_log.clone())];
        chain(&mws, terminal(chained_log.clone()))
            .call(Request::new(Method::Get, "/"))
            .await;

        let a = recorder("a", nested_log.clone());
        let b = recorder("b", nested_log.clone());
        a.wrap(b.wrap(terminal(nested_log.clone())))
            .call(Request::new(Method::Get, "/"))
            .await;

        assert_eq!(*chained_log.lock().unwrap(), *nested_log.lock().unwrap());
    }

    #[test]
    fn empty_chain_is_identity() {
        let h = terminal(Arc::default());
        let composed = chain(&[], h.clone());
        assert!(BoxedHandler::ptr_eq(&h, &composed));
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let deny = from_fn(|_req: Request, _next: Next| async {
            Response::status(http::StatusCode::UNAUTHORIZED)
        });
        let log: Log = Arc::default();
        let res = chain(&[deny], terminal(log.clone()))
            .call(Request::new(Method::Get, "/"))
            .await;

        assert_eq!(res.status_code(), http::StatusCode::UNAUTHORIZED);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn plain_closure_is_a_middleware() {
        let upper: BoxedMiddleware = Arc::new(|next: BoxedHandler| {
            (move |req: Request| {
                let next = next.clone();
                async move {
                    let res = next.call(req).await;
                    String::from_utf8_lossy(res.body()).to_uppercase()
                }
            })
            .into_boxed_handler()
        });
        let res = chain(&[upper], terminal(Arc::default()))
            .call(Request::new(Method::Get, "/"))
            .await;
        assert_eq!(res.body(), b"DONE");
    }
}
