//! # trellis
//!
//! Route tables as data, middleware as ordered wrappers, responses from
//! plain values. On top of hyper and matchit.
//!
//! ## The moving parts
//!
//! - [`Mapping`] — one row of a route table: method, endpoint, [`Builder`].
//! - [`Builder`] — how to obtain the handler. Resolved once, at startup,
//!   by the [`Injector`], which holds the application's dependencies.
//! - [`middleware`] — handler wrappers. The first in a list is the
//!   outermost.
//! - [`Mapper`] — reads mappings, resolves builders, applies middleware and
//!   registers every endpoint with and without a trailing slash. Groups
//!   nest routes under a prefix.
//! - [`render`] — JSON presentation and minijinja views.
//! - [`Server`] — hyper, HTTP/1.1 and HTTP/2, graceful shutdown.
//!
//! Everything that can go wrong while building the route table is an
//! [`Error`] returned before the server accepts a single connection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trellis::render::json::{self, Json};
//! use trellis::{Builder, Injector, Mapper, Mapping, Method, Request, Response, Router, Server, middleware};
//!
//! struct Users(Vec<String>);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trellis::Error> {
//!     let mut injector = Injector::new();
//!     injector.provide(Users(vec!["alice".into()]));
//!
//!     let list_users = Builder::new(|inj: &Injector| {
//!         let users = inj.get::<Users>()?;
//!         Ok(move |_req: Request| {
//!             let users = Arc::clone(&users);
//!             async move { Json(users.0.clone()) }
//!         })
//!     });
//!
//!     let mut router = Router::new();
//!     let mut mapper = Mapper::new(&mut router, &injector);
//!     mapper.map_group("/api", |api| {
//!         api.map_all(&[
//!             Mapping::new(Method::Get, "/users", list_users),
//!             Mapping::new(Method::Post, "/users", Builder::handler(create_user)),
//!         ], &[middleware::trace()])
//!     })?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(router).await
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return json::present_error(&json::ErrorBody { error: "empty body".into() });
//!     }
//!     json::present(&serde_json::json!({ "created": true }))
//! }
//! ```

mod config;
mod error;
mod handler;
mod injector;
mod mapper;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod render;

pub use config::{Config, LogConfig, ServerConfig, TemplateConfig};
pub use error::{Error, TemplateError};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use injector::{Builder, Factory, Injector};
pub use mapper::{Mapper, Mapping, NOT_FOUND};
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{Router, RouterNode};
pub use server::Server;
