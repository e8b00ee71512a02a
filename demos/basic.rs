//! A small user directory: a JSON API, an HTML index and an HTML 404 page.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/api/users/
//!   curl http://localhost:3000/api/users/1
//!   curl -X POST http://localhost:3000/api/users -d 'carol'
//!   curl -X DELETE http://localhost:3000/api/users/1
//!   curl http://localhost:3000/nowhere

use std::sync::RwLock;

use http::StatusCode;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use trellis::middleware::{self, BoxedMiddleware, Next};
use trellis::render::json::{self, ErrorBody, Json};
use trellis::render::view::{self, Templates, ViewConfig};
use trellis::{Builder, Config, Injector, Mapper, Mapping, Method, Request, Response, Router, Server};

#[derive(Clone, Serialize)]
struct User {
    id: u32,
    name: String,
}

#[derive(Default)]
struct Directory {
    users: RwLock<Vec<User>>,
}

impl Directory {
    fn all(&self) -> Vec<User> {
        self.users.read().map(|u| u.clone()).unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> Result<(), trellis::Error> {
    let path = std::env::var("TRELLIS_CONFIG").unwrap_or_else(|_| "demos/trellis.toml".into());
    let config = Config::load(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    let directory = Directory::default();
    if let Ok(mut users) = directory.users.write() {
        users.push(User { id: 1, name: "alice".into() });
        users.push(User { id: 2, name: "bob".into() });
    }

    let templates = Templates::from_config(&config);
    let mut injector = Injector::new();
    injector
        .provide(directory)
        .provide(templates)
        .register("users.list", Builder::new(list_users))
        .register("users.get", Builder::new(get_user))
        .register("users.create", Builder::new(create_user))
        .register("users.delete", Builder::new(delete_user));

    let mut router = Router::new();
    let mut mapper = Mapper::new(&mut router, &injector);
    let stack: Vec<BoxedMiddleware> = vec![middleware::trace(), middleware::from_fn(powered_by)];

    mapper.map_root(Builder::new(index_page))?;
    mapper.map(&Mapping::new(Method::Get, "404", Builder::new(not_found_page)), &stack)?;
    mapper.map_group("/api", |api| {
        api.map_all(&[
            Mapping::new(Method::Get,    "/users",      Builder::named("users.list")),
            Mapping::new(Method::Post,   "/users",      Builder::named("users.create")),
            Mapping::new(Method::Get,    "/users/{id}", Builder::named("users.get")),
            Mapping::new(Method::Delete, "/users/{id}", Builder::named("users.delete")),
        ], &stack)?;
        api.map(&Mapping::new(Method::Get, "404", Builder::handler(api_not_found)), &stack)
    })?;

    Server::from_config(&config)?.serve(router).await
}

async fn powered_by(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    res.insert_header("x-powered-by", "trellis");
    res
}

fn parse_id(req: &Request) -> Option<u32> {
    req.param("id")?.parse().ok()
}

// GET /api/users
fn list_users(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let dir = inj.get::<Directory>()?;
    Ok(move |_req: Request| {
        let users = dir.all();
        async move { Json(users) }
    })
}

// GET /api/users/{id}
fn get_user(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let dir = inj.get::<Directory>()?;
    Ok(move |req: Request| {
        let found = parse_id(&req).and_then(|id| dir.all().into_iter().find(|u| u.id == id));
        async move {
            match found {
                Some(user) => json::present(&user),
                None => Response::status(StatusCode::NOT_FOUND),
            }
        }
    })
}

// POST /api/users   body: the new user's name
fn create_user(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let dir = inj.get::<Directory>()?;
    Ok(move |req: Request| {
        let res = match std::str::from_utf8(req.body()).map(str::trim) {
            Ok(name) if !name.is_empty() => match dir.users.write() {
                Ok(mut users) => {
                    let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
                    let user = User { id, name: name.to_owned() };
                    users.push(user.clone());
                    let mut res = json::present_with(StatusCode::CREATED, &user);
                    if res.status_code() == StatusCode::CREATED {
                        res.insert_header("location", &format!("/api/users/{id}"));
                    }
                    res
                }
                Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
            },
            Ok(_) => json::present_error(&ErrorBody { error: "name is required".into() }),
            Err(e) => json::present_error(&ErrorBody::from_display(&e)),
        };
        async move { res }
    })
}

// DELETE /api/users/{id} → 204 No Content
fn delete_user(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let dir = inj.get::<Directory>()?;
    Ok(move |req: Request| {
        let removed = match (parse_id(&req), dir.users.write()) {
            (Some(id), Ok(mut users)) => {
                let before = users.len();
                users.retain(|u| u.id != id);
                users.len() != before
            }
            _ => false,
        };
        async move {
            if removed { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
        }
    })
}

async fn api_not_found(req: Request) -> Response {
    json::present_error(&ErrorBody { error: format!("no endpoint at {}", req.path()) })
}

// GET /
fn index_page(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let dir = inj.get::<Directory>()?;
    view::render_view(&*inj.get::<Templates>()?, ViewConfig {
        layout: Some("layouts/main.html".into()),
        view: "index.html".into(),
        map_request: move |_req: &Request| serde_json::json!({ "users": dir.all() }),
    })
}

fn not_found_page(inj: &Injector) -> Result<impl trellis::Handler + use<>, trellis::Error> {
    let page = view::HtmlRenderer::new(&*inj.get::<Templates>()?, view::HtmlConfig {
        layout: Some("layouts/main.html".into()),
        view: "not_found.html".into(),
    })?;
    Ok(move |req: Request| {
        let mut res = page.render(&serde_json::json!({ "path": req.path() }));
        if res.status_code() == StatusCode::OK {
            res = Response::builder()
                .status(StatusCode::NOT_FOUND)
                .html(String::from_utf8_lossy(res.body()).into_owned());
        }
        async move { res }
    })
}
