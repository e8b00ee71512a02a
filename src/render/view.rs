//! HTML views backed by minijinja templates.
//!
//! Templates are read and parsed once, when the handler or renderer is
//! built, and shared read-only by every request afterwards. A template that
//! fails to load stops startup; a template that fails to render answers
//! that one request with `500`.
//!
//! A layout is an ordinary template the view extends by its identifier:
//!
//! ```text
//! {# layouts/main.html #}
//! <html><body>{% block content %}{% endblock %}</body></html>
//!
//! {# users/index.html #}
//! {% extends "layouts/main.html" %}
//! {% block content %}{{ count }} users{% endblock %}
//! ```
//!
//! Naming a layout the view does not extend is a construction error, not a
//! silently ignored setting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use minijinja::Environment;
use serde::Serialize;
use tracing::error;

use crate::config::Config;
use crate::error::{Error, TemplateError};
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// Where template identifiers are looked up.
#[derive(Clone, Debug)]
pub struct Templates {
    root: PathBuf,
}

impl Templates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.templates.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self, layout: Option<&str>, view: &str) -> Result<Environment<'static>, Error> {
        let mut env = Environment::new();
        if let Some(layout) = layout {
            self.add(&mut env, layout)?;
        }
        let (path, source) = self.add(&mut env, view)?;

        if let Some(layout) = layout.map(|l| l.trim_start_matches('/')) {
            if extends_target(&source) != Some(layout) {
                let source = TemplateError::LayoutNotExtended { layout: layout.to_owned() };
                return Err(Error::Template { path, source });
            }
        }
        Ok(env)
    }

    /// Reads and parses one template; returns its path and source.
    fn add(&self, env: &mut Environment<'static>, id: &str) -> Result<(PathBuf, String), Error> {
        let name = id.trim_start_matches('/');
        let path = self.root.join(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|e| Error::Template { path: path.clone(), source: TemplateError::Read(e) })?;
        env.add_template_owned(name.to_owned(), source.clone())
            .map_err(|e| Error::Template { path: path.clone(), source: TemplateError::Syntax(e) })?;
        Ok((path, source))
    }
}

/// The template named by the first `{% extends "..." %}` tag, if any.
/// Only literal names are recognised.
fn extends_target(source: &str) -> Option<&str> {
    let mut rest = source;
    while let Some(start) = rest.find("{%") {
        let after = &rest[start + 2..];
        let end = after.find("%}")?;
        let tag = after[..end].trim_matches(|c: char| c == '-' || c == '+' || c.is_whitespace());
        if let Some(arg) = tag.strip_prefix("extends") {
            let arg = arg.trim();
            let name = arg
                .strip_prefix('"').and_then(|a| a.strip_suffix('"'))
                .or_else(|| arg.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')))?;
            return Some(name.trim_start_matches('/'));
        }
        rest = &after[end + 2..];
    }
    None
}

/// Which templates an [`HtmlRenderer`] uses. An absent layout means the
/// view is rendered on its own; a present one must be the template the view
/// `{% extends %}`.
#[derive(Clone, Debug, Default)]
pub struct HtmlConfig {
    pub layout: Option<String>,
    pub view: String,
}

/// A loaded view, rendered on demand against any serializable value.
#[derive(Clone)]
pub struct HtmlRenderer {
    env: Arc<Environment<'static>>,
    view: String,
}

impl HtmlRenderer {
    pub fn new(templates: &Templates, config: HtmlConfig) -> Result<Self, Error> {
        let env = templates.load(config.layout.as_deref(), &config.view)?;
        let view = config.view.trim_start_matches('/').to_owned();
        Ok(Self { env: Arc::new(env), view })
    }

    /// `200 OK` with the rendered view as `text/html`.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> Response {
        let rendered = self.env.get_template(&self.view)
            .and_then(|tmpl| tmpl.render(data));
        match rendered {
            Ok(html) => Response::html(html),
            Err(e) => {
                error!(view = %self.view, "error rendering view: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// A view handler: layout and view plus the function that turns each
/// request into the view's data.
pub struct ViewConfig<F> {
    /// Must match the view's `{% extends %}` tag when set.
    pub layout: Option<String>,
    pub view: String,
    pub map_request: F,
}

/// Loads the templates now and returns a handler rendering them per request.
pub fn render_view<F, V>(templates: &Templates, config: ViewConfig<F>) -> Result<impl Handler + use<F, V>, Error>
where
    F: Fn(&Request) -> V + Send + Sync + 'static,
    V: Serialize,
{
    let renderer = HtmlRenderer::new(templates, HtmlConfig { layout: config.layout, view: config.view })?;
    let map_request = config.map_request;
    Ok(move |req: Request| {
        let res = renderer.render(&map_request(&req));
        async move { res }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::Method;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("layouts")).unwrap();
        fs::write(
            dir.path().join("layouts/main.html"),
            "<main>{% block content %}{% endblock %}</main>",
        ).unwrap();
        fs::write(
            dir.path().join("hello.html"),
            r#"{% extends "layouts/main.html" %}{% block content %}hello {{ name }}{% endblock %}"#,
        ).unwrap();
        fs::write(dir.path().join("bare.html"), "bare {{ name }}").unwrap();
        fs::write(dir.path().join("broken.html"), "{% if %}").unwrap();
        fs::write(dir.path().join("strict.html"), "{{ undefined_helper() }}").unwrap();
        dir
    }

    #[tokio::test]
    async fn renders_view_inside_layout() {
        let dir = fixture();
        let handler = render_view(&Templates::new(dir.path()), ViewConfig {
            layout: Some("/layouts/main.html".into()),
            view: "/hello.html".into(),
            map_request: |req: &Request| json!({ "name": req.query().unwrap_or("nobody") }),
        })
        .unwrap()
        .into_boxed_handler();

        let res = handler.call(Request::new(Method::Get, "/hello?ada")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.body(), b"<main>hello ada</main>");
    }

    #[test]
    fn renders_without_layout() {
        let dir = fixture();
        let renderer = HtmlRenderer::new(&Templates::new(dir.path()), HtmlConfig {
            layout: None,
            view: "bare.html".into(),
        })
        .unwrap();
        assert_eq!(renderer.render(&json!({ "name": "x" })).body(), b"bare x");
    }

    #[test]
    fn missing_template_fails_at_construction() {
        let dir = fixture();
        let err = HtmlRenderer::new(&Templates::new(dir.path()), HtmlConfig {
            layout: None,
            view: "nope.html".into(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::Template { source: TemplateError::Read(_), .. }));
    }

    #[test]
    fn syntax_error_fails_at_construction() {
        let dir = fixture();
        let err = HtmlRenderer::new(&Templates::new(dir.path()), HtmlConfig {
            layout: None,
            view: "broken.html".into(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::Template { source: TemplateError::Syntax(_), .. }));
    }

    #[test]
    fn layout_the_view_does_not_extend_is_rejected() {
        let dir = fixture();
        let err = HtmlRenderer::new(&Templates::new(dir.path()), HtmlConfig {
            layout: Some("layouts/main.html".into()),
            view: "bare.html".into(),
        })
        .err()
        .unwrap();
        assert!(matches!(
            err,
            Error::Template { source: TemplateError::LayoutNotExtended { ref layout }, ref path }
                if layout == "layouts/main.html" && path.ends_with("bare.html")
        ));
    }

    #[test]
    fn finds_extends_target() {
        assert_eq!(extends_target(r#"{% extends "layouts/main.html" %}x"#), Some("layouts/main.html"));
        assert_eq!(extends_target("{# hi #}\n{%- extends '/base.html' -%}"), Some("base.html"));
        assert_eq!(extends_target("{% block a %}{% endblock %}"), None);
        assert_eq!(extends_target("{% extends layout_name %}"), None);
        assert_eq!(extends_target("no tags"), None);
    }

    #[test]
    fn render_error_is_500() {
        let dir = fixture();
        let renderer = HtmlRenderer::new(&Templates::new(dir.path()), HtmlConfig {
            layout: None,
            view: "strict.html".into(),
        })
        .unwrap();
        let res = renderer.render(&json!({}));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
    }
}
