//! Unified error type.

use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by trellis' fallible operations.
///
/// Every variant is a startup-time failure: a bad route table, a builder
/// that cannot be resolved, a template that does not load, or an address the
/// server cannot bind. Request-time failures are expressed as HTTP
/// [`Response`](crate::Response) values instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("invalid route `{method} {path}`: {source}")]
    Route {
        method: crate::Method,
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("no builder registered under `{0}`")]
    UnresolvedBuilder(String),

    #[error("builder alias `{0}` refers back to itself")]
    AliasCycle(String),

    #[error("missing dependency `{0}`")]
    MissingDependency(&'static str),

    #[error("template `{}`: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Why a template could not be prepared.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Syntax(#[from] minijinja::Error),

    #[error("view does not `{{% extends \"{layout}\" %}}`, so the layout would never render")]
    LayoutNotExtended { layout: String },
}
