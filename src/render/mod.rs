//! Response bodies built from application data.
//!
//! - [`json`] — serde values as `application/json`, errors as `400`.
//! - [`view`] — minijinja templates, optionally inside a layout, as HTML.

pub mod json;
pub mod view;
