//! JSON presentation.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::response::{IntoResponse, Response};

/// `200 OK` with `value` encoded as the `application/json` body.
///
/// A value that cannot be encoded (a map with non-string keys, a failing
/// `Serialize` impl) is logged and answered with a bodiless `500`.
pub fn present<T: Serialize + ?Sized>(value: &T) -> Response {
    encode(StatusCode::OK, value)
}

/// `400 Bad Request` with `err` encoded as the body.
pub fn present_error<E: Serialize + ?Sized>(err: &E) -> Response {
    encode(StatusCode::BAD_REQUEST, err)
}

/// `status` with `value` encoded as the body, for answers such as
/// `201 Created`. Encoding failures are handled as in [`present`].
pub fn present_with<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    encode(status, value)
}

fn encode<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder().status(status).json(body),
        Err(e) => {
            error!("error marshaling data: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Return a serializable value from a handler as JSON.
///
/// ```rust
/// use serde::Serialize;
/// use trellis::Request;
/// use trellis::render::json::Json;
///
/// #[derive(Serialize)]
/// struct User { id: u32, name: &'static str }
///
/// async fn get_user(_req: Request) -> Json<User> {
///     Json(User { id: 1, name: "alice" })
/// }
/// ```
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        present(&self.0)
    }
}

/// An error payload: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn from_display(err: &dyn std::fmt::Display) -> Self {
        Self { error: err.to_string() }
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        present_error(&self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn presents_value_as_json() {
        let res = present(&json!({"a": 1}));
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"a":1}"#);
    }

    #[test]
    fn presents_error_as_400() {
        let res = present_error(&ErrorBody { error: "name is required".into() });
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"error":"name is required"}"#);
    }

    #[test]
    fn unencodable_value_is_500_without_body() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");
        let res = present(&bad);
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
        assert_eq!(res.header("content-type"), None);
    }

    #[test]
    fn presents_with_chosen_status() {
        let res = present_with(StatusCode::CREATED, &json!({"id": 3}));
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"id":3}"#);
    }

    #[test]
    fn unencodable_value_overrides_chosen_status() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "x");
        let res = present_with(StatusCode::CREATED, &bad);
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body().is_empty());
    }

    #[test]
    fn error_body_from_any_display() {
        let err = "abc".parse::<u8>().unwrap_err();
        let res = ErrorBody::from_display(&err).into_response();
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(res.body()).contains("invalid digit"));
    }

    #[test]
    fn json_wrapper_is_a_response() {
        let res = Json(vec![1, 2, 3]).into_response();
        assert_eq!(res.body(), b"[1,2,3]");
    }
}
