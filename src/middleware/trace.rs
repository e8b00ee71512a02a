//! Per-request tracing span.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::BoxedMiddleware;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;

/// Opens a span carrying method and path for every request and logs the
/// status and latency once the inner handler has answered.
pub fn trace() -> BoxedMiddleware {
    Arc::new(|next: BoxedHandler| {
        (move |req: Request| {
            let next = next.clone();
            let span = info_span!("request", method = %req.method(), path = %req.path());
            async move {
                let started = Instant::now();
                let res = next.call(req).await;
                info!(
                    status = res.status_code().as_u16(),
                    latency_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
                res
            }
            .instrument(span)
        })
        .into_boxed_handler()
    })
}
