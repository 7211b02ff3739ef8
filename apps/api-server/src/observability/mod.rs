//! Observability module - request IDs for tracing.

mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestIdMiddleware};
