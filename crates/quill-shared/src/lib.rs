//! # Quill Shared
//!
//! Wire types for the Quill API. Kept free of server dependencies so that
//! clients can reuse them.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, PaginatedResponse};
