//! # Quill Core
//!
//! The domain layer of the Quill blogging backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, the repository/auth/cache ports, slug assignment, the ownership
//! guard and the blog service that couples them.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
