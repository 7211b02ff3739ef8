//! Domain services - the logic that sits between handlers and repositories.

pub mod access;
pub mod blog;
pub mod slug;

pub use access::{Authored, Operation, ensure_can_write, may_mutate};
pub use blog::{BlogService, CommentView, MAX_SLUG_ATTEMPTS, PostDetail, PostSummary};
pub use self::slug::assign_slug;
