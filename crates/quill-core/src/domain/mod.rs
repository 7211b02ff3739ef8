//! Domain entities - the core business objects.

mod comment;
mod post;
mod user;

pub use comment::Comment;
pub use post::{MAX_TITLE_LEN, NewPost, Post, PostChanges};
pub use user::User;
