use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a post title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Post entity - represents a blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post. The slug must already have been assigned.
    pub fn new(author_id: Uuid, input: NewPost, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title: input.title,
            slug,
            content: input.content,
            featured_image: input.featured_image,
            published: input.published.unwrap_or(true),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, leaving the slug to the caller.
    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(image) = changes.featured_image {
            self.featured_image = image;
        }
        if let Some(published) = changes.published {
            self.published = published;
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a post. The author is never part of it.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    /// Explicit slug source; the title is used when absent.
    pub slug: Option<String>,
    pub featured_image: Option<String>,
    pub published: Option<bool>,
}

/// Partial update of a post.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    /// `Some(None)` clears the image.
    pub featured_image: Option<Option<String>>,
    pub published: Option<bool>,
}
