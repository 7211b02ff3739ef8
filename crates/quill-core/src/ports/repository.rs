use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Post, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Unique-constraint violations surface as
    /// [`RepoError::Constraint`], dangling references as
    /// [`RepoError::ForeignKey`].
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Returns [`RepoError::NotFound`] if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup used to resolve authors of a page of posts or comments.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Live slugs starting with `prefix`, mapped to the id of the owning post.
    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashMap<String, Uuid>, RepoError>;

    /// Published posts matching the query.
    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// All comments on a post, newest first.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Comment counts per post. Posts without comments may be absent.
    async fn count_by_posts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError>;

    /// Comments, newest first, optionally restricted to one post.
    ///
    /// Comments on unpublished posts are only included when `viewer` wrote
    /// the post.
    async fn list(
        &self,
        post_id: Option<Uuid>,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError>;
}

/// Page-number pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u64 = 10;
    pub const MAX_PAGE_SIZE: u64 = 100;
    /// Highest page whose offset still fits a signed 64-bit SQL OFFSET.
    pub const MAX_PAGE: u64 = i64::MAX as u64 / Self::MAX_PAGE_SIZE;

    /// Build a request, clamping out-of-range values.
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            page_size: page_size
                .unwrap_or(Self::DEFAULT_PAGE_SIZE)
                .clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Sort order for post listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrdering {
    CreatedAsc,
    #[default]
    CreatedDesc,
    TitleAsc,
    TitleDesc,
}

impl PostOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostOrdering::CreatedAsc => "created_at",
            PostOrdering::CreatedDesc => "-created_at",
            PostOrdering::TitleAsc => "title",
            PostOrdering::TitleDesc => "-title",
        }
    }
}

impl FromStr for PostOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(PostOrdering::CreatedAsc),
            "-created_at" => Ok(PostOrdering::CreatedDesc),
            "title" => Ok(PostOrdering::TitleAsc),
            "-title" => Ok(PostOrdering::TitleDesc),
            other => Err(format!(
                "Unknown ordering '{other}', expected one of created_at, -created_at, title, -title"
            )),
        }
    }
}

/// Filters for listing posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    /// Case-insensitive substring matched against title and content.
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub ordering: PostOrdering,
    pub page: PageRequest,
}

impl PostQuery {
    /// Stable key for caching the response of this query.
    pub fn cache_key(&self) -> String {
        format!(
            "posts:list:search={:?}:author={}:ordering={}:page={}:size={}",
            self.search.as_deref().unwrap_or(""),
            self.author_id.map(|id| id.to_string()).unwrap_or_default(),
            self.ordering.as_str(),
            self.page.page,
            self.page.page_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(Some(0), Some(1000));
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, PageRequest::MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let req = PageRequest::new(Some(u64::MAX), Some(1000));
        assert_eq!(req.page, PageRequest::MAX_PAGE);
        assert!(req.offset() <= i64::MAX as u64);

        let page: Page<u8> = Page {
            items: Vec::new(),
            total: 3,
            page: u64::MAX / 5,
            page_size: 100,
        };
        assert!(!page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_page_navigation() {
        let page = Page::new(vec![1, 2], 12, PageRequest::new(Some(1), Some(10)));
        assert!(page.has_next());
        assert!(!page.has_previous());

        let last = Page::new(vec![1, 2], 12, PageRequest::new(Some(2), Some(10)));
        assert!(!last.has_next());
        assert!(last.has_previous());
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!("-title".parse::<PostOrdering>(), Ok(PostOrdering::TitleDesc));
        assert_eq!("created_at".parse::<PostOrdering>(), Ok(PostOrdering::CreatedAsc));
        assert!("author".parse::<PostOrdering>().is_err());
    }

    #[test]
    fn test_cache_key_distinguishes_queries() {
        let a = PostQuery::default();
        let b = PostQuery {
            search: Some("rust".to_string()),
            ..PostQuery::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
