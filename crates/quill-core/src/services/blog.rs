//! Blog service - posts and comments on top of the repository ports.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Comment, MAX_TITLE_LEN, NewPost, Post, PostChanges, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{
    CommentRepository, Page, PageRequest, PostQuery, PostRepository, UserRepository,
};

use super::access::ensure_can_write;
use super::slug;

/// How many times a write is retried after losing a slug race.
pub const MAX_SLUG_ATTEMPTS: usize = 5;

/// A post as shown in listings.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: Post,
    pub author: Option<User>,
    pub comment_count: u64,
}

/// A post with its comments.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub author: Option<User>,
    pub comments: Vec<CommentView>,
}

/// A comment with its resolved author.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<User>,
}

/// Post and comment operations.
///
/// Cloning is cheap; repositories are shared behind `Arc`.
#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
        }
    }

    /// Create a post authored by `author_id`.
    pub async fn create_post(&self, author_id: Uuid, input: NewPost) -> Result<Post, DomainError> {
        validate_title(&input.title)?;
        validate_content(&input.content)?;

        let source = input
            .slug
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| input.title.clone());
        let post = Post::new(author_id, input, String::new());

        let saved = self.save_with_unique_slug(post, &source, true).await?;
        tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post created");
        Ok(saved)
    }

    /// Apply `changes` to the post at `slug`. Only its author may do this.
    ///
    /// The slug stays as it is unless `changes.slug` provides a new source.
    pub async fn update_post(
        &self,
        requester: Uuid,
        slug: &str,
        changes: PostChanges,
    ) -> Result<Post, DomainError> {
        let mut post = self.visible_post(Some(requester), slug).await?;
        ensure_can_write(requester, &post)?;

        if let Some(title) = &changes.title {
            validate_title(title)?;
        }
        if let Some(content) = &changes.content {
            validate_content(content)?;
        }

        let source = changes
            .slug
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| post.slug.clone());
        post.apply(changes);

        let saved = self.save_with_unique_slug(post, &source, false).await?;
        tracing::info!(post_id = %saved.id, slug = %saved.slug, "Post updated");
        Ok(saved)
    }

    /// Delete the post at `slug` together with its comments.
    pub async fn delete_post(&self, requester: Uuid, slug: &str) -> Result<(), DomainError> {
        let post = self.visible_post(Some(requester), slug).await?;
        ensure_can_write(requester, &post)?;

        match self.posts.delete(post.id).await {
            Ok(()) | Err(RepoError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(post_id = %post.id, slug = %post.slug, "Post deleted");
        Ok(())
    }

    /// Look up a post. Unpublished posts are only visible to their author.
    pub async fn get_post(&self, viewer: Option<Uuid>, slug: &str) -> Result<Post, DomainError> {
        self.visible_post(viewer, slug).await
    }

    /// A post with its author and comments.
    pub async fn post_detail(
        &self,
        viewer: Option<Uuid>,
        slug: &str,
    ) -> Result<PostDetail, DomainError> {
        let post = self.visible_post(viewer, slug).await?;
        let comments = self.comments.find_by_post(post.id).await?;

        let mut authors = self
            .authors(std::iter::once(post.author_id).chain(comments.iter().map(|c| c.author_id)))
            .await?;

        let comments = comments
            .into_iter()
            .map(|comment| CommentView {
                author: authors.get(&comment.author_id).cloned(),
                comment,
            })
            .collect();

        Ok(PostDetail {
            author: authors.remove(&post.author_id),
            post,
            comments,
        })
    }

    /// Published posts matching `query`, with authors and comment counts.
    pub async fn list_posts(&self, query: &PostQuery) -> Result<Page<PostSummary>, DomainError> {
        let page = self.posts.list_published(query).await?;

        let ids: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
        let counts = self.comments.count_by_posts(&ids).await?;
        let authors = self.authors(page.items.iter().map(|p| p.author_id)).await?;

        Ok(page.map(|post| PostSummary {
            author: authors.get(&post.author_id).cloned(),
            comment_count: counts.get(&post.id).copied().unwrap_or(0),
            post,
        }))
    }

    /// Append a comment to the post at `slug`.
    ///
    /// The author is always `requester` and the parent is always the resolved
    /// post; callers have no way to supply either.
    pub async fn add_comment(
        &self,
        requester: Uuid,
        slug: &str,
        content: String,
    ) -> Result<Comment, DomainError> {
        validate_content(&content)?;
        let post = self.visible_post(Some(requester), slug).await?;

        let comment = match self
            .comments
            .insert(Comment::new(post.id, requester, content))
            .await
        {
            Ok(comment) => comment,
            // Either the post was deleted after the lookup or the requester's
            // account is gone.
            Err(RepoError::ForeignKey(_)) => {
                return Err(match self.posts.find_by_id(post.id).await? {
                    Some(_) => DomainError::not_found("user", requester),
                    None => DomainError::not_found("post", slug),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(comment_id = %comment.id, post_id = %post.id, "Comment added");
        Ok(comment)
    }

    /// Comments, newest first, optionally for a single post.
    ///
    /// Comments on unpublished posts are only listed for the post's author.
    pub async fn list_comments(
        &self,
        viewer: Option<Uuid>,
        post_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<CommentView>, DomainError> {
        let page = self.comments.list(post_id, viewer, page).await?;
        let authors = self.authors(page.items.iter().map(|c| c.author_id)).await?;

        Ok(page.map(|comment| CommentView {
            author: authors.get(&comment.author_id).cloned(),
            comment,
        }))
    }

    pub async fn get_comment(
        &self,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<CommentView, DomainError> {
        let comment = self.visible_comment(viewer, id).await?;
        let author = self.users.find_by_id(comment.author_id).await?;

        Ok(CommentView { comment, author })
    }

    /// Replace the content of a comment. Only its author may do this.
    pub async fn update_comment(
        &self,
        requester: Uuid,
        id: Uuid,
        content: String,
    ) -> Result<Comment, DomainError> {
        validate_content(&content)?;
        let mut comment = self.visible_comment(Some(requester), id).await?;
        ensure_can_write(requester, &comment)?;

        comment.content = content;
        let saved = self.comments.update(comment).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::not_found("comment", id),
            other => other.into(),
        })?;
        Ok(saved)
    }

    async fn visible_post(&self, viewer: Option<Uuid>, slug: &str) -> Result<Post, DomainError> {
        match self.posts.find_by_slug(slug).await? {
            Some(post) if post.published || viewer == Some(post.author_id) => Ok(post),
            _ => Err(DomainError::not_found("post", slug)),
        }
    }

    /// A comment whose post `viewer` may see.
    async fn visible_comment(
        &self,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<Comment, DomainError> {
        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", id))?;

        match self.posts.find_by_id(comment.post_id).await? {
            Some(post) if post.published || viewer == Some(post.author_id) => Ok(comment),
            _ => Err(DomainError::not_found("comment", id)),
        }
    }

    /// Write `post` under a slug derived from `source`, retrying when a
    /// concurrent writer claims the candidate first.
    async fn save_with_unique_slug(
        &self,
        mut post: Post,
        source: &str,
        is_new: bool,
    ) -> Result<Post, DomainError> {
        let base = slug::normalize(source);
        let current_id = (!is_new).then_some(post.id);

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let existing = self.posts.slugs_with_prefix(slug::lookup_prefix(&base)).await?;
            post.slug = slug::assign_slug(source, &existing, current_id);

            let result = if is_new {
                self.posts.insert(post.clone()).await
            } else {
                self.posts.update(post.clone()).await
            };

            match result {
                Ok(saved) => return Ok(saved),
                Err(RepoError::Constraint(msg)) => {
                    tracing::warn!(
                        attempt,
                        slug = %post.slug,
                        error = %msg,
                        "Slug taken by a concurrent write, retrying"
                    );
                }
                // Only a unique violation is a lost race; a missing author is final.
                Err(RepoError::ForeignKey(_)) => {
                    return Err(DomainError::not_found("user", post.author_id));
                }
                Err(RepoError::NotFound) => {
                    return Err(DomainError::not_found("post", &post.slug));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DomainError::Conflict(format!(
            "Could not assign a unique slug for '{base}' after {MAX_SLUG_ATTEMPTS} attempts"
        )))
    }

    async fn authors(
        &self,
        ids: impl Iterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, User>, DomainError> {
        let mut ids: Vec<Uuid> = ids.collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.users.find_by_ids(&ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::Validation("Title must not be blank".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::Validation("Content must not be blank".to_string()));
    }
    Ok(())
}
