//! In-memory repositories - used when no database is configured, and in tests.
//!
//! All three repositories share one [`InMemoryStore`] so that uniqueness and
//! cascade rules hold across them exactly as the relational schema enforces
//! them: unique `posts.slug`, `users.username` and `users.email`, posts and
//! comments rejected for missing authors or posts, and deletes cascading.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Comment, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, CommentRepository, Page, PageRequest, PostOrdering, PostQuery,
    PostRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn check_user_unique(&self, user: &User) -> Result<(), RepoError> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(RepoError::Constraint(format!(
                    "username '{}' already exists",
                    user.username
                )));
            }
            if other.email == user.email {
                return Err(RepoError::Constraint(format!(
                    "email '{}' already exists",
                    user.email
                )));
            }
        }
        Ok(())
    }

    fn check_post_unique(&self, post: &Post) -> Result<(), RepoError> {
        if self
            .posts
            .values()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(RepoError::Constraint(format!(
                "slug '{}' already exists",
                post.slug
            )));
        }
        Ok(())
    }

    fn check_author(&self, author_id: Uuid) -> Result<(), RepoError> {
        if !self.users.contains_key(&author_id) {
            return Err(RepoError::ForeignKey(format!("user {author_id} does not exist")));
        }
        Ok(())
    }

    fn check_comment_parents(&self, comment: &Comment) -> Result<(), RepoError> {
        if !self.posts.contains_key(&comment.post_id) {
            return Err(RepoError::ForeignKey(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        self.check_author(comment.author_id)
    }

    /// Unpublished posts are only visible to their author.
    fn post_visible_to(&self, post_id: Uuid, viewer: Option<Uuid>) -> bool {
        self.posts
            .get(&post_id)
            .is_some_and(|p| p.published || viewer == Some(p.author_id))
    }
}

/// Shared backing store for the in-memory repositories.
///
/// Every write takes the single write lock, so check-then-insert is atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// In-memory user repository.
#[derive(Clone)]
pub struct InMemoryUserRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryUserRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

/// In-memory post repository.
#[derive(Clone)]
pub struct InMemoryPostRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryPostRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

/// In-memory comment repository.
#[derive(Clone)]
pub struct InMemoryCommentRepository {
    store: Arc<InMemoryStore>,
}

impl InMemoryCommentRepository {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .collect();
    Page::new(items, total, page)
}

fn newest_first(a: &Comment, b: &Comment) -> Ordering {
    b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(RepoError::Constraint(format!("user {} already exists", user.id)));
        }
        tables.check_user_unique(&user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        }
        tables.check_user_unique(&user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        // Mirror ON DELETE CASCADE on posts.author_id and comments.author_id.
        let removed_posts: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|_, p| p.author_id != id);
        tables
            .comments
            .retain(|_, c| c.author_id != id && !removed_posts.contains(&c.post_id));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.posts.contains_key(&post.id) {
            return Err(RepoError::Constraint(format!("post {} already exists", post.id)));
        }
        tables.check_author(post.author_id)?;
        tables.check_post_unique(&post)?;
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.posts.contains_key(&post.id) {
            return Err(RepoError::NotFound);
        }
        tables.check_author(post.author_id)?;
        tables.check_post_unique(&post)?;
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.posts.remove(&id).ok_or(RepoError::NotFound)?;
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashMap<String, Uuid>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| p.slug.starts_with(prefix))
            .map(|p| (p.slug.clone(), p.id))
            .collect())
    }

    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>, RepoError> {
        let needle = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let tables = self.store.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.published)
            .filter(|p| query.author_id.is_none_or(|author| p.author_id == author))
            .filter(|p| {
                needle.as_deref().is_none_or(|n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        drop(tables);

        posts.sort_by(|a, b| {
            let primary = match query.ordering {
                PostOrdering::CreatedAsc => a.created_at.cmp(&b.created_at),
                PostOrdering::CreatedDesc => b.created_at.cmp(&a.created_at),
                PostOrdering::TitleAsc => a.title.cmp(&b.title),
                PostOrdering::TitleDesc => b.title.cmp(&a.title),
            };
            primary.then(a.id.cmp(&b.id))
        });

        Ok(paginate(posts, query.page))
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.comments.get(&id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;
        if tables.comments.contains_key(&comment.id) {
            return Err(RepoError::Constraint(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        tables.check_comment_parents(&comment)?;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;
        if !tables.comments.contains_key(&comment.id) {
            return Err(RepoError::NotFound);
        }
        tables.check_comment_parents(&comment)?;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.comments.remove(&id).ok_or(RepoError::NotFound)?;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(newest_first);
        Ok(comments)
    }

    async fn count_by_posts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn list(
        &self,
        post_id: Option<Uuid>,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| post_id.is_none_or(|id| c.post_id == id))
            .filter(|c| tables.post_visible_to(c.post_id, viewer))
            .cloned()
            .collect();
        drop(tables);

        comments.sort_by(newest_first);
        Ok(paginate(comments, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::NewPost;

    fn repos() -> (
        InMemoryUserRepository,
        InMemoryPostRepository,
        InMemoryCommentRepository,
    ) {
        let store = InMemoryStore::new();
        (
            InMemoryUserRepository::new(store.clone()),
            InMemoryPostRepository::new(store.clone()),
            InMemoryCommentRepository::new(store),
        )
    }

    async fn add_user(users: &InMemoryUserRepository, name: &str) -> Uuid {
        users
            .insert(User::new(
                name.to_string(),
                format!("{name}@example.com"),
                "h".to_string(),
            ))
            .await
            .unwrap()
            .id
    }

    fn post(author: Uuid, title: &str, slug: &str) -> Post {
        Post::new(
            author,
            NewPost {
                title: title.to_string(),
                content: "body".to_string(),
                ..NewPost::default()
            },
            slug.to_string(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_a_constraint_violation() {
        let (users, posts, _) = repos();
        let author = add_user(&users, "ada").await;

        posts.insert(post(author, "A", "hello")).await.unwrap();
        let result = posts.insert(post(author, "B", "hello")).await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_update_to_taken_slug_is_rejected() {
        let (users, posts, _) = repos();
        let author = add_user(&users, "ada").await;
        posts.insert(post(author, "A", "a")).await.unwrap();
        let mut b = posts.insert(post(author, "B", "b")).await.unwrap();

        b.slug = "a".to_string();
        assert!(matches!(posts.update(b).await, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let (users, _, _) = repos();
        users
            .insert(User::new("ada".into(), "ada@example.com".into(), "h".into()))
            .await
            .unwrap();

        let result = users
            .insert(User::new("ada".into(), "other@example.com".into(), "h".into()))
            .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_post_delete_cascades_to_comments() {
        let (users, posts, comments) = repos();
        let author = add_user(&users, "ada").await;
        let kept = posts.insert(post(author, "Kept", "kept")).await.unwrap();
        let doomed = posts.insert(post(author, "Doomed", "doomed")).await.unwrap();

        comments
            .insert(Comment::new(doomed.id, author, "bye".into()))
            .await
            .unwrap();
        comments
            .insert(Comment::new(kept.id, author, "stay".into()))
            .await
            .unwrap();

        BaseRepository::<Post, Uuid>::delete(&posts, doomed.id)
            .await
            .unwrap();

        assert!(comments.find_by_post(doomed.id).await.unwrap().is_empty());
        assert_eq!(comments.find_by_post(kept.id).await.unwrap().len(), 1);
        assert!(posts.slugs_with_prefix("doomed").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_rejected() {
        let (users, _, comments) = repos();
        let author = add_user(&users, "ada").await;
        let result = comments
            .insert(Comment::new(Uuid::new_v4(), author, "orphan".into()))
            .await;
        assert!(matches!(result, Err(RepoError::ForeignKey(_))));
    }

    #[tokio::test]
    async fn test_writes_by_missing_users_are_rejected() {
        let (users, posts, comments) = repos();
        let ghost = Uuid::new_v4();

        let result = posts.insert(post(ghost, "Ghost", "ghost")).await;
        assert!(matches!(result, Err(RepoError::ForeignKey(_))));

        let ada = add_user(&users, "ada").await;
        let real = posts.insert(post(ada, "Real", "real")).await.unwrap();
        let result = comments
            .insert(Comment::new(real.id, ghost, "boo".into()))
            .await;
        assert!(matches!(result, Err(RepoError::ForeignKey(_))));
    }

    #[tokio::test]
    async fn test_comment_listing_hides_drafts_from_others() {
        let (users, posts, comments) = repos();
        let ada = add_user(&users, "ada").await;
        let bob = add_user(&users, "bob").await;

        let mut draft = post(ada, "Draft", "draft");
        draft.published = false;
        let draft = posts.insert(draft).await.unwrap();
        let open = posts.insert(post(ada, "Open", "open")).await.unwrap();
        comments
            .insert(Comment::new(draft.id, ada, "private".into()))
            .await
            .unwrap();
        comments
            .insert(Comment::new(open.id, bob, "public".into()))
            .await
            .unwrap();

        let anonymous = comments
            .list(None, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(anonymous.total, 1);
        assert_eq!(anonymous.items[0].content, "public");

        let as_bob = comments
            .list(Some(draft.id), Some(bob), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(as_bob.total, 0);

        let as_ada = comments
            .list(None, Some(ada), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(as_ada.total, 2);
    }

    #[tokio::test]
    async fn test_slugs_with_prefix_maps_owners() {
        let (users, posts, _) = repos();
        let author = add_user(&users, "ada").await;
        let a = posts.insert(post(author, "x", "hello-world")).await.unwrap();
        let b = posts.insert(post(author, "x", "hello-world-1")).await.unwrap();
        posts.insert(post(author, "x", "goodbye")).await.unwrap();

        let slugs = posts.slugs_with_prefix("hello-world").await.unwrap();
        assert_eq!(slugs.len(), 2);
        assert_eq!(slugs["hello-world"], a.id);
        assert_eq!(slugs["hello-world-1"], b.id);
    }
}
