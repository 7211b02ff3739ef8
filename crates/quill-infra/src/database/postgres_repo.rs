//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use quill_core::domain::{Comment, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    CommentRepository, Page, PageRequest, PostOrdering, PostQuery, PostRepository,
    UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// Escape `%`, `_` and `\` so user input is matched literally by LIKE.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username = %username, "Finding user by username");

        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn slugs_with_prefix(&self, prefix: &str) -> Result<HashMap<String, Uuid>, RepoError> {
        let rows: Vec<(String, Uuid)> = PostEntity::find()
            .select_only()
            .column(post::Column::Slug)
            .column(post::Column::Id)
            .filter(post::Column::Slug.like(format!("{}%", escape_like(prefix))))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().collect())
    }

    async fn list_published(&self, query: &PostQuery) -> Result<Page<Post>, RepoError> {
        let mut condition = Condition::all().add(post::Column::Published.eq(true));

        if let Some(author_id) = query.author_id {
            condition = condition.add(post::Column::AuthorId.eq(author_id));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(post::Column::Title))).like(&pattern))
                    .add(Expr::expr(Func::lower(Expr::col(post::Column::Content))).like(&pattern)),
            );
        }

        let select = PostEntity::find().filter(condition);
        let select = match query.ordering {
            PostOrdering::CreatedAsc => select.order_by_asc(post::Column::CreatedAt),
            PostOrdering::CreatedDesc => select.order_by_desc(post::Column::CreatedAt),
            PostOrdering::TitleAsc => select.order_by_asc(post::Column::Title),
            PostOrdering::TitleDesc => select.order_by_desc(post::Column::Title),
        }
        // Tie-break so pages are stable.
        .order_by_asc(post::Column::Id);

        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;
        let rows = select
            .offset(query.page.offset())
            .limit(query.page.page_size)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            total,
            query.page,
        ))
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count_by_posts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = CommentEntity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
            .group_by(comment::Column::PostId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(post_id, count)| (post_id, count.max(0) as u64))
            .collect())
    }

    async fn list(
        &self,
        post_id: Option<Uuid>,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let mut visible = Condition::any().add(post::Column::Published.eq(true));
        if let Some(viewer) = viewer {
            visible = visible.add(post::Column::AuthorId.eq(viewer));
        }

        let mut select = CommentEntity::find().inner_join(PostEntity).filter(visible);
        if let Some(post_id) = post_id {
            select = select.filter(comment::Column::PostId.eq(post_id));
        }
        let select = select
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id);

        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;
        let rows = select
            .offset(page.offset())
            .limit(page.page_size)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), total, page))
    }
}
