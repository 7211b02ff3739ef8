//! Post handlers.
//!
//! Listings are cached for `list_cache_ttl`; writes do not touch the cache,
//! so a listing can lag behind by at most that long.

use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};

use quill_core::domain::{NewPost, PostChanges};
use quill_core::ports::{PageRequest, PostOrdering, PostQuery};
use quill_shared::dto::{
    AddCommentRequest, CreatePostRequest, ListPostsParams, UpdatePostRequest,
};

use super::convert::{paginated, post_detail_response, post_list_item};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const CACHE_STATUS_HEADER: &str = "x-cache";

fn post_query(params: ListPostsParams) -> AppResult<PostQuery> {
    let ordering = match params.ordering.as_deref() {
        None | Some("") => PostOrdering::default(),
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
    };

    Ok(PostQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        author_id: params.author,
        ordering,
        page: PageRequest::new(params.page, params.page_size),
    })
}

/// GET /api/posts
pub async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<ListPostsParams>,
) -> AppResult<HttpResponse> {
    let query = post_query(params.into_inner())?;
    let key = query.cache_key();

    if let Some(body) = state.cache.get(&key).await {
        tracing::debug!(key = %key, "Serving post list from cache");
        return Ok(HttpResponse::Ok()
            .content_type("application/json")
            .insert_header((CACHE_STATUS_HEADER, HeaderValue::from_static("HIT")))
            .body(body));
    }

    let page = state.blog.list_posts(&query).await?;
    let body = serde_json::to_string(&paginated(&req, page, post_list_item))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if let Err(e) = state
        .cache
        .set(&key, &body, Some(state.list_cache_ttl))
        .await
    {
        tracing::warn!(key = %key, error = %e, "Failed to cache post list");
    }

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header((CACHE_STATUS_HEADER, HeaderValue::from_static("MISS")))
        .body(body))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let post = state
        .blog
        .create_post(
            identity.user_id,
            NewPost {
                title: req.title,
                content: req.content,
                slug: req.slug,
                featured_image: req.featured_image,
                published: req.published,
            },
        )
        .await?;

    let detail = state.blog.post_detail(Some(identity.user_id), &post.slug).await?;
    let location = format!("/api/posts/{}", post.slug);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(post_detail_response(detail)))
}

/// GET /api/posts/{slug}
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let detail = state.blog.post_detail(identity.user_id(), &path).await?;
    Ok(HttpResponse::Ok().json(post_detail_response(detail)))
}

/// PATCH /api/posts/{slug}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = PostChanges {
        title: req.title,
        content: req.content,
        slug: req.slug,
        featured_image: req.featured_image,
        published: req.published,
    };

    let post = state
        .blog
        .update_post(identity.user_id, &path, changes)
        .await?;
    let detail = state.blog.post_detail(Some(identity.user_id), &post.slug).await?;

    Ok(HttpResponse::Ok().json(post_detail_response(detail)))
}

/// DELETE /api/posts/{slug}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.blog.delete_post(identity.user_id, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/posts/{slug}/comments
///
/// Responds with the whole post so clients can re-render the thread.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<AddCommentRequest>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    state
        .blog
        .add_comment(identity.user_id, &slug, body.into_inner().content)
        .await?;

    let detail = state.blog.post_detail(Some(identity.user_id), &slug).await?;
    Ok(HttpResponse::Created().json(post_detail_response(detail)))
}
