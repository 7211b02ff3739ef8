//! Comment handlers. New comments go through `POST /api/posts/{slug}/comments`.

use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use quill_core::ports::PageRequest;
use quill_shared::dto::{ListCommentsParams, UpdateCommentRequest};

use super::convert::{comment_response, paginated};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/comments
pub async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    identity: OptionalIdentity,
    params: web::Query<ListCommentsParams>,
) -> AppResult<HttpResponse> {
    let params = params.into_inner();
    let page = state
        .blog
        .list_comments(
            identity.user_id(),
            params.post,
            PageRequest::new(params.page, params.page_size),
        )
        .await?;

    Ok(HttpResponse::Ok().json(paginated(&req, page, comment_response)))
}

/// GET /api/comments/{id}
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let view = state
        .blog
        .get_comment(identity.user_id(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(comment_response(view)))
}

/// PATCH /api/comments/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCommentRequest>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    state
        .blog
        .update_comment(identity.user_id, id, body.into_inner().content)
        .await?;

    let view = state.blog.get_comment(Some(identity.user_id), id).await?;
    Ok(HttpResponse::Ok().json(comment_response(view)))
}
