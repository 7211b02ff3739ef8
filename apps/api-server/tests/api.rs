use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::{Value, json};

use api_server::configure_app;
use api_server::observability::{REQUEST_ID_HEADER, RequestIdMiddleware};
use api_server::state::AppState;
use quill_core::ports::PageRequest;
use quill_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};
use quill_shared::dto::AuthResponse;

async fn setup_test_app(
    list_cache_ttl: Duration,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let state = AppState::in_memory(
        Arc::new(JwtTokenService::new(JwtConfig::default())),
        Arc::new(Argon2PasswordService::new()),
        list_cache_ttl,
    );

    test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .configure(configure_app(state)),
    )
    .await
}

async fn register<S>(app: &S, username: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse",
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: AuthResponse = test::read_body_json(resp).await;
    body.access_token
}

async fn create_post<S>(app: &S, token: &str, body: Value) -> ServiceResponse
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
        .to_request();
    test::call_service(app, req).await
}

#[actix_rt::test]
async fn test_register_login_and_me() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let token = register(&app, "ada").await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "ada");
    assert_eq!(me["email"], "ada@example.com");
    assert!(me.get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "ada", "password": "correct horse"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "ada", "password": "wrong password"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    register(&app, "ada").await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "ada",
            "email": "other@example.com",
            "password": "long enough",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"username": "bob", "email": "bob@example.com", "password": "short"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let problem: Value = test::read_body_json(resp).await;
    assert_eq!(problem["status"], 422);
}

#[actix_rt::test]
async fn test_me_requires_token() {
    let app = setup_test_app(Duration::from_secs(900)).await;

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn test_create_post_assigns_unique_slugs() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let token = register(&app, "ada").await;

    let anonymous = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({"title": "Hello, World!", "content": "body"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, anonymous).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let first = create_post(
        &app,
        &token,
        json!({"title": "Hello, World!", "content": "one"}),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first: Value = test::read_body_json(first).await;
    assert_eq!(first["slug"], "hello-world");
    assert_eq!(first["author"]["username"], "ada");
    assert_eq!(first["published"], true);

    let second = create_post(&app, &token, json!({"title": "Hello World", "content": "two"})).await;
    let second: Value = test::read_body_json(second).await;
    assert_eq!(second["slug"], "hello-world-1");

    let blank = create_post(&app, &token, json!({"title": "  ", "content": "three"})).await;
    assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_non_owner_cannot_modify_post() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    create_post(&app, &ada, json!({"title": "Mine", "content": "original"})).await;

    let req = test::TestRequest::patch()
        .uri("/api/posts/mine")
        .insert_header(("Authorization", format!("Bearer {bob}")))
        .set_json(json!({"content": "defaced"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/posts/mine")
        .insert_header(("Authorization", format!("Bearer {bob}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri("/api/posts/mine")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .set_json(json!({"title": "Still mine", "featured_image": "/media/cover.png"}))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["title"], "Still mine");
    assert_eq!(updated["slug"], "mine");
    assert_eq!(updated["content"], "original");
    assert_eq!(updated["featured_image"], "/media/cover.png");

    let req = test::TestRequest::delete()
        .uri("/api/posts/mine")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri("/api/posts/mine").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_comment_author_and_post_come_from_server() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    create_post(&app, &ada, json!({"title": "Open thread", "content": "body"})).await;
    let decoy = create_post(&app, &bob, json!({"title": "Decoy", "content": "body"})).await;
    let decoy: Value = test::read_body_json(decoy).await;

    let req = test::TestRequest::post()
        .uri("/api/posts/open-thread/comments")
        .insert_header(("Authorization", format!("Bearer {bob}")))
        .set_json(json!({
            "content": "First!",
            "post": decoy["id"],
            "author_id": "00000000-0000-0000-0000-000000000000",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let detail: Value = test::read_body_json(resp).await;
    assert_eq!(detail["slug"], "open-thread");
    assert_eq!(detail["comments"][0]["content"], "First!");
    assert_eq!(detail["comments"][0]["author"]["username"], "bob");

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments?post={}", decoy["id"].as_str().unwrap_or_default()))
        .to_request();
    let decoy_comments: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(decoy_comments["count"], 0);

    let comment_id = detail["comments"][0]["id"].as_str().unwrap_or_default().to_string();
    let req = test::TestRequest::patch()
        .uri(&format!("/api/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .set_json(json!({"content": "moderated"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_delete_post_cascades_to_comments() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    create_post(&app, &ada, json!({"title": "Short lived", "content": "body"})).await;

    let req = test::TestRequest::post()
        .uri("/api/posts/short-lived/comments")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .set_json(json!({"content": "soon gone"}))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    let comment_id = detail["comments"][0]["id"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::delete()
        .uri("/api/posts/short-lived")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments/{comment_id}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_unpublished_post_hidden_from_others() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    create_post(&app, &ada, json!({"title": "Draft", "content": "wip", "published": false})).await;

    let req = test::TestRequest::get()
        .uri("/api/posts/draft")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/posts/draft")
        .insert_header(("Authorization", format!("Bearer {bob}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_comments_on_drafts_hidden_from_others() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    create_post(
        &app,
        &ada,
        json!({"title": "Draft", "content": "wip", "published": false}),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/posts/draft/comments")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .set_json(json!({"content": "private note"}))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    let comment_id = detail["comments"][0]["id"].as_str().unwrap_or_default().to_string();

    let req = test::TestRequest::get().uri("/api/comments").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["count"], 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {bob}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/comments")
        .insert_header(("Authorization", format!("Bearer {ada}")))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["results"][0]["content"], "private note");
}

#[actix_rt::test]
async fn test_huge_page_number_is_an_empty_page() {
    let app = setup_test_app(Duration::from_secs(900)).await;
    let ada = register(&app, "ada").await;
    create_post(&app, &ada, json!({"title": "Only", "content": "body"})).await;

    for uri in [
        "/api/comments?page=18446744073709551615",
        "/api/posts?page=18446744073709551615",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");

        let page: Value = test::read_body_json(resp).await;
        assert_eq!(page["page"], PageRequest::MAX_PAGE);
        assert!(page["next"].is_null());
        assert_eq!(page["results"].as_array().map(Vec::len), Some(0));
    }
}

#[actix_rt::test]
async fn test_list_posts_is_paginated_and_cached() {
    let app = setup_test_app(Duration::from_secs(1)).await;
    let ada = register(&app, "ada").await;
    for title in ["Alpha", "Beta", "Gamma"] {
        create_post(&app, &ada, json!({"title": title, "content": "body"})).await;
    }

    let list = || {
        test::TestRequest::get()
            .uri("/api/posts?ordering=title&page_size=2")
            .to_request()
    };

    let resp = test::call_service(&app, list()).await;
    assert_eq!(resp.headers().get("x-cache").map(|v| v.as_bytes()), Some(&b"MISS"[..]));
    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["count"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["results"][0]["title"], "Alpha");
    assert_eq!(page["results"][1]["comment_count"], 0);
    assert!(page["next"].as_str().is_some_and(|url| url.ends_with("page=2")));
    assert!(page["previous"].is_null());

    create_post(&app, &ada, json!({"title": "Aardvark", "content": "body"})).await;

    let resp = test::call_service(&app, list()).await;
    assert_eq!(resp.headers().get("x-cache").map(|v| v.as_bytes()), Some(&b"HIT"[..]));
    let cached: Value = test::read_body_json(resp).await;
    assert_eq!(cached["count"], 3);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let fresh: Value = test::call_and_read_body_json(&app, list()).await;
    assert_eq!(fresh["count"], 4);
    assert_eq!(fresh["results"][0]["title"], "Aardvark");
}

#[actix_rt::test]
async fn test_list_rejects_unknown_ordering() {
    let app = setup_test_app(Duration::from_secs(900)).await;

    let req = test::TestRequest::get()
        .uri("/api/posts?ordering=popularity")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_malformed_json_is_problem_details() {
    let app = setup_test_app(Duration::from_secs(900)).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let problem: Value = test::read_body_json(resp).await;
    assert_eq!(problem["title"], "Bad Request");
    assert_eq!(problem["status"], 400);
}

#[actix_rt::test]
async fn test_responses_carry_request_id() {
    let app = setup_test_app(Duration::from_secs(900)).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key(REQUEST_ID_HEADER));

    let req = test::TestRequest::get()
        .uri("/api")
        .insert_header((REQUEST_ID_HEADER, "trace-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.headers().get(REQUEST_ID_HEADER).map(|v| v.as_bytes()),
        Some(&b"trace-123"[..])
    );
    let root: Value = test::read_body_json(resp).await;
    assert!(root["blog"]["posts"].as_str().is_some_and(|url| url.ends_with("/api/posts")));
}

#[actix_rt::test]
async fn test_health_reports_cache_round_trip() {
    let app = setup_test_app(Duration::from_secs(900)).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let health: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(health["status"], "ok");
    assert_eq!(health["cache"], true);
}
