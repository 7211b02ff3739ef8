//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod convert;
mod health;
mod posts;
mod root;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::get().to(root::index))
            .route("/", web::get().to(root::index))
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    .route("/{slug}", web::get().to(posts::detail))
                    .route("/{slug}", web::patch().to(posts::update))
                    .route("/{slug}", web::delete().to(posts::delete))
                    .route("/{slug}/comments", web::post().to(posts::add_comment)),
            )
            .service(
                web::scope("/comments")
                    .route("", web::get().to(comments::list))
                    .route("/{id}", web::get().to(comments::detail))
                    .route("/{id}", web::patch().to(comments::update)),
            ),
    );
}
