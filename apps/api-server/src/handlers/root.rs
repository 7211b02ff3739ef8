//! API root - a map of the available endpoints.

use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;

/// GET /api
pub async fn index(req: HttpRequest) -> HttpResponse {
    let base = {
        let info = req.connection_info();
        format!("{}://{}/api", info.scheme(), info.host())
    };

    HttpResponse::Ok().json(json!({
        "auth": {
            "register": format!("{base}/auth/register"),
            "login": format!("{base}/auth/login"),
            "user": format!("{base}/auth/me"),
        },
        "blog": {
            "posts": format!("{base}/posts"),
            "comments": format!("{base}/comments"),
        },
        "health": format!("{base}/health"),
    }))
}
