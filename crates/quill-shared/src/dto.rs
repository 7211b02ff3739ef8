//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Response containing an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Request to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    /// Preferred slug; the server normalizes it and makes it unique.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
}

/// Partial update of a post. Absent fields are left unchanged.
///
/// `featured_image` distinguishes an absent field from an explicit `null`,
/// which clears the image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub featured_image: Option<Option<String>>,
    #[serde(default)]
    pub published: Option<bool>,
}

/// Body of a new comment. The post comes from the URL and the author from
/// the bearer token; anything else in the body is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// Query string of `GET /api/posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPostsParams {
    pub search: Option<String>,
    pub author: Option<Uuid>,
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Query string of `GET /api/comments`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCommentsParams {
    pub post: Option<Uuid>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// A post as it appears in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author: Option<UserResponse>,
    pub featured_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub comment_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: Option<UserResponse>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A single post with its comments, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author: Option<UserResponse>,
    pub featured_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published: bool,
    pub comments: Vec<CommentResponse>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_post_distinguishes_null_from_absent() {
        let absent: UpdatePostRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(absent.featured_image, None);
        assert_eq!(absent.title.as_deref(), Some("New"));

        let cleared: UpdatePostRequest =
            serde_json::from_str(r#"{"featured_image":null}"#).unwrap();
        assert_eq!(cleared.featured_image, Some(None));

        let set: UpdatePostRequest =
            serde_json::from_str(r#"{"featured_image":"/media/a.png"}"#).unwrap();
        assert_eq!(set.featured_image, Some(Some("/media/a.png".to_string())));
    }

    #[test]
    fn test_add_comment_ignores_client_authority_fields() {
        let body = format!(
            r#"{{"content":"hi","post":"{}","author_id":"{}"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let req: AddCommentRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.content, "hi");
    }

    #[test]
    fn test_create_post_optional_fields_default() {
        let req: CreatePostRequest =
            serde_json::from_str(r#"{"title":"Hello","content":"World"}"#).unwrap();
        assert!(req.slug.is_none());
        assert!(req.published.is_none());
    }
}
