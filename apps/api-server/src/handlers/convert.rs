//! Domain to wire conversions.

use actix_web::HttpRequest;

use quill_core::domain::User;
use quill_core::ports::Page;
use quill_core::services::{CommentView, PostDetail, PostSummary};
use quill_shared::PaginatedResponse;
use quill_shared::dto::{CommentResponse, PostDetailResponse, PostListItem, UserResponse};

pub fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

pub fn post_list_item(summary: PostSummary) -> PostListItem {
    let post = summary.post;
    PostListItem {
        id: post.id,
        title: post.title,
        slug: post.slug,
        author: summary.author.map(user_response),
        featured_image: post.featured_image,
        created_at: post.created_at,
        comment_count: summary.comment_count,
    }
}

pub fn comment_response(view: CommentView) -> CommentResponse {
    let comment = view.comment;
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        author: view.author.map(user_response),
        content: comment.content,
        created_at: comment.created_at,
    }
}

pub fn post_detail_response(detail: PostDetail) -> PostDetailResponse {
    let post = detail.post;
    PostDetailResponse {
        id: post.id,
        title: post.title,
        slug: post.slug,
        content: post.content,
        author: detail.author.map(user_response),
        featured_image: post.featured_image,
        created_at: post.created_at,
        updated_at: post.updated_at,
        published: post.published,
        comments: detail.comments.into_iter().map(comment_response).collect(),
    }
}

/// Wrap a page in the list envelope, linking to the neighbouring pages.
pub fn paginated<T, U>(
    req: &HttpRequest,
    page: Page<T>,
    convert: impl FnMut(T) -> U,
) -> PaginatedResponse<U> {
    let next = page.has_next().then(|| page_link(req, page.page + 1));
    let previous = page.has_previous().then(|| page_link(req, page.page - 1));
    let (count, number, page_size) = (page.total, page.page, page.page_size);

    PaginatedResponse {
        count,
        page: number,
        page_size,
        next,
        previous,
        results: page.items.into_iter().map(convert).collect(),
    }
}

/// The current URL with its `page` parameter replaced.
fn page_link(req: &HttpRequest, page: u64) -> String {
    let page_param = format!("page={page}");
    let mut params: Vec<&str> = req
        .query_string()
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .collect();
    params.push(&page_param);

    let info = req.connection_info();
    format!(
        "{}://{}{}?{}",
        info.scheme(),
        info.host(),
        req.path(),
        params.join("&")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use quill_core::ports::PageRequest;

    #[test]
    fn test_page_links_keep_other_params() {
        let req = TestRequest::get()
            .uri("/api/posts?search=rust&page=2&page_size=1")
            .insert_header(("host", "blog.example"))
            .to_http_request();
        let page = Page::new(vec![1], 3, PageRequest::new(Some(2), Some(1)));

        let body = paginated(&req, page, |n| n * 10);

        assert_eq!(body.count, 3);
        assert_eq!(body.results, vec![10]);
        assert_eq!(
            body.next.as_deref(),
            Some("http://blog.example/api/posts?search=rust&page_size=1&page=3")
        );
        assert_eq!(
            body.previous.as_deref(),
            Some("http://blog.example/api/posts?search=rust&page_size=1&page=1")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let req = TestRequest::get().uri("/api/comments").to_http_request();
        let body = paginated(&req, Page::new(vec!["a"], 1, PageRequest::default()), |s| s);

        assert!(body.next.is_none());
        assert!(body.previous.is_none());
    }
}
