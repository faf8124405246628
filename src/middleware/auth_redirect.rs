use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Sends browsers without a valid session to the login page, remembering
/// where they were headed.
pub async fn redirect_unauthorized(req: Request, next: Next) -> Response {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let response = next.run(req).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        let next: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        Redirect::to(&format!("/auth/login?next={next}")).into_response()
    } else {
        response
    }
}
