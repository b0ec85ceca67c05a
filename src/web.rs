use axum::routing::get;
use axum::Router;

use crate::chat::persona;

async fn home() -> String {
    format!("✅ Dev Bot Running! Time: {}", persona::ist_now_string())
}

pub fn build_router() -> Router {
    Router::new().route("/", get(home))
}

/// Tiny health server so the hosting platform's uptime pings get a 200.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("health endpoint listening on {addr}");
    axum::serve(listener, build_router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn home_reports_running() {
        let app = build_router();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("✅ Dev Bot Running!"));
    }
}
