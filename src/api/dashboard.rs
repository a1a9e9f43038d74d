use axum::response::Html;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// 単一ページのダッシュボード。データは `/v1/*` から取得する。
pub(crate) async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use crate::test_support::{StubArticles, router_with};

    #[tokio::test]
    async fn serves_html_page() {
        let router = router_with(StubArticles::Text("unused"));
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/html"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(String::from_utf8_lossy(&body).contains("Fake News Detector"));
    }
}
