use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::{
    error::{Error, Result},
    sanity::{ArticleDetail, ArticleSummary, SanityClient},
    state::AppState,
};

/// 配置文章相关路由。
///
/// 路由包括：
/// - `GET /articles`：文章摘要列表
/// - `GET /articles/{slug}`：获取单篇文章
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/articles", get(articles_list))
        .route("/articles/{slug}", get(article))
}

/// 获取文章摘要列表。
///
/// 内容实时取自 Sanity，按发布时间倒序。
async fn articles_list(State(sanity): State<SanityClient>) -> Result<Json<Vec<ArticleSummary>>> {
    sanity.article_summaries().await.map(Json)
}

/// 根据 slug 获取单篇文章。
///
/// 返回 [`ArticleDetail`]，如果文章不存在返回 [`Error::NotFound`]。
async fn article(
    Path(slug): Path<String>,
    State(sanity): State<SanityClient>,
) -> Result<Json<ArticleDetail>> {
    sanity
        .article_by_slug(&slug)
        .await?
        .ok_or(Error::NotFound)
        .map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        extract::Request,
        http::StatusCode,
    };
    use tower::util::ServiceExt;

    use crate::{
        api, cache::LogInvalidator, sanity::FetchConfig, state::AppState, webhook::WebhookConfig,
    };

    use super::*;

    /// 起一个固定返回 `{ result }` 的本地桩上游，返回指向它的客户端
    async fn stub_client(result: serde_json::Value) -> SanityClient {
        let upstream = Router::<()>::new().route(
            "/",
            get(move || {
                let result = result.clone();
                async move { Json(serde_json::json!({ "result": result })) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(listener, upstream).await.expect("serve upstream");
        });

        let base = reqwest::Url::parse(&format!("http://{}/", addr)).expect("upstream url");
        SanityClient::with_endpoint(base, FetchConfig::default())
    }

    fn test_router(sanity: SanityClient) -> Router {
        api::setup_route(AppState::new(
            sanity,
            Arc::new(LogInvalidator),
            WebhookConfig {
                secret: None,
                untyped_as_article: true,
            },
        ))
    }

    /// 列表路由返回映射后的摘要，坏文档被丢弃，字段按 camelCase 序列化
    #[tokio::test]
    async fn articles_list_serves_mapped_summaries() {
        let sanity = stub_client(serde_json::json!([
            {
                "id": "a1",
                "title": "Hello",
                "slug": "hello",
                "publishedAt": "2024-06-01T00:00:00Z",
                "excerpt": "hi",
                "tags": ["rust"]
            },
            { "title": "broken" }
        ]))
        .await;

        let resp = test_router(sanity)
            .oneshot(
                Request::get("/api/articles")
                    .body(Body::empty())
                    .expect("请求失败"),
            )
            .await
            .expect("oneshot fail");

        assert_eq!(resp.status(), StatusCode::OK);

        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        let json: Vec<serde_json::Value> = serde_json::from_slice(&data).expect("反序列化失败");

        assert_eq!(json.len(), 1);
        assert_eq!(json[0]["slug"], "hello");
        assert_eq!(json[0]["publishedAt"], "2024-06-01T00:00:00Z");
    }

    /// 上游 result 为 null 时，单篇路由映射为 404
    #[tokio::test]
    async fn unknown_slug_maps_to_not_found() {
        let sanity = stub_client(serde_json::Value::Null).await;

        let resp = test_router(sanity)
            .oneshot(
                Request::get("/api/articles/missing")
                    .body(Body::empty())
                    .expect("请求失败"),
            )
            .await
            .expect("oneshot fail");

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let data = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        let json: serde_json::Value = serde_json::from_slice(&data).expect("反序列化失败");

        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "not_found");
    }
}
