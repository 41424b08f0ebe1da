use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::{
    cache::CacheInvalidator,
    error::{Error, Result},
    state::AppState,
    webhook::{self, WebhookConfig},
};

/// 配置 webhook 路由。
///
/// - `POST /revalidate`：接收 CMS 的变更通知并失效相关缓存
pub fn setup_route() -> Router<AppState> {
    Router::new().route("/revalidate", post(revalidate))
}

/// webhook 响应体。
///
/// 始终带 `success`；成功时附带本次失效的资源、标签、路径和 slug。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RevalidateResponse {
    success: bool,
    revalidated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slugs: Option<Vec<String>>,
}

/// 处理 CMS 的变更通知。
///
/// 单次线性流程，无重试：
///
/// 1. 密钥未配置 → 500
/// 2. 凭证校验失败 → 401
/// 3. 请求体不是 JSON → 400
/// 4. 解析文档类型和 slug，算出失效计划；不认识的类型 → 202 no-op
/// 5. 先失效全部标签，再失效全部路径 → 200
async fn revalidate(
    State(config): State<WebhookConfig>,
    State(invalidator): State<Arc<dyn CacheInvalidator>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RevalidateResponse>)> {
    let secret = config
        .secret
        .as_deref()
        .ok_or(Error::ConfigurationMissing("SANITY_WEBHOOK_SECRET"))?;

    let provided = provided_secret(&headers).ok_or(Error::Unauthorized)?;
    if !webhook::verify_secret(provided, secret) {
        return Err(Error::Unauthorized);
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|_| Error::InvalidPayload)?;

    let document_type = webhook::document_type(&payload);
    let slugs = webhook::slugs(&payload);

    let Some(plan) = webhook::plan(
        document_type.as_deref(),
        &slugs,
        config.untyped_as_article,
    ) else {
        tracing::info!(?document_type, "webhook ignored: unsupported document type");

        return Ok((
            StatusCode::ACCEPTED,
            Json(RevalidateResponse {
                success: true,
                revalidated: false,
                reason: Some("unsupported_document_type"),
                document_type,
                resource: None,
                tags: None,
                paths: None,
                slugs: None,
            }),
        ));
    };

    for tag in &plan.tags {
        invalidator
            .invalidate_tag(tag)
            .await
            .map_err(|e| Error::RevalidationFailed(e.to_string()))?;
    }
    for path in &plan.paths {
        invalidator
            .invalidate_path(path)
            .await
            .map_err(|e| Error::RevalidationFailed(e.to_string()))?;
    }

    tracing::info!(
        resource = plan.resource,
        tags = plan.tags.len(),
        paths = plan.paths.len(),
        "cache revalidated"
    );

    Ok((
        StatusCode::OK,
        Json(RevalidateResponse {
            success: true,
            revalidated: true,
            reason: None,
            document_type,
            resource: Some(plan.resource),
            tags: Some(plan.tags),
            paths: Some(plan.paths),
            slugs: Some(slugs),
        }),
    ))
}

/// 从请求头取调用方提供的密钥。
///
/// 优先 `Authorization: Bearer {secret}`，
/// 兼容旧版发送方的 `X-Sanity-Webhook-Secret` 头。
fn provided_secret(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION)
        && let Ok(auth) = auth.to_str()
        && let Some(token) = auth.strip_prefix("Bearer ")
    {
        return Some(token.trim());
    }

    headers
        .get("x-sanity-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
