use axum::{Json, response::IntoResponse};
use reqwest::StatusCode;
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

/// 服务统一错误类型。
///
/// 每个变体对应一个 HTTP 状态码和机器可读的错误码，
/// 上游错误的底层原因只写入日志，不会出现在响应体中。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 重试耗尽，最后一次失败是超时
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// 重试耗尽，最后一次失败是非超时的传输错误
    #[error("upstream network error")]
    UpstreamNetwork(#[source] reqwest::Error),

    /// 上游返回非 2xx 且不可重试（或重试已耗尽）的状态码
    #[error("upstream responded with status {0}")]
    Upstream(StatusCode),

    /// 上游响应体不是合法 JSON
    #[error("upstream response is not valid json")]
    InvalidUpstreamResponse(#[source] serde_json::Error),

    /// 必需的配置项缺失
    #[error("`{0}` not configured")]
    ConfigurationMissing(&'static str),

    /// 凭证缺失或校验失败
    #[error("unauthorized")]
    Unauthorized,

    /// webhook 请求体不是合法 JSON
    #[error("invalid payload")]
    InvalidPayload,

    /// 计算或应用缓存失效时出现意外失败
    #[error("revalidation failed")]
    RevalidationFailed(String),

    /// 请求的资源不存在
    #[error("not found")]
    NotFound,
}

impl Error {
    /// 机器可读错误码，写入响应体的 `error.code` 字段。
    pub fn code(&self) -> &'static str {
        match self {
            Error::UpstreamTimeout => "upstream_timeout",
            Error::UpstreamNetwork(_) => "upstream_network_error",
            Error::Upstream(_) => "upstream_error",
            Error::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            Error::ConfigurationMissing(_) => "configuration_missing",
            Error::Unauthorized => "unauthorized",
            Error::InvalidPayload => "invalid_payload",
            Error::RevalidationFailed(_) => "revalidation_failed",
            Error::NotFound => "not_found",
        }
    }

    /// 对应的 HTTP 状态码。
    pub fn status(&self) -> StatusCode {
        match self {
            Error::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Error::UpstreamNetwork(_) | Error::Upstream(_) | Error::InvalidUpstreamResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::ConfigurationMissing(_) | Error::RevalidationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::InvalidPayload => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match &self {
            Error::UpstreamNetwork(e) => tracing::error!(%e, "upstream network error"),
            Error::InvalidUpstreamResponse(e) => tracing::error!(%e, "bad upstream response"),
            Error::ConfigurationMissing(key) => tracing::error!(%key, "missing configuration"),
            Error::RevalidationFailed(reason) => tracing::error!(%reason, "revalidation failed"),
            _ => {}
        }

        let body = json!({
            "success": false,
            "error": { "code": self.code(), "message": self.to_string() },
        });

        (self.status(), Json(body)).into_response()
    }
}
