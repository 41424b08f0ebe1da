use std::{env, time::Duration};

use axum::http::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url, header};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

use super::{ArticleDetail, ArticleSummary, map_article_detail, map_article_summary};

/// 文章列表查询，按发布时间倒序。
const ARTICLE_LIST_QUERY: &str = r#"*[_type == "article"] | order(publishedAt desc){
  "id": _id, title, "slug": slug.current, publishedAt, excerpt,
  "imageUrl": mainImage.asset->url,
  "imageWidth": mainImage.asset->metadata.dimensions.width,
  "imageHeight": mainImage.asset->metadata.dimensions.height,
  tags
}"#;

/// 按 slug 查询单篇文章，`$slug` 由查询参数注入。
const ARTICLE_BY_SLUG_QUERY: &str = r#"*[_type == "article" && slug.current == $slug][0]{
  "id": _id, title, "slug": slug.current, publishedAt, excerpt,
  "imageUrl": mainImage.asset->url,
  "imageWidth": mainImage.asset->metadata.dimensions.width,
  "imageHeight": mainImage.asset->metadata.dimensions.height,
  "imageAlt": mainImage.alt,
  tags, seoDescription, body
}"#;

/// 可重试的上游状态码集合。
const RETRYABLE_STATUS: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// 抓取管线的显式配置。
///
/// 作为结构体传入客户端而不是模块常量，测试时可以注入确定性的时间参数。
#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    /// 单次尝试的超时时间
    pub timeout: Duration,
    /// 额外重试次数，总尝试次数为 `max_retries + 1`
    pub max_retries: u32,
    /// 线性退避的基础延迟，第 N 次失败后等待 `retry_delay * N`
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_retries: 1,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Sanity 项目配置，从环境变量读取。
#[derive(Debug, Clone)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// 走 `apicdn.sanity.io` 还是 `api.sanity.io`
    pub use_cdn: bool,
    pub read_token: Option<String>,
}

impl SanityConfig {
    /// 从环境变量构建配置。
    ///
    /// - `SANITY_PROJECT_ID` / `SANITY_DATASET`：必填
    /// - `SANITY_API_VERSION`：默认 `2024-01-01`
    /// - `SANITY_USE_CDN`：默认开启，`false`/`0` 关闭
    /// - `SANITY_READ_TOKEN`：可选
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            project_id: require("SANITY_PROJECT_ID")?,
            dataset: require("SANITY_DATASET")?,
            api_version: env::var("SANITY_API_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "2024-01-01".to_string()),
            use_cdn: env::var("SANITY_USE_CDN")
                .map(|v| !matches!(v.as_str(), "false" | "0"))
                .unwrap_or(true),
            read_token: env::var("SANITY_READ_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    fn query_endpoint(&self) -> String {
        let domain = if self.use_cdn {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };

        format!(
            "https://{}.{}/v{}/data/query/{}",
            self.project_id, domain, self.api_version, self.dataset
        )
    }
}

fn require(key: &'static str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(Error::ConfigurationMissing(key))
}

/// Sanity 内容客户端。
///
/// 封装查询 URL 构建和带超时、重试、线性退避的抓取管线。
/// 克隆开销很小，内部的 [`reqwest::Client`] 自带连接池。
#[derive(Clone)]
pub struct SanityClient {
    http: reqwest::Client,
    base: Url,
    fetch: FetchConfig,
}

impl SanityClient {
    /// 创建客户端。
    ///
    /// 配置了读 token 时自动带上 `Authorization: Bearer` 默认请求头。
    ///
    /// - Panics
    ///
    /// 配置拼不出合法的查询 URL 或 token 不是合法的请求头值时 panic。
    pub fn new(config: &SanityConfig, fetch: FetchConfig) -> Self {
        let base = Url::parse(&config.query_endpoint()).expect("invalid sanity query endpoint");

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers({
                let mut headers = HeaderMap::new();
                if let Some(token) = &config.read_token {
                    headers.insert(
                        header::AUTHORIZATION,
                        HeaderValue::from_str(&format!("Bearer {}", token))
                            .expect("Failed to create Authorization header"),
                    );
                }
                headers
            })
            .build()
            .expect("Failed to build reqwest client");

        Self { http, base, fetch }
    }

    /// 构建指向本地桩服务的客户端，供路由和客户端测试使用。
    #[cfg(test)]
    pub(crate) fn with_endpoint(base: Url, fetch: FetchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            fetch,
        }
    }

    /// 获取文章摘要列表。
    ///
    /// 无法映射的文档会被整条丢弃，返回的列表保持上游顺序。
    pub async fn article_summaries(&self) -> Result<Vec<ArticleSummary>> {
        let url = self.query_url(ARTICLE_LIST_QUERY, &[]);
        let resp = self.fetch_with_retry(url).await?;

        Ok(match Self::parse_query_response(resp).await? {
            Some(Value::Array(docs)) => docs.iter().filter_map(map_article_summary).collect(),
            _ => Vec::new(),
        })
    }

    /// 按 slug 获取单篇文章。
    ///
    /// 上游返回 null 或文档缺失身份字段时返回 `None`。
    pub async fn article_by_slug(&self, slug: &str) -> Result<Option<ArticleDetail>> {
        let url = self.query_url(ARTICLE_BY_SLUG_QUERY, &[("slug", slug)]);
        let resp = self.fetch_with_retry(url).await?;

        Ok(Self::parse_query_response(resp)
            .await?
            .as_ref()
            .and_then(map_article_detail))
    }

    /// 构建查询 URL。
    ///
    /// GROQ 参数按 Sanity 的约定以 JSON 字面量编码，例如 `$slug="foo"`。
    fn query_url(&self, query: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(
                    &format!("${}", name),
                    &Value::String(value.to_string()).to_string(),
                );
            }
        }

        url
    }

    /// 带超时和重试的 GET 请求。
    ///
    /// - 总尝试次数为 `max_retries + 1`，严格串行
    /// - 传输错误（超时或网络）和可重试状态码会触发重试
    /// - 第 N 次失败后等待 `retry_delay * N`（线性退避，无抖动）
    /// - 2xx 直接返回原始响应，响应体交由调用方解析
    ///
    /// 超时由 reqwest 的单请求超时实现，触发时丢弃在途请求，
    /// 不会有残留的尝试影响后续重试。
    pub async fn fetch_with_retry(&self, url: Url) -> Result<reqwest::Response> {
        let total = self.fetch.max_retries.saturating_add(1).max(1);

        let mut attempt = 1u32;
        loop {
            let outcome = self
                .http
                .get(url.clone())
                .timeout(self.fetch.timeout)
                .send()
                .await;

            let err = match outcome {
                Ok(resp) if resp.status().is_success() => return Ok(resp),

                Ok(resp) => {
                    let status = resp.status();
                    if !RETRYABLE_STATUS.contains(&status) {
                        return Err(Error::Upstream(status));
                    }
                    Error::Upstream(status)
                }

                Err(e) if e.is_timeout() => Error::UpstreamTimeout,
                Err(e) => Error::UpstreamNetwork(e),
            };

            if attempt >= total {
                return Err(err);
            }

            tracing::warn!(attempt, total, reason = %err, "retrying upstream request");

            tokio::time::sleep(self.fetch.retry_delay * attempt).await;
            attempt += 1;
        }
    }

    /// 解析 Sanity 的 `{ result?: T }` 响应信封。
    ///
    /// 响应体不是合法 JSON 时返回 [`Error::InvalidUpstreamResponse`]。
    pub async fn parse_query_response(resp: reqwest::Response) -> Result<Option<Value>> {
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::UpstreamTimeout
            } else {
                Error::UpstreamNetwork(e)
            }
        })?;

        let envelope: QueryResponse =
            serde_json::from_slice(&bytes).map_err(Error::InvalidUpstreamResponse)?;

        Ok(envelope.result)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: Option<Value>,
}
