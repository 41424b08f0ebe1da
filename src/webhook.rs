use std::env;

use serde_json::Value;

/// webhook 配置。
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// 共享密钥；缺失时端点在请求期返回 500
    pub secret: Option<String>,
    /// 旧版发送方兼容：payload 无 `_type` 但带 slug 时按 article 处理。
    /// 显式开关而不是写死，避免悄悄误分类未来的新文档类型。
    pub untyped_as_article: bool,
}

impl WebhookConfig {
    /// 从环境变量构建配置。
    ///
    /// - `SANITY_WEBHOOK_SECRET`：共享密钥
    /// - `WEBHOOK_UNTYPED_AS_ARTICLE`：默认开启，`false`/`0` 关闭
    pub fn from_env() -> Self {
        Self {
            secret: env::var("SANITY_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            untyped_as_article: env::var("WEBHOOK_UNTYPED_AS_ARTICLE")
                .map(|v| !matches!(v.as_str(), "false" | "0"))
                .unwrap_or(true),
        }
    }
}

/// 校验调用方提供的密钥。
///
/// 先比较长度，长度一致时再做常数时间的逐字节比较，
/// 等长输入的耗时不随失配位置变化。
pub fn verify_secret(provided: &str, configured: &str) -> bool {
    constant_time_eq(provided.as_bytes(), configured.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// 从不可信 payload 提取文档类型。
///
/// 依次检查 payload 自身、`document`、`after`、`before` 的 `_type`。
pub fn document_type(payload: &Value) -> Option<String> {
    [Some(payload), payload.get("document"), payload.get("after"), payload.get("before")]
        .into_iter()
        .flatten()
        .find_map(|doc| {
            doc.get("_type")?
                .as_str()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// 从不可信 payload 提取去重后的 slug 列表，保持发现顺序。
///
/// 单值候选：`slug`、`document.slug`、`before.slug`、`after.slug`、`previousSlug`；
/// 列表候选：`slugs`、`document.slugs`。
/// 每个候选既可以是裸字符串，也可以是带 `current` 字段的对象，
/// 上游 CMS 的不同 payload 版本两种形态都在用。
pub fn slugs(payload: &Value) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    let mut push = |candidate: Option<&Value>| {
        if let Some(slug) = candidate.and_then(slug_value)
            && !found.contains(&slug)
        {
            found.push(slug);
        }
    };

    push(payload.get("slug"));
    push(payload.get("document").and_then(|d| d.get("slug")));
    push(payload.get("before").and_then(|d| d.get("slug")));
    push(payload.get("after").and_then(|d| d.get("slug")));
    push(payload.get("previousSlug"));

    for list in [
        payload.get("slugs"),
        payload.get("document").and_then(|d| d.get("slugs")),
    ] {
        if let Some(items) = list.and_then(Value::as_array) {
            for item in items {
                push(Some(item));
            }
        }
    }

    found
}

fn slug_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("current")?.as_str()?,
        _ => return None,
    };

    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

/// 一次 webhook 请求要执行的失效集合。
#[derive(Debug, Clone, PartialEq)]
pub struct RevalidationPlan {
    pub resource: &'static str,
    pub tags: Vec<String>,
    pub paths: Vec<String>,
}

/// 按文档类型计算失效计划。
///
/// - `article`：标签 `articles` + `article:{slug}`，路径 `/articles` + `/articles/{slug}`
/// - `page`：标签 `pages` + `page:{slug}`，路径 `/{slug}`（没有列表页）
/// - 类型缺失但有 slug 且开了兼容开关：按 article 处理
/// - 其余类型不处理，返回 `None`
///
/// 类型匹配对大小写不敏感；路径里的 slug 做百分号编码。
pub fn plan(
    document_type: Option<&str>,
    slugs: &[String],
    untyped_as_article: bool,
) -> Option<RevalidationPlan> {
    let kind = document_type.map(str::to_lowercase);

    match kind.as_deref() {
        Some("article") => Some(article_plan(slugs)),
        Some("page") => Some(page_plan(slugs)),
        None if untyped_as_article && !slugs.is_empty() => Some(article_plan(slugs)),
        _ => None,
    }
}

fn article_plan(slugs: &[String]) -> RevalidationPlan {
    let mut tags = vec!["articles".to_string()];
    let mut paths = vec!["/articles".to_string()];

    for slug in slugs {
        tags.push(format!("article:{}", slug));
        paths.push(format!("/articles/{}", urlencoding::encode(slug)));
    }

    RevalidationPlan {
        resource: "article",
        tags,
        paths,
    }
}

fn page_plan(slugs: &[String]) -> RevalidationPlan {
    let mut tags = vec!["pages".to_string()];
    let mut paths = Vec::new();

    for slug in slugs {
        tags.push(format!("page:{}", slug));
        paths.push(format!("/{}", urlencoding::encode(slug)));
    }

    RevalidationPlan {
        resource: "page",
        tags,
        paths,
    }
}
