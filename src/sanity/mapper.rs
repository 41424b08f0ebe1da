use serde::Serialize;
use serde_json::Value;

use super::rich_text::{RichTextBlock, normalize_rich_text_body};

/// 文章摘要，用于列表展示。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub published_at: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    pub tags: Vec<String>,
}

/// 完整文章，包括摘要字段和正文。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub summary: ArticleSummary,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_alt: Option<String>,
    pub body: Vec<RichTextBlock>,
}

/// 把上游原始文档映射为文章摘要。
///
/// `title`、`slug`、`publishedAt` 去空白后任一为空则整条丢弃返回 `None`，
/// 没有身份的记录不是合法实体。其余字段按字段级规则取默认值或丢弃。
pub fn map_article_summary(doc: &Value) -> Option<ArticleSummary> {
    let title = trimmed(doc, "title")?;
    let slug = trimmed(doc, "slug")?;
    let published_at = trimmed(doc, "publishedAt")?;

    Some(ArticleSummary {
        id: trimmed(doc, "id")
            .or_else(|| trimmed(doc, "_id"))
            .unwrap_or_default(),
        title,
        slug,
        published_at,
        excerpt: trimmed(doc, "excerpt").unwrap_or_default(),
        image_url: trimmed(doc, "imageUrl"),
        image_width: positive_dimension(doc.get("imageWidth")),
        image_height: positive_dimension(doc.get("imageHeight")),
        tags: mapped_tags(doc.get("tags")),
    })
}

/// 把上游原始文档映射为完整文章。
///
/// 复用 [`map_article_summary`] 的身份规则；正文交由富文本归一化处理。
pub fn map_article_detail(doc: &Value) -> Option<ArticleDetail> {
    let summary = map_article_summary(doc)?;

    Some(ArticleDetail {
        summary,
        seo_description: trimmed(doc, "seoDescription"),
        image_alt: trimmed(doc, "imageAlt"),
        body: normalize_rich_text_body(doc.get("body").unwrap_or(&Value::Null)),
    })
}

/// 取字符串字段并去空白，空串视为缺失。
fn trimmed(doc: &Value, key: &str) -> Option<String> {
    doc.get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 图片尺寸：仅接受有限且严格大于零的数值，四舍五入取整。
/// 取整后为零的值同样丢弃，尺寸必须是正整数。
pub(super) fn positive_dimension(value: Option<&Value>) -> Option<u32> {
    let n = value?.as_f64()?;

    (n.is_finite() && n > 0.0)
        .then(|| n.round() as u32)
        .filter(|&d| d > 0)
}

/// 标签：逐元素去空白，空串过滤掉，缺失时为空数组。
fn mapped_tags(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_doc() -> Value {
        json!({
            "id": "doc-1",
            "title": "Hello",
            "slug": "hello",
            "publishedAt": "2024-06-01T00:00:00Z",
            "excerpt": "short",
            "imageUrl": "https://cdn.example/img.png",
            "imageWidth": 1200.4,
            "imageHeight": 630.6,
            "tags": [" rust ", "", "web"]
        })
    }

    #[test]
    fn maps_valid_document() {
        let summary = map_article_summary(&valid_doc()).expect("valid doc");

        assert_eq!(summary.id, "doc-1");
        assert_eq!(summary.title, "Hello");
        assert_eq!(summary.image_width, Some(1200));
        assert_eq!(summary.image_height, Some(631));
        assert_eq!(summary.tags, vec!["rust", "web"]);
    }

    /// 身份字段缺失或只有空白时整条丢弃
    #[test]
    fn drops_document_missing_identity_fields() {
        for key in ["title", "slug", "publishedAt"] {
            let mut doc = valid_doc();
            doc.as_object_mut().unwrap().remove(key);
            assert!(map_article_summary(&doc).is_none(), "missing {}", key);

            let mut doc = valid_doc();
            doc[key] = json!("   ");
            assert!(map_article_summary(&doc).is_none(), "blank {}", key);
        }
    }

    #[test]
    fn defaults_optional_fields() {
        let doc = json!({
            "title": "t",
            "slug": "s",
            "publishedAt": "2024-01-01",
            "imageUrl": "  "
        });

        let summary = map_article_summary(&doc).expect("valid doc");

        assert_eq!(summary.excerpt, "");
        assert_eq!(summary.image_url, None);
        assert!(summary.tags.is_empty());
    }

    /// 非正数、非数值的尺寸一律丢弃；正数四舍五入
    #[test]
    fn dimension_rules() {
        assert_eq!(positive_dimension(None), None);
        assert_eq!(positive_dimension(Some(&json!(null))), None);
        assert_eq!(positive_dimension(Some(&json!("800"))), None);
        assert_eq!(positive_dimension(Some(&json!(0))), None);
        assert_eq!(positive_dimension(Some(&json!(-3))), None);
        // 取整后为零也不是合法尺寸
        assert_eq!(positive_dimension(Some(&json!(0.4))), None);

        assert_eq!(positive_dimension(Some(&json!(799.5))), Some(800));
        assert_eq!(positive_dimension(Some(&json!(1.0))), Some(1));
    }

    #[test]
    fn maps_detail_with_body() {
        let mut doc = valid_doc();
        doc["seoDescription"] = json!("  desc  ");
        doc["imageAlt"] = json!("   ");
        doc["body"] = json!([
            { "_type": "block", "children": [{ "_type": "span", "text": "hi", "marks": [] }], "markDefs": [] }
        ]);

        let detail = map_article_detail(&doc).expect("valid doc");

        assert_eq!(detail.seo_description.as_deref(), Some("desc"));
        assert_eq!(detail.image_alt, None);
        assert_eq!(detail.body.len(), 1);
    }
}
