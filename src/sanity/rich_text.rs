use serde::Serialize;
use serde_json::{Map, Value};

use super::mapper::positive_dimension;

/// 归一化后的富文本块（Portable Text 的稳定子集）。
///
/// `kind` 作为判别标签序列化，未识别的块在归一化阶段已被丢弃。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RichTextBlock {
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>,
        #[serde(rename = "listItem", skip_serializing_if = "Option::is_none")]
        list_item: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<u32>,
        children: Vec<Span>,
        #[serde(rename = "markDefs")]
        mark_defs: Vec<Map<String, Value>>,
    },
    Image {
        #[serde(skip_serializing_if = "Option::is_none")]
        asset: Option<ImageAsset>,
        #[serde(skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
}

/// 文本块内的文字片段。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub text: String,
    pub marks: Vec<String>,
}

/// 图片块的资源信息。三个字段全缺失时整个 asset 记为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAsset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// 归一化富文本正文。
///
/// - 非数组输入得到空数组，永不报错
/// - 每个块独立归一化，单个坏块不会拖垮整篇文档
/// - 同时识别上游的 `_type`（`block`/`image`/`span`）和
///   归一化输出自身的 `kind` 标签，因此对已归一化的输入是幂等的
pub fn normalize_rich_text_body(raw: &Value) -> Vec<RichTextBlock> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items.iter().filter_map(normalize_block).collect()
}

fn block_kind(block: &Value) -> Option<&str> {
    if let Some(kind) = block.get("kind").and_then(Value::as_str) {
        return Some(kind);
    }

    match block.get("_type").and_then(Value::as_str) {
        Some("block") => Some("text"),
        Some("image") => Some("image"),
        _ => None,
    }
}

fn normalize_block(block: &Value) -> Option<RichTextBlock> {
    match block_kind(block)? {
        "text" => Some(normalize_text_block(block)),
        "image" => Some(normalize_image_block(block)),
        _ => None,
    }
}

fn normalize_text_block(block: &Value) -> RichTextBlock {
    let children = block
        .get("children")
        .and_then(Value::as_array)
        .map(|spans| spans.iter().filter_map(normalize_span).collect())
        .unwrap_or_default();

    let mark_defs = block
        .get("markDefs")
        .and_then(Value::as_array)
        .map(|defs| {
            defs.iter()
                .filter_map(Value::as_object)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    RichTextBlock::Text {
        style: non_empty_str(block.get("style")),
        list_item: non_empty_str(block.get("listItem")),
        level: block.get("level").and_then(Value::as_u64).map(|l| l as u32),
        children,
        mark_defs,
    }
}

/// 仅保留带字符串 `text` 的 span；`marks` 里的非字符串元素逐个丢弃。
fn normalize_span(span: &Value) -> Option<Span> {
    if let Some(t) = span.get("_type").and_then(Value::as_str)
        && t != "span"
    {
        return None;
    }

    let text = span.get("text")?.as_str()?.to_string();

    let marks = span
        .get("marks")
        .and_then(Value::as_array)
        .map(|marks| {
            marks
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Span { text, marks })
}

fn normalize_image_block(block: &Value) -> RichTextBlock {
    // 上游把资源嵌在 asset 里；归一化输出也用同一层级
    let asset_doc = block.get("asset").unwrap_or(block);

    let url = non_empty_str(asset_doc.get("url"));
    let width = positive_dimension(asset_doc.get("width"));
    let height = positive_dimension(asset_doc.get("height"));

    let asset = if url.is_none() && width.is_none() && height.is_none() {
        None
    } else {
        Some(ImageAsset { url, width, height })
    };

    RichTextBlock::Image {
        asset,
        alt: non_empty_str(block.get("alt")),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_array_input_yields_empty() {
        for raw in [json!(null), json!("body"), json!(42), json!({ "a": 1 })] {
            assert!(normalize_rich_text_body(&raw).is_empty());
        }
    }

    /// 没有可识别类型标签的块被丢弃，其余块不受影响
    #[test]
    fn unrecognized_blocks_are_dropped_independently() {
        let raw = json!([
            { "_type": "block", "children": [{ "_type": "span", "text": "keep" }] },
            { "_type": "callout", "text": "drop me" },
            { "weird": true },
            { "_type": "image", "asset": { "url": "https://cdn.example/a.png" } }
        ]);

        let blocks = normalize_rich_text_body(&raw);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], RichTextBlock::Text { .. }));
        assert!(matches!(blocks[1], RichTextBlock::Image { .. }));
    }

    #[test]
    fn spans_and_marks_are_filtered() {
        let raw = json!([{
            "_type": "block",
            "style": "normal",
            "children": [
                { "_type": "span", "text": "ok", "marks": ["strong", 7, null, "em"] },
                { "_type": "span", "marks": ["strong"] },
                { "_type": "inlineObject", "text": "not a span" },
                "not even an object"
            ],
            "markDefs": [ { "_key": "a", "_type": "link" }, "junk", 3 ]
        }]);

        let blocks = normalize_rich_text_body(&raw);
        let RichTextBlock::Text {
            children, mark_defs, ..
        } = &blocks[0]
        else {
            panic!("expected text block");
        };

        assert_eq!(children.len(), 1);
        assert_eq!(children[0].text, "ok");
        assert_eq!(children[0].marks, vec!["strong", "em"]);
        assert_eq!(mark_defs.len(), 1);
    }

    /// url/width/height 全缺失时 asset 整体为 None，而不是空对象
    #[test]
    fn image_without_asset_fields_has_no_asset() {
        let raw = json!([
            { "_type": "image", "alt": " decorative " },
            { "_type": "image", "asset": { "_ref": "image-abc" } },
            { "_type": "image", "asset": { "url": "https://cdn.example/b.png", "width": 100.2, "height": 0 } }
        ]);

        let blocks = normalize_rich_text_body(&raw);

        let RichTextBlock::Image { asset, alt } = &blocks[0] else {
            panic!("expected image block");
        };
        assert!(asset.is_none());
        assert_eq!(alt.as_deref(), Some("decorative"));

        let RichTextBlock::Image { asset, .. } = &blocks[1] else {
            panic!("expected image block");
        };
        assert!(asset.is_none());

        let RichTextBlock::Image { asset, .. } = &blocks[2] else {
            panic!("expected image block");
        };
        let asset = asset.as_ref().expect("asset present");
        assert_eq!(asset.url.as_deref(), Some("https://cdn.example/b.png"));
        assert_eq!(asset.width, Some(100));
        assert_eq!(asset.height, None);
    }

    /// 对已归一化的输入再跑一遍，结果不变
    #[test]
    fn normalization_is_idempotent() {
        let raw = json!([
            {
                "_type": "block",
                "style": "h2",
                "level": 1,
                "children": [{ "_type": "span", "text": "title", "marks": ["strong"] }],
                "markDefs": [{ "_key": "l1", "_type": "link", "href": "https://example.com" }]
            },
            { "_type": "image", "asset": { "url": "https://cdn.example/c.png", "width": 640, "height": 480 }, "alt": "c" }
        ]);

        let once = normalize_rich_text_body(&raw);
        let serialized = serde_json::to_value(&once).expect("serialize blocks");
        let twice = normalize_rich_text_body(&serialized);

        assert_eq!(once, twice);
    }
}
