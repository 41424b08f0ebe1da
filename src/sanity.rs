mod client;
mod mapper;
mod rich_text;

pub use self::{
    client::{FetchConfig, SanityClient, SanityConfig},
    mapper::{ArticleDetail, ArticleSummary, map_article_detail, map_article_summary},
    rich_text::{ImageAsset, RichTextBlock, Span, normalize_rich_text_body},
};
