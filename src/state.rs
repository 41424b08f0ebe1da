use std::sync::Arc;

use axum::extract::FromRef;

use crate::{cache::CacheInvalidator, sanity::SanityClient, webhook::WebhookConfig};

/// 应用程序上下文
///
/// [`AppState`] 封装了 Sanity 客户端、缓存失效器和 webhook 配置，提供统一访问入口。
#[derive(Clone, FromRef)]
pub struct AppState {
    sanity: SanityClient,
    invalidator: Arc<dyn CacheInvalidator>,
    webhook: WebhookConfig,
}

impl AppState {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(
        sanity: SanityClient,
        invalidator: Arc<dyn CacheInvalidator>,
        webhook: WebhookConfig,
    ) -> Self {
        Self {
            sanity,
            invalidator,
            webhook,
        }
    }
}
