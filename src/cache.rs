use async_trait::async_trait;

use crate::error::Result;

/// 缓存失效接口。
///
/// webhook 处理流程通过这个 seam 调用外部的按标签 / 按路径失效 API，
/// 两个操作对同一个 key 都是幂等的。测试中可替换为记录型实现。
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate_tag(&self, tag: &str) -> Result<()>;

    async fn invalidate_path(&self, path: &str) -> Result<()>;
}

/// 默认实现：只把失效动作写进日志。
///
/// 实际的缓存层由部署环境提供，这里保留可观测性。
#[derive(Debug, Default, Clone)]
pub struct LogInvalidator;

#[async_trait]
impl CacheInvalidator for LogInvalidator {
    async fn invalidate_tag(&self, tag: &str) -> Result<()> {
        tracing::info!(tag, "invalidate cache tag");
        Ok(())
    }

    async fn invalidate_path(&self, path: &str) -> Result<()> {
        tracing::info!(path, "invalidate cache path");
        Ok(())
    }
}
