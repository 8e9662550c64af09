use std::sync::Arc;
use std::time::Duration;

use super::HashStore;
use crate::error::CacheError;

/// 人脸图片签名链接缓存键前缀
pub const URL_KEY_PREFIX: &str = "face:samples:";
/// 签名链接缓存默认过期时间，与链接有效期一致
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(24 * 3600);

/// 按 `(用户, 人脸)` 缓存签名链接，与人脸特征缓存相互独立
pub struct UrlCache<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: HashStore> UrlCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(user_id: &str, id: i64) -> String {
        format!("{}{}:{}", URL_KEY_PREFIX, user_id, id)
    }

    pub async fn get(&self, user_id: &str, id: i64) -> Result<Option<String>, CacheError> {
        let value = self.store.get(&Self::key(user_id, id)).await?;
        // 无法解析的值视为未命中，随后会被新链接覆盖
        Ok(value.and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    pub async fn put(&self, user_id: &str, id: i64, url: &str) -> Result<(), CacheError> {
        self.store.set_ex(&Self::key(user_id, id), url.as_bytes().to_vec(), self.ttl).await
    }
}
