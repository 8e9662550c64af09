use std::sync::Arc;
use std::time::Duration;

use log::debug;

use super::{HashStore, KeyTtl};
use crate::classifier::Gallery;
use crate::descriptor::Descriptor;
use crate::error::{CacheError, DecodeError, LoadError};

/// 人脸特征缓存键前缀
pub const VECTOR_KEY_PREFIX: &str = "face:vectors:";
/// 人脸特征缓存默认过期时间
pub const DEFAULT_VECTOR_TTL: Duration = Duration::from_secs(3600);

/// 按用户划分的人脸特征缓存，每个用户对应一个哈希：`人脸 ID => 描述符`
pub struct GalleryCache<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> Clone for GalleryCache<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), ttl: self.ttl }
    }
}

impl<S: HashStore> GalleryCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(user_id: &str) -> String {
        format!("{}{}", VECTOR_KEY_PREFIX, user_id)
    }

    /// 加载用户的人脸库，缓存为空时返回 `None`
    ///
    /// 任意一条记录无法解码都会导致整体失败，而不是跳过该记录。
    pub async fn load(&self, user_id: &str) -> Result<Option<Gallery>, LoadError> {
        let entries = self.store.hgetall(&Self::key(user_id)).await?;
        if entries.is_empty() {
            return Ok(None);
        }

        let mut ids = Vec::with_capacity(entries.len());
        let mut descriptors = Vec::with_capacity(entries.len());
        for (field, bytes) in entries {
            let id = field
                .parse::<i64>()
                .map_err(|_| DecodeError::Corrupted(format!("无效的人脸 ID: {:?}", field)))?;
            descriptors.push(Descriptor::decode(&bytes)?);
            ids.push(id);
        }

        debug!("缓存命中: 用户 {} 共 {} 个人脸", user_id, ids.len());
        // 哈希字段天然唯一，长度也一致
        let gallery = Gallery::new(descriptors, ids)
            .map_err(|e| DecodeError::Corrupted(e.to_string()))?;
        Ok(Some(gallery))
    }

    /// 用 `gallery` 整体覆盖用户缓存，并重新设置过期时间
    pub async fn replace(&self, user_id: &str, gallery: &Gallery) -> Result<(), CacheError> {
        self.replace_with_ttl(user_id, gallery, self.ttl).await
    }

    pub async fn replace_with_ttl(
        &self,
        user_id: &str,
        gallery: &Gallery,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let fields = gallery.iter().map(|(id, d)| (id.to_string(), d.encode())).collect();
        self.store.hreplace(&Self::key(user_id), fields, ttl).await
    }

    /// 追加一个人脸，键没有过期时间时补上默认过期时间
    pub async fn append(
        &self,
        user_id: &str,
        id: i64,
        descriptor: &Descriptor,
    ) -> Result<(), CacheError> {
        let key = Self::key(user_id);
        self.store.hset(&key, &id.to_string(), descriptor.encode()).await?;
        if !matches!(self.store.ttl(&key).await?, KeyTtl::Expires(_)) {
            self.store.expire(&key, self.ttl).await?;
        }
        Ok(())
    }
}
