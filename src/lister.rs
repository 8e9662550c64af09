use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::blob::BlobStore;
use crate::cache::{HashStore, UrlCache};
use crate::config::ListerOptions;
use crate::db::IdentityRecord;
use crate::error::Result;
use crate::metrics;
use crate::store::GalleryStore;

/// 人脸库中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryEntry {
    pub id: i64,
    pub display_name: String,
    pub image_url: String,
}

/// 列出用户的人脸库，并为每张人脸图片生成带签名的访问链接
pub struct GalleryLister<S, B> {
    store: GalleryStore,
    urls: Arc<UrlCache<S>>,
    blobs: Arc<B>,
    bucket: String,
    url_ttl: Duration,
}

impl<S, B> GalleryLister<S, B>
where
    S: HashStore,
    B: BlobStore,
{
    pub fn new(store: GalleryStore, urls: UrlCache<S>, blobs: Arc<B>, opts: &ListerOptions) -> Self {
        Self {
            store,
            urls: Arc::new(urls),
            blobs,
            bucket: opts.bucket.clone(),
            url_ttl: opts.url_ttl(),
        }
    }

    /// 按展示类型列出人脸
    ///
    /// 返回结果与数据库中的行一一对应、顺序相同；
    /// 无法生成链接的行对应位置为 `None`，不影响其他行。
    pub async fn list(&self, user_id: &str, visibility: i64) -> Result<Vec<Option<GalleryEntry>>> {
        let rows = self.store.query_by_visibility(user_id, visibility).await?;
        debug!("用户 {} 展示类型 {} 共 {} 个人脸", user_id, visibility, rows.len());

        let mut slots: Vec<Option<GalleryEntry>> = vec![None; rows.len()];
        let mut tasks = JoinSet::new();
        for (index, row) in rows.into_iter().enumerate() {
            let urls = self.urls.clone();
            let blobs = self.blobs.clone();
            let bucket = self.bucket.clone();
            let ttl = self.url_ttl;
            tasks.spawn(async move {
                let entry = resolve_entry(&*urls, &*blobs, &bucket, ttl, row).await;
                (index, entry)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, entry)) => slots[index] = entry,
                Err(e) => error!("生成人脸链接的任务异常退出: {}", e),
            }
        }
        Ok(slots)
    }
}

async fn resolve_entry<S: HashStore, B: BlobStore>(
    urls: &UrlCache<S>,
    blobs: &B,
    bucket: &str,
    ttl: Duration,
    row: IdentityRecord,
) -> Option<GalleryEntry> {
    let image_url = resolve_url(urls, blobs, bucket, ttl, &row).await?;
    Some(GalleryEntry { id: row.id, display_name: row.display_name, image_url })
}

/// 优先使用缓存的链接，否则重新签名并写入缓存
async fn resolve_url<S: HashStore, B: BlobStore>(
    urls: &UrlCache<S>,
    blobs: &B,
    bucket: &str,
    ttl: Duration,
    row: &IdentityRecord,
) -> Option<String> {
    match urls.get(&row.user_id, row.id).await {
        Ok(Some(url)) => {
            metrics::inc_gallery_url("cache");
            return Some(url);
        }
        Ok(None) => {}
        Err(e) => warn!("读取人脸 {} 的链接缓存失败: {}", row.id, e),
    }

    let url = match blobs.signed_url(bucket, &row.image_ref, ttl).await {
        Ok(url) => url,
        Err(e) => {
            warn!("人脸 {} 的图片 {} 签名失败: {}", row.id, row.image_ref, e);
            metrics::inc_gallery_url("failed");
            return None;
        }
    };
    metrics::inc_gallery_url("signed");

    if let Err(e) = urls.put(&row.user_id, row.id, &url).await {
        warn!("缓存人脸 {} 的链接失败: {}", row.id, e);
    }
    Some(url)
}
