use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{Level, debug, info, log_enabled, warn};
use rayon::prelude::*;
use tokio::task::spawn_blocking;

use crate::blob::BlobStore;
use crate::cache::{GalleryCache, HashStore};
use crate::classifier::{Gallery, classify_threshold, nearest};
use crate::config::ResolverOptions;
use crate::db::IdentityRecord;
use crate::descriptor::Descriptor;
use crate::error::{DecodeError, FaceError, LoadError, Result};
use crate::extractor::{DetectedFace, FeatureExtractor, is_face_valid};
use crate::metrics::{self, Outcome};
use crate::store::GalleryStore;
use crate::utils;

/// 将图片中的人脸解析为用户维度的人脸 ID
///
/// 查询顺序为：特征缓存 → 数据库（并回填缓存）→ 创建新人脸。
/// 同一用户的并发请求不会被串行化。
pub struct IdentityResolver<X, S, B> {
    extractor: Arc<X>,
    cache: GalleryCache<S>,
    store: GalleryStore,
    blobs: Arc<B>,
    opts: ResolverOptions,
}

impl<X, S, B> IdentityResolver<X, S, B>
where
    X: FeatureExtractor,
    S: HashStore,
    B: BlobStore,
{
    pub fn new(
        extractor: Arc<X>,
        cache: GalleryCache<S>,
        store: GalleryStore,
        blobs: Arc<B>,
        opts: ResolverOptions,
    ) -> Self {
        Self { extractor, cache, store, blobs, opts }
    }

    /// 识别图片中的人脸
    ///
    /// 返回匹配到的或新建的人脸 ID；没有检测到人脸、或人脸过小无法建档时返回 `None`。
    pub async fn resolve(&self, user_id: &str, image: &[u8]) -> Result<Option<i64>> {
        if user_id.is_empty() {
            return Err(FaceError::InvalidArgument("用户 ID 不能为空".to_string()));
        }
        let start = Instant::now();

        let extractor = self.extractor.clone();
        let data = image.to_vec();
        let detected = spawn_blocking(move || {
            let jpeg = utils::to_jpeg(&data)?;
            extractor.detect(&jpeg)
        })
        .await??;

        let Some(face) = detected else {
            debug!("用户 {} 的图片中未检测到人脸", user_id);
            metrics::observe_resolve(Outcome::NoFace, start.elapsed().as_secs_f32());
            return Ok(None);
        };

        let gallery = self.load_gallery(user_id).await?;
        let distance = |a: &Descriptor, b: &Descriptor| self.extractor.distance(a, b);
        if let Some(id) = classify_threshold(&gallery, &face.descriptor, self.opts.threshold, distance) {
            info!("用户 {} 匹配到人脸 {}", user_id, id);
            metrics::observe_resolve(Outcome::Matched, start.elapsed().as_secs_f32());
            return Ok(Some(id));
        }
        if log_enabled!(Level::Debug) {
            if let Some((id, d)) = nearest(&gallery, &face.descriptor, distance) {
                debug!("用户 {} 最近的人脸 {} 距离 {:.4}，超出阈值", user_id, id, d);
            }
        }

        let created = self.create_identity(user_id, image, face).await?;
        let outcome = if created.is_some() { Outcome::Created } else { Outcome::Rejected };
        metrics::observe_resolve(outcome, start.elapsed().as_secs_f32());
        Ok(created)
    }

    /// 先查缓存，未命中时从数据库加载并回填缓存
    async fn load_gallery(&self, user_id: &str) -> Result<Gallery> {
        match self.cache.load(user_id).await {
            Ok(Some(gallery)) => {
                metrics::inc_gallery_cache("hit");
                return Ok(gallery);
            }
            Ok(None) => metrics::inc_gallery_cache("miss"),
            Err(LoadError::Backend(e)) => {
                warn!("读取用户 {} 的人脸缓存失败，回退到数据库: {}", user_id, e);
                metrics::inc_gallery_cache("error");
            }
            Err(LoadError::Decode(e @ DecodeError::StaleFormat { .. })) => {
                // 旧格式的缓存会在回填时被整体覆盖
                warn!("用户 {} 的人脸缓存格式过期，重新加载: {}", user_id, e);
                metrics::inc_gallery_cache("stale");
            }
            Err(LoadError::Decode(e)) => return Err(e.into()),
        }

        let rows = self.store.query_all(user_id).await?;
        if rows.is_empty() {
            return Ok(Gallery::default());
        }
        let gallery = decode_rows(rows).await?;

        if let Err(e) = self.cache.replace(user_id, &gallery).await {
            warn!("回填用户 {} 的人脸缓存失败: {}", user_id, e);
        }
        Ok(gallery)
    }

    /// 保存新的人脸：裁剪图片上传到对象存储，写入数据库后追加到缓存
    async fn create_identity(
        &self,
        user_id: &str,
        image: &[u8],
        face: DetectedFace,
    ) -> Result<Option<i64>> {
        if !is_face_valid(&face.rect, self.opts.min_face_size) {
            debug!(
                "人脸尺寸 {}x{} 过小，不创建新人脸",
                face.rect.width(),
                face.rect.height()
            );
            return Ok(None);
        }

        let data = image.to_vec();
        let (rect, margin) = (face.rect, self.opts.crop_margin);
        let cropped = spawn_blocking(move || utils::crop_face(&data, rect, margin)).await??;

        let key = utils::object_key(user_id, Utc::now());
        self.blobs.ensure_bucket(&self.opts.bucket).await?;
        let image_ref = self.blobs.put(&self.opts.bucket, &key, cropped, "image/jpeg").await?;

        let id = self.store.create(user_id, &face.descriptor, &image_ref).await?;
        info!("用户 {} 新建人脸 {}: {}", user_id, id, image_ref);

        if let Err(e) = self.cache.append(user_id, id, &face.descriptor).await {
            warn!("追加人脸 {} 到缓存失败: {}", id, e);
        }
        Ok(Some(id))
    }
}

/// 并发解码数据库中的描述符
///
/// 结果按行号写入预先分配的位置，不需要加锁；任意一行解码失败则整体失败。
pub async fn decode_rows(rows: Vec<IdentityRecord>) -> Result<Gallery> {
    let entries = spawn_blocking(move || {
        rows.par_iter()
            .map(|row| Descriptor::decode(&row.descriptor).map(|d| (row.id, d)))
            .collect::<Result<Vec<_>, DecodeError>>()
    })
    .await??;
    Gallery::from_entries(entries)
}
