use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};

use crate::error::{FaceError, Result};

/// 人脸图片所在的存储桶
pub const FACE_BUCKET: &str = "face-samples";

/// 对象存储
pub trait BlobStore: Send + Sync + 'static {
    /// 确保存储桶存在，不存在时创建
    fn ensure_bucket(&self, bucket: &str) -> impl Future<Output = Result<()>> + Send;

    /// 上传对象，返回之后用于签名的对象引用
    fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// 生成有效期为 `ttl` 的签名链接
    fn signed_url(
        &self,
        bucket: &str,
        object: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// 基于本地目录的对象存储，每个桶对应 `root` 下的一个子目录
///
/// 签名为 `bucket/object:expires` 的 BLAKE3 keyed hash。
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
    key: [u8; 32],
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str, secret: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            key: blake3::derive_key("facetag blob url signature v1", secret.as_bytes()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, object: &str) -> Result<PathBuf> {
        check_bucket(bucket)?;
        let relative = Path::new(object);
        let valid = !object.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(FaceError::InvalidArgument(format!("非法的对象路径: {}", object)));
        }
        Ok(self.root.join(bucket).join(relative))
    }

    fn signature(&self, bucket: &str, object: &str, expires: i64) -> blake3::Hash {
        let message = format!("{}/{}:{}", bucket, object, expires);
        blake3::keyed_hash(&self.key, message.as_bytes())
    }

    /// 校验签名链接，`now` 为当前 Unix 时间戳
    pub fn verify_signed_url(&self, url: &str, now: i64) -> bool {
        let Some(rest) = url.strip_prefix(&self.base_url) else {
            return false;
        };
        let Some((path, query)) = rest.trim_start_matches('/').split_once('?') else {
            return false;
        };
        let Some((bucket, object)) = path.split_once('/') else {
            return false;
        };

        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = v.parse::<i64>().ok(),
                Some(("signature", v)) => signature = blake3::Hash::from_hex(v).ok(),
                _ => {}
            }
        }
        match (expires, signature) {
            // `Hash` 的比较是常数时间的
            (Some(expires), Some(signature)) => {
                expires >= now && self.signature(bucket, object, expires) == signature
            }
            _ => false,
        }
    }
}

fn check_bucket(bucket: &str) -> Result<()> {
    let valid = !bucket.is_empty()
        && bucket.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && bucket != "."
        && bucket != "..";
    if valid {
        Ok(())
    } else {
        Err(FaceError::InvalidArgument(format!("非法的存储桶名称: {}", bucket)))
    }
}

impl BlobStore for LocalBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        check_bucket(bucket)?;
        let dir = self.root.join(bucket);
        if !tokio::fs::try_exists(&dir).await? {
            info!("创建存储桶: {}", dir.display());
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let path = self.object_path(bucket, key)?;
        if !tokio::fs::try_exists(self.root.join(bucket)).await? {
            return Err(FaceError::NotFound(format!("存储桶 {}", bucket)));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("上传对象 {}/{} ({}, {} 字节)", bucket, key, content_type, data.len());
        tokio::fs::write(&path, data).await?;
        Ok(key.to_owned())
    }

    async fn signed_url(&self, bucket: &str, object: &str, ttl: Duration) -> Result<String> {
        let path = self.object_path(bucket, object)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(FaceError::NotFound(format!("对象 {}/{}", bucket, object)));
        }
        let expires = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| Utc::now().timestamp().checked_add(secs))
            .ok_or_else(|| FaceError::InvalidArgument(format!("签名有效期超出范围: {:?}", ttl)))?;
        let signature = self.signature(bucket, object, expires);
        Ok(format!(
            "{}/{}/{}?expires={}&signature={}",
            self.base_url,
            bucket,
            object,
            expires,
            signature.to_hex()
        ))
    }
}
