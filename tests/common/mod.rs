#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageBuffer, ImageFormat, Rgb};
use tempfile::TempDir;

use facetag::GalleryStore;
use facetag::blob::{BlobStore, FACE_BUCKET, LocalBlobStore};
use facetag::cache::{HashStore, KeyTtl, MemoryHashStore};
use facetag::descriptor::{DESCRIPTOR_DIM, Descriptor};
use facetag::error::CacheError;
use facetag::extractor::{DetectedFace, Rect};

pub const PUBLIC_URL: &str = "http://blobs.test";
pub const SIGNING_KEY: &str = "test-key";

/// 第一维为 `x`、其余为 0 的描述符，两个描述符的距离即 `x` 之差
pub fn at(x: f32) -> Descriptor {
    let mut v = vec![0.0; DESCRIPTOR_DIM];
    v[0] = x;
    Descriptor::new(v).unwrap()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 90]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// 位于 (20, 20)、边长为 `size` 的人脸
pub fn face(size: i32, descriptor: Descriptor) -> DetectedFace {
    DetectedFace { rect: Rect::new(20, 20, 20 + size, 20 + size), descriptor }
}

pub struct Env {
    pub dir: TempDir,
    pub store: GalleryStore,
    pub blobs: Arc<LocalBlobStore>,
    pub cache: Arc<MemoryHashStore>,
}

impl Env {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = GalleryStore::open(dir.path().join("facetag.db")).await.unwrap();
        let blobs = Arc::new(LocalBlobStore::new(dir.path().join("blobs"), PUBLIC_URL, SIGNING_KEY));
        Self { dir, store, blobs, cache: Arc::new(MemoryHashStore::new()) }
    }

    /// 上传一张图片并写入对应的人脸记录
    pub async fn seed(&self, user_id: &str, descriptor: &Descriptor, key: &str) -> i64 {
        self.blobs.ensure_bucket(FACE_BUCKET).await.unwrap();
        let image_ref = self.blobs.put(FACE_BUCKET, key, png(8, 8), "image/png").await.unwrap();
        self.store.create(user_id, descriptor, &image_ref).await.unwrap()
    }
}

/// 所有操作都失败的缓存
pub struct BrokenStore;

fn broken() -> CacheError {
    CacheError("connection refused".to_string())
}

impl HashStore for BrokenStore {
    async fn hgetall(&self, _key: &str) -> Result<HashMap<String, Vec<u8>>, CacheError> {
        Err(broken())
    }

    async fn hset(&self, _key: &str, _field: &str, _value: Vec<u8>) -> Result<(), CacheError> {
        Err(broken())
    }

    async fn hreplace(
        &self,
        _key: &str,
        _fields: Vec<(String, Vec<u8>)>,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(broken())
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl, CacheError> {
        Err(broken())
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(broken())
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(broken())
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(broken())
    }
}
