mod common;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rstest::*;

use facetag::blob::{BlobStore, LocalBlobStore};
use facetag::cache::{MemoryHashStore, UrlCache};
use facetag::config::ListerOptions;
use facetag::error::Result;
use facetag::{GalleryEntry, GalleryLister};

use common::*;

/// 签名前随机等待一段时间，用于打乱任务完成的顺序
struct SlowBlobStore(Arc<LocalBlobStore>);

impl BlobStore for SlowBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.0.ensure_bucket(bucket).await
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        self.0.put(bucket, key, data, content_type).await
    }

    async fn signed_url(&self, bucket: &str, object: &str, ttl: Duration) -> Result<String> {
        let delay = rand::rng().random_range(0..30);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.0.signed_url(bucket, object, ttl).await
    }
}

fn lister<B: BlobStore>(env: &Env, blobs: Arc<B>) -> GalleryLister<MemoryHashStore, B> {
    let opts = ListerOptions::default();
    let urls = UrlCache::new(env.cache.clone(), opts.url_ttl());
    GalleryLister::new(env.store.clone(), urls, blobs, &opts)
}

/// 写入 5 个人脸，第 3 个人脸的图片不存在
async fn seed_five(env: &Env) -> Vec<i64> {
    let mut ids = vec![];
    for i in 0..5 {
        let key = format!("u1/{}.jpg", i);
        let id = if i == 2 {
            env.store.create("u1", &at(i as f32), &key).await.unwrap()
        } else {
            env.seed("u1", &at(i as f32), &key).await
        };
        ids.push(id);
    }
    ids
}

#[rstest]
#[tokio::test]
async fn missing_object_leaves_hole() {
    let env = Env::new().await;
    let ids = seed_five(&env).await;
    env.store.rename("u1", ids[0], "Alice").await.unwrap();

    let entries = lister(&env, env.blobs.clone()).list("u1", 0).await.unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries[2].is_none());

    let now = chrono::Utc::now().timestamp();
    for (i, entry) in entries.iter().enumerate().filter(|(i, _)| *i != 2) {
        let entry = entry.as_ref().unwrap();
        assert_eq!(entry.id, ids[i]);
        assert!(entry.image_url.starts_with(PUBLIC_URL));
        assert!(env.blobs.verify_signed_url(&entry.image_url, now));
    }
    assert_eq!(entries[0].as_ref().unwrap().display_name, "Alice");
    assert_eq!(entries[1].as_ref().unwrap().display_name, "");
}

#[rstest]
#[tokio::test]
async fn order_matches_rows() {
    let env = Env::new().await;
    let mut ids = vec![];
    for i in 0..20 {
        ids.push(env.seed("u1", &at(i as f32), &format!("u1/{}.jpg", i)).await);
    }

    let slow = Arc::new(SlowBlobStore(env.blobs.clone()));
    let entries = lister(&env, slow).list("u1", 0).await.unwrap();
    let listed: Vec<i64> = entries.into_iter().map(|e| e.unwrap().id).collect();
    assert_eq!(listed, ids);
}

#[rstest]
#[tokio::test]
async fn cached_url_is_reused() {
    let env = Env::new().await;
    let ids = seed_five(&env).await;

    let urls = UrlCache::new(env.cache.clone(), ListerOptions::default().url_ttl());
    urls.put("u1", ids[2], "http://cdn.test/cached.jpg").await.unwrap();

    let lister = lister(&env, env.blobs.clone());
    let entries = lister.list("u1", 0).await.unwrap();
    assert_eq!(
        entries[2],
        Some(GalleryEntry {
            id: ids[2],
            display_name: String::new(),
            image_url: "http://cdn.test/cached.jpg".to_string(),
        })
    );

    // 签名得到的链接同样会被缓存
    let first = urls.get("u1", ids[0]).await.unwrap().unwrap();
    assert_eq!(entries[0].as_ref().unwrap().image_url, first);
    let again = lister.list("u1", 0).await.unwrap();
    assert_eq!(again[0].as_ref().unwrap().image_url, first);
}

#[rstest]
#[tokio::test]
async fn filters_by_visibility() {
    let env = Env::new().await;
    let ids = seed_five(&env).await;
    env.store.set_visibility("u1", &[ids[1], ids[3]], 1).await.unwrap();

    let lister = lister(&env, env.blobs.clone());
    let hidden = lister.list("u1", 1).await.unwrap();
    assert_eq!(hidden.iter().map(|e| e.as_ref().unwrap().id).collect::<Vec<_>>(), vec![ids[1], ids[3]]);

    let shown = lister.list("u1", 0).await.unwrap();
    assert_eq!(shown.len(), 3);
    assert!(shown[1].is_none());

    assert!(lister.list("nobody", 0).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn unknown_bucket_yields_holes() {
    let env = Env::new().await;
    seed_five(&env).await;

    let opts = ListerOptions { bucket: "other".to_string(), ..Default::default() };
    let urls = UrlCache::new(env.cache.clone(), opts.url_ttl());
    let lister = GalleryLister::new(env.store.clone(), urls, env.blobs.clone(), &opts);
    let entries = lister.list("u1", 0).await.unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(Option::is_none));
}

#[rstest]
#[tokio::test]
async fn broken_url_cache_still_signs() {
    let env = Env::new().await;
    let ids = seed_five(&env).await;

    let opts = ListerOptions::default();
    let urls = UrlCache::new(Arc::new(BrokenStore), opts.url_ttl());
    let lister = GalleryLister::new(env.store.clone(), urls, env.blobs.clone(), &opts);
    let entries = lister.list("u1", 0).await.unwrap();

    assert_eq!(entries.len(), 5);
    assert!(entries[2].is_none());
    let now = chrono::Utc::now().timestamp();
    for i in [0, 1, 3, 4] {
        let entry = entries[i].as_ref().unwrap();
        assert_eq!(entry.id, ids[i]);
        assert!(env.blobs.verify_signed_url(&entry.image_url, now));
    }
}
