use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use crate::cache::{GalleryCache, MemoryHashStore};
use crate::cli::{SubCommandExtend, open_blobs, open_store};
use crate::config::{BlobOptions, Opts, ResolverOptions};
use crate::extractor::PrecomputedExtractor;
use crate::resolver::IdentityResolver;

#[derive(Parser, Debug, Clone)]
pub struct RecognizeCommand {
    #[command(flatten)]
    pub resolver: ResolverOptions,
    #[command(flatten)]
    pub blob: BlobOptions,
    /// 用户 ID
    #[arg(short, long)]
    pub user: String,
    /// 人脸检测结果，JSON 格式，内容为 null 表示没有人脸
    #[arg(short, long, value_name = "FILE")]
    pub detection: String,
    /// 图片路径
    pub image: String,
}

impl SubCommandExtend for RecognizeCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let extractor = PrecomputedExtractor::from_file(&self.detection)
            .with_context(|| format!("无法读取检测结果 {}", self.detection))?;
        let image = tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("无法读取图片 {}", self.image))?;

        let store = open_store(&opts.conf_dir).await?;
        let blobs = open_blobs(&opts.conf_dir, &self.blob);
        let cache = GalleryCache::new(Arc::new(MemoryHashStore::new()), self.resolver.vector_ttl());
        let resolver = IdentityResolver::new(
            Arc::new(extractor),
            cache,
            store,
            Arc::new(blobs),
            self.resolver.clone(),
        );

        let face_id = resolver.resolve(&self.user, &image).await?;
        println!("{}", json!({ "face_id": face_id }));
        Ok(())
    }
}
