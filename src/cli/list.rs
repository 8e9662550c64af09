use std::sync::Arc;

use clap::Parser;

use crate::cache::{MemoryHashStore, UrlCache};
use crate::cli::{SubCommandExtend, open_blobs, open_store};
use crate::config::{BlobOptions, ListerOptions, Opts};
use crate::lister::GalleryLister;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    #[command(flatten)]
    pub lister: ListerOptions,
    #[command(flatten)]
    pub blob: BlobOptions,
    /// 用户 ID
    #[arg(short, long)]
    pub user: String,
    /// 展示类型
    #[arg(long, default_value_t = 0)]
    pub visibility: i64,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = open_store(&opts.conf_dir).await?;
        let blobs = open_blobs(&opts.conf_dir, &self.blob);
        let urls = UrlCache::new(Arc::new(MemoryHashStore::new()), self.lister.url_ttl());
        let lister = GalleryLister::new(store, urls, Arc::new(blobs), &self.lister);

        let entries = lister.list(&self.user, self.visibility).await?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        Ok(())
    }
}
