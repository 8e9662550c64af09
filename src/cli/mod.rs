mod list;
mod recognize;
mod rename;
mod visibility;

pub use list::*;
pub use recognize::*;
pub use rename::*;
pub use visibility::*;

use log::debug;

use crate::blob::LocalBlobStore;
use crate::config::{BlobOptions, ConfDir, Opts};
use crate::error::Result;
use crate::store::GalleryStore;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 打开配置目录下的数据库，目录不存在时自动创建
async fn open_store(conf_dir: &ConfDir) -> Result<GalleryStore> {
    tokio::fs::create_dir_all(conf_dir.path()).await?;
    GalleryStore::open(conf_dir.database()).await
}

fn open_blobs(conf_dir: &ConfDir, opts: &BlobOptions) -> LocalBlobStore {
    debug!("对象存储目录: {}", conf_dir.blobs().display());
    LocalBlobStore::new(conf_dir.blobs(), &opts.public_url, &opts.signing_key)
}
