use clap::Parser;

use crate::cli::{SubCommandExtend, open_store};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct RenameCommand {
    /// 用户 ID
    #[arg(short, long)]
    pub user: String,
    /// 人脸 ID
    pub id: i64,
    /// 新的名称
    pub name: String,
}

impl SubCommandExtend for RenameCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = open_store(&opts.conf_dir).await?;
        store.rename(&self.user, self.id, &self.name).await?;
        Ok(())
    }
}
