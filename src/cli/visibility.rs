use clap::Parser;

use crate::cli::{SubCommandExtend, open_store};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct VisibilityCommand {
    /// 用户 ID
    #[arg(short, long)]
    pub user: String,
    /// 新的展示类型
    #[arg(long)]
    pub visibility: i64,
    /// 人脸 ID 列表
    #[arg(required = true)]
    pub ids: Vec<i64>,
}

impl SubCommandExtend for VisibilityCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let store = open_store(&opts.conf_dir).await?;
        let affected = store.set_visibility(&self.user, &self.ids, self.visibility).await?;
        println!("{}", affected);
        Ok(())
    }
}
