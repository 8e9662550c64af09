use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::blob::FACE_BUCKET;
use crate::cache::{DEFAULT_URL_TTL, DEFAULT_VECTOR_TTL};
use crate::classifier::DEFAULT_THRESHOLD;
use crate::cli::*;
use crate::extractor::MIN_FACE_SIZE;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "facetag", "facetag").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

/// 裁剪人脸图片时的默认边距
pub const DEFAULT_CROP_MARGIN: i32 = 20;
/// 缓存及签名有效期的上限，一年
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

#[derive(Parser, Debug, Clone)]
pub struct ResolverOptions {
    /// 判定为同一人的最大特征距离，与特征模型相关
    #[arg(long, value_name = "DISTANCE", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f32,
    /// 创建新人脸时人脸的最小宽高
    #[arg(long, value_name = "PIXELS", default_value_t = MIN_FACE_SIZE)]
    pub min_face_size: i32,
    /// 裁剪人脸图片时四周保留的边距
    #[arg(long, value_name = "PIXELS", default_value_t = DEFAULT_CROP_MARGIN)]
    pub crop_margin: i32,
    /// 人脸特征缓存的过期时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_VECTOR_TTL.as_secs(), value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS))]
    pub vector_ttl: u64,
    /// 人脸图片所在的存储桶
    #[arg(long, value_name = "NAME", default_value = FACE_BUCKET)]
    pub bucket: String,
}

impl ResolverOptions {
    pub fn vector_ttl(&self) -> Duration {
        Duration::from_secs(self.vector_ttl)
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_face_size: MIN_FACE_SIZE,
            crop_margin: DEFAULT_CROP_MARGIN,
            vector_ttl: DEFAULT_VECTOR_TTL.as_secs(),
            bucket: FACE_BUCKET.to_string(),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ListerOptions {
    /// 签名链接的有效期及其缓存时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_URL_TTL.as_secs(), value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS))]
    pub url_ttl: u64,
    /// 人脸图片所在的存储桶
    #[arg(long, value_name = "NAME", default_value = FACE_BUCKET)]
    pub bucket: String,
}

impl ListerOptions {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl)
    }
}

impl Default for ListerOptions {
    fn default() -> Self {
        Self { url_ttl: DEFAULT_URL_TTL.as_secs(), bucket: FACE_BUCKET.to_string() }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct BlobOptions {
    /// 签名链接的访问地址前缀
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:9000")]
    pub public_url: String,
    /// 签名链接使用的密钥
    #[arg(long, value_name = "SECRET", env = "FACETAG_SIGNING_KEY", default_value = "facetag")]
    pub signing_key: String,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "facetag", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// facetag 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 命令结束后将 Prometheus 指标输出到标准错误
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 识别图片中的人脸，返回人脸 ID
    Recognize(RecognizeCommand),
    /// 列出用户的人脸库
    List(ListCommand),
    /// 修改人脸名称
    Rename(RenameCommand),
    /// 修改人脸展示类型
    Visibility(VisibilityCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("facetag.db")
    }

    /// 返回对象存储根目录
    pub fn blobs(&self) -> PathBuf {
        self.path.join("blobs")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
