use thiserror::Error;

/// 描述符解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 数据来自旧版本的序列化格式
    #[error("描述符格式版本不匹配: 期望 v{expected}, 实际 v{found}")]
    StaleFormat { found: u8, expected: u8 },
    /// 数据已损坏
    #[error("描述符数据损坏: {0}")]
    Corrupted(String),
}

/// 缓存后端不可用
#[derive(Debug, Error)]
#[error("缓存后端错误: {0}")]
pub struct CacheError(pub String);

/// 从缓存加载人脸库时的错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Backend(#[from] CacheError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("数据库错误: {0}")]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("图片处理失败: {0}")]
    Image(#[from] image::ImageError),
    #[error("对象存储错误: {0}")]
    Blob(#[from] std::io::Error),
    #[error("特征提取失败: {0}")]
    Extractor(String),
    #[error("记录不存在: {0}")]
    NotFound(String),
    #[error("参数无效: {0}")]
    InvalidArgument(String),
    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = FaceError> = std::result::Result<T, E>;
