//! 两级缓存中的热数据层
//!
//! 缓存只用于加速，数据库始终是权威来源。后端不可用时调用方应当回退到数据库。

mod gallery;
mod memory;
mod url;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

pub use self::gallery::*;
pub use self::memory::*;
pub use self::url::*;
use crate::error::CacheError;

/// 键的过期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// 键不存在
    Missing,
    /// 键存在但没有过期时间
    Persistent,
    /// 剩余存活时间
    Expires(Duration),
}

/// 以键划分、每个键独立过期的哈希/字符串存储，语义与 Redis 一致
pub trait HashStore: Send + Sync + 'static {
    /// 读取哈希的全部字段，键不存在时返回空表
    fn hgetall(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<HashMap<String, Vec<u8>>, CacheError>> + Send;

    /// 写入哈希的单个字段，不改变过期时间
    fn hset(
        &self,
        key: &str,
        field: &str,
        value: Vec<u8>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// 原子地用 `fields` 整体替换哈希，并设置过期时间
    fn hreplace(
        &self,
        key: &str,
        fields: Vec<(String, Vec<u8>)>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    fn ttl(&self, key: &str) -> impl Future<Output = Result<KeyTtl, CacheError>> + Send;

    /// 设置过期时间，键不存在时返回 `false`
    fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    fn set_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}
