use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

pub mod crud;
pub mod model;

pub use model::*;

pub type Database = SqlitePool;

/// 连接池大小，并发识别时读写共享同一个池
pub const MAX_CONNECTIONS: u32 = 8;
/// 等待写锁的最长时间，超时后返回 `SQLITE_BUSY`
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 打开人脸库数据库并执行迁移
///
/// WAL 模式下读不阻塞写，多个识别请求同时建档时依靠 `busy_timeout` 排队。
pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    info!("打开人脸库: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .filename(filename)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    debug!("人脸库迁移完成，连接池上限 {}", MAX_CONNECTIONS);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use rstest::*;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn reopen_keeps_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("facetag.db");

        let db = init_db(&path).await.unwrap();
        crud::add_identity(&db, "u1", &[1, 2, 3], "a.jpg", 0).await.unwrap();
        db.close().await;

        // 迁移可以重复执行
        let db = init_db(&path).await.unwrap();
        assert_eq!(crud::query_all(&db, "u1").await.unwrap().len(), 1);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_do_not_conflict() {
        let dir = TempDir::new().unwrap();
        let db = init_db(dir.path().join("facetag.db")).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..32 {
            let db = db.clone();
            tasks.spawn(async move {
                crud::add_identity(&db, "u1", &[i as u8], &format!("{}.jpg", i), 0).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }
        assert_eq!(crud::query_all(&db, "u1").await.unwrap().len(), 32);
    }
}
