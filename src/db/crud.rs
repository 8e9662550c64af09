use sqlx::{Executor, QueryBuilder, Result, Sqlite, SqlitePool};

use super::IdentityRecord;

const SELECT_IDENTITY: &str = r#"
    SELECT id, user_id, descriptor, image_ref, display_name, visibility, created_at
    FROM face_identity
"#;

/// 查询用户的全部人脸
pub async fn query_all(executor: &SqlitePool, user_id: &str) -> Result<Vec<IdentityRecord>> {
    let sql = format!("{} WHERE user_id = ? ORDER BY id ASC", SELECT_IDENTITY);
    sqlx::query_as::<_, IdentityRecord>(&sql).bind(user_id).fetch_all(executor).await
}

/// 按展示类型查询用户的人脸
pub async fn query_by_visibility(
    executor: &SqlitePool,
    user_id: &str,
    visibility: i64,
) -> Result<Vec<IdentityRecord>> {
    let sql = format!("{} WHERE user_id = ? AND visibility = ? ORDER BY id ASC", SELECT_IDENTITY);
    sqlx::query_as::<_, IdentityRecord>(&sql)
        .bind(user_id)
        .bind(visibility)
        .fetch_all(executor)
        .await
}

/// 添加人脸记录，返回新记录的 ID
pub async fn add_identity<'c, E>(
    executor: E,
    user_id: &str,
    descriptor: &[u8],
    image_ref: &str,
    created_at: i64,
) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO face_identity (user_id, descriptor, image_ref, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(descriptor)
    .bind(image_ref)
    .bind(created_at)
    .fetch_one(executor)
    .await
}

/// 修改人脸名称，返回受影响的行数
pub async fn update_display_name(
    executor: &SqlitePool,
    id: i64,
    user_id: &str,
    name: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE face_identity SET display_name = ? WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(name)
    .bind(id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// 批量修改人脸展示类型，返回受影响的行数
pub async fn update_visibility(
    executor: &SqlitePool,
    ids: &[i64],
    user_id: &str,
    visibility: i64,
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE face_identity SET visibility = ");
    builder.push_bind(visibility).push(" WHERE user_id = ").push_bind(user_id).push(" AND id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}
