use std::path::Path;

use chrono::Utc;
use log::info;

use crate::db::{self, Database, IdentityRecord, crud};
use crate::descriptor::Descriptor;
use crate::error::{FaceError, Result};

/// 人脸库的持久化存储，是人脸数据的权威来源
#[derive(Clone)]
pub struct GalleryStore {
    db: Database,
}

impl GalleryStore {
    pub async fn open(filename: impl AsRef<Path>) -> Result<Self> {
        let db = db::init_db(filename).await?;
        Ok(Self { db })
    }

    pub fn from_pool(db: Database) -> Self {
        Self { db }
    }

    pub async fn query_all(&self, user_id: &str) -> Result<Vec<IdentityRecord>> {
        Ok(crud::query_all(&self.db, user_id).await?)
    }

    pub async fn query_by_visibility(
        &self,
        user_id: &str,
        visibility: i64,
    ) -> Result<Vec<IdentityRecord>> {
        Ok(crud::query_by_visibility(&self.db, user_id, visibility).await?)
    }

    /// 保存新的人脸，返回数据库分配的 ID
    pub async fn create(
        &self,
        user_id: &str,
        descriptor: &Descriptor,
        image_ref: &str,
    ) -> Result<i64> {
        let id = crud::add_identity(
            &self.db,
            user_id,
            &descriptor.encode(),
            image_ref,
            Utc::now().timestamp(),
        )
        .await?;
        Ok(id)
    }

    pub async fn update_display_name(&self, id: i64, user_id: &str, name: &str) -> Result<u64> {
        Ok(crud::update_display_name(&self.db, id, user_id, name).await?)
    }

    pub async fn update_visibility(
        &self,
        ids: &[i64],
        user_id: &str,
        visibility: i64,
    ) -> Result<u64> {
        Ok(crud::update_visibility(&self.db, ids, user_id, visibility).await?)
    }

    /// 修改人脸名称，人脸不存在或不属于该用户时返回 `NotFound`
    pub async fn rename(&self, user_id: &str, id: i64, name: &str) -> Result<()> {
        if self.update_display_name(id, user_id, name).await? == 0 {
            return Err(FaceError::NotFound(format!("用户 {} 的人脸 {}", user_id, id)));
        }
        info!("人脸 {} 重命名为 {:?}", id, name);
        Ok(())
    }

    /// 修改人脸展示类型，返回受影响的数量，没有任何人脸被修改时返回 `NotFound`
    pub async fn set_visibility(&self, user_id: &str, ids: &[i64], visibility: i64) -> Result<u64> {
        let affected = self.update_visibility(ids, user_id, visibility).await?;
        if affected == 0 {
            return Err(FaceError::NotFound(format!("用户 {} 的人脸 {:?}", user_id, ids)));
        }
        info!("{} 个人脸的展示类型修改为 {}", affected, visibility);
        Ok(affected)
    }
}
