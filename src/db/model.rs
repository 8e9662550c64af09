use sqlx::FromRow;

/// 人脸记录
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRecord {
    /// 人脸 ID
    pub id: i64,
    /// 所属用户
    pub user_id: String,
    /// 序列化后的描述符
    pub descriptor: Vec<u8>,
    /// 裁剪后人脸图片的对象路径
    pub image_ref: String,
    /// 用户设置的名称，默认为空
    pub display_name: String,
    /// 展示类型
    pub visibility: i64,
    /// 创建时间，Unix 时间戳
    pub created_at: i64,
}
