use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// 描述符维数，与人脸特征模型输出一致
pub const DESCRIPTOR_DIM: usize = 128;

/// 序列化格式的魔数
const MAGIC: &[u8; 2] = b"FD";
/// 当前序列化格式版本
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// 人脸特征描述符
///
/// 构造时会检查维数以及数值是否有限，之后不可修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Result<Self, DecodeError> {
        if values.len() != DESCRIPTOR_DIM {
            return Err(DecodeError::Corrupted(format!(
                "维数错误: 期望 {}, 实际 {}",
                DESCRIPTOR_DIM,
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(DecodeError::Corrupted(format!("第 {} 维不是有限值", i)));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// 欧氏距离
    pub fn euclidean(&self, other: &Descriptor) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// 序列化为 `魔数 + 版本 + bincode 正文`
    pub fn encode(&self) -> Vec<u8> {
        let body = bincode::serialize(&self.0).expect("Vec<f32> 序列化不会失败");
        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&body);
        buf
    }

    /// 反序列化，区分旧格式与损坏数据
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        // 早期版本直接存储 JSON 数组
        if bytes.first() == Some(&b'[') {
            return Err(DecodeError::StaleFormat { found: 0, expected: FORMAT_VERSION });
        }
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::Corrupted(format!("数据过短: {} 字节", bytes.len())));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(DecodeError::Corrupted("魔数不匹配".to_string()));
        }
        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(DecodeError::StaleFormat { found: version, expected: FORMAT_VERSION });
        }

        let body = &bytes[HEADER_LEN..];
        let values: Vec<f32> =
            bincode::deserialize(body).map_err(|e| DecodeError::Corrupted(e.to_string()))?;
        let consumed = bincode::serialized_size(&values)
            .map_err(|e| DecodeError::Corrupted(e.to_string()))?;
        if consumed as usize != body.len() {
            return Err(DecodeError::Corrupted("尾部存在多余数据".to_string()));
        }
        Self::new(values)
    }
}

impl TryFrom<Vec<f32>> for Descriptor {
    type Error = DecodeError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Descriptor> for Vec<f32> {
    fn from(descriptor: Descriptor) -> Self {
        descriptor.0
    }
}
