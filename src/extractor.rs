use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::{FaceError, Result};

/// 人脸最小宽高，单位为原图像素
pub const MIN_FACE_SIZE: i32 = 50;

/// 半开区间矩形 `[x0, x1) × [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> i32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// 向四周扩展 `margin` 像素，并裁剪到 `width × height` 的图像范围内
    pub fn expand_within(&self, margin: i32, width: u32, height: u32) -> Rect {
        let (w, h) = (width.min(i32::MAX as u32) as i32, height.min(i32::MAX as u32) as i32);
        Rect {
            x0: self.x0.saturating_sub(margin).max(0),
            y0: self.y0.saturating_sub(margin).max(0),
            x1: self.x1.saturating_add(margin).min(w),
            y1: self.y1.saturating_add(margin).min(h),
        }
    }
}

/// 人脸尺寸过小时特征不可靠，不应创建新的人脸记录
pub fn is_face_valid(rect: &Rect, min_size: i32) -> bool {
    rect.width() >= min_size && rect.height() >= min_size
}

/// 检测到的单张人脸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub rect: Rect,
    pub descriptor: Descriptor,
}

/// 人脸特征提取器
///
/// 实现方需要保证 `detect` 返回的坐标基于输入图片的原始尺寸。
pub trait FeatureExtractor: Send + Sync + 'static {
    /// 检测图片中的单张人脸，未检测到时返回 `None`
    fn detect(&self, jpeg: &[u8]) -> Result<Option<DetectedFace>>;

    /// 特征空间中的距离
    fn distance(&self, a: &Descriptor, b: &Descriptor) -> f32 {
        a.euclidean(b)
    }
}

/// 使用外部模型预先输出的检测结果
///
/// 文件内容为 `DetectedFace` 的 JSON，或 `null` 表示没有人脸。
#[derive(Debug, Clone)]
pub struct PrecomputedExtractor {
    face: Option<DetectedFace>,
}

impl PrecomputedExtractor {
    pub fn new(face: Option<DetectedFace>) -> Self {
        Self { face }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let face = serde_json::from_str(json).map_err(|e| FaceError::Extractor(e.to_string()))?;
        Ok(Self { face })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl FeatureExtractor for PrecomputedExtractor {
    fn detect(&self, _jpeg: &[u8]) -> Result<Option<DetectedFace>> {
        Ok(self.face.clone())
    }
}
