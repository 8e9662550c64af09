use std::collections::HashSet;

use crate::descriptor::Descriptor;
use crate::error::{FaceError, Result};

/// 默认匹配阈值，取决于所用的特征模型
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// 单次分类使用的人脸库，描述符与 ID 一一对应
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    descriptors: Vec<Descriptor>,
    ids: Vec<i64>,
}

impl Gallery {
    pub fn new(descriptors: Vec<Descriptor>, ids: Vec<i64>) -> Result<Self> {
        if descriptors.len() != ids.len() {
            return Err(FaceError::InvalidArgument(format!(
                "描述符数量 {} 与 ID 数量 {} 不一致",
                descriptors.len(),
                ids.len()
            )));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(FaceError::InvalidArgument(format!("重复的人脸 ID: {}", dup)));
        }
        Ok(Self { descriptors, ids })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (i64, Descriptor)>) -> Result<Self> {
        let (ids, descriptors) = entries.into_iter().unzip();
        Self::new(descriptors, ids)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &Descriptor)> {
        self.ids.iter().copied().zip(self.descriptors.iter())
    }
}

/// 返回距离最近的样本 ID 及其距离
///
/// 距离相同时保留先出现的样本，NaN 距离会被忽略。
pub fn nearest<F>(gallery: &Gallery, query: &Descriptor, distance: F) -> Option<(i64, f32)>
where
    F: Fn(&Descriptor, &Descriptor) -> f32,
{
    let mut best: Option<(usize, f32)> = None;
    for (i, sample) in gallery.descriptors.iter().enumerate() {
        let d = distance(query, sample);
        if d.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, min)| d < min) {
            best = Some((i, d));
        }
    }
    best.map(|(i, d)| (gallery.ids[i], d))
}

/// 最近邻距离不超过 `threshold` 时返回其 ID，否则返回 `None`
pub fn classify_threshold<F>(
    gallery: &Gallery,
    query: &Descriptor,
    threshold: f32,
    distance: F,
) -> Option<i64>
where
    F: Fn(&Descriptor, &Descriptor) -> f32,
{
    nearest(gallery, query, distance).filter(|&(_, d)| d <= threshold).map(|(id, _)| id)
}
