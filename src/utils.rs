use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use rand::distr::{Alphanumeric, SampleString};

use crate::error::{FaceError, Result};
use crate::extractor::Rect;

/// 将图片统一为 JPEG 编码，已经是 JPEG 的图片原样返回
pub fn to_jpeg(data: &[u8]) -> Result<Vec<u8>> {
    let format = image::guess_format(data)?;
    let img = image::load_from_memory_with_format(data, format)?;
    if format == ImageFormat::Jpeg {
        return Ok(data.to_vec());
    }
    encode_jpeg(&img)
}

/// 按人脸区域裁剪图片，四周保留 `margin` 像素边距
pub fn crop_face(data: &[u8], rect: Rect, margin: i32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let area = rect.expand_within(margin, img.width(), img.height());
    if area.is_empty() {
        return Err(FaceError::InvalidArgument(format!("人脸区域超出图片范围: {:?}", rect)));
    }
    let cropped = img.crop_imm(
        area.x0 as u32,
        area.y0 as u32,
        area.width() as u32,
        area.height() as u32,
    );
    encode_jpeg(&cropped)
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG 不支持透明通道
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)?;
    Ok(buf.into_inner())
}

/// 生成人脸图片的对象路径：`<user>/<年>/<月>/<时间戳>_<随机串>.jpg`
pub fn object_key(user_id: &str, now: DateTime<Utc>) -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 16);
    format!("{}/{}/{}_{}.jpg", user_id, now.format("%Y/%m"), now.format("%Y%m%d%H%M%S"), suffix)
}
