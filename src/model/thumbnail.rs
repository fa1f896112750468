//! 缩略图及其惰性解码的图像。

use std::sync::OnceLock;

use image::{Rgb, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 实体的缩略图。
///
/// 解码后的图像与其平均颜色都是派生数据：首次访问时计算，并缓存在实例上。
/// 两个线程同时首次解码时，两次计算的结果相同，只有先写入的那份会被保留。
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    /// 缩略图地址。
    pub url: String,
    /// 宽度（像素）。
    pub width: u32,
    /// 高度（像素）。
    pub height: u32,
    #[serde(skip)]
    image: OnceLock<RgbaImage>,
    #[serde(skip)]
    average: OnceLock<Rgb<u8>>,
}

impl Thumbnail {
    /// 创建一个尚未加载图像的缩略图。
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            image: OnceLock::new(),
            average: OnceLock::new(),
        }
    }

    /// 已解码的图像；尚未加载时返回 `None`。
    ///
    /// 通过 [`crate::Songlink::load_thumbnail`] 触发下载与解码。
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.get()
    }

    /// 解码给定的图像字节并缓存结果。
    ///
    /// 已经解码过时直接返回缓存的图像，不会再次解析 `bytes`。
    ///
    /// # 错误
    /// 字节无法被识别为受支持的图像格式时返回 `SonglinkError::ImageDecode`。
    pub fn decode(&self, bytes: &[u8]) -> Result<&RgbaImage> {
        if let Some(image) = self.image.get() {
            return Ok(image);
        }
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        Ok(self.image.get_or_init(|| decoded))
    }

    /// 图像所有像素的平均颜色（忽略透明度）。
    ///
    /// 图像尚未加载时返回 `None`。
    pub fn average_color(&self) -> Option<Rgb<u8>> {
        let image = self.image.get()?;
        Some(*self.average.get_or_init(|| average_color(image)))
    }
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("url", &self.url)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("loaded", &self.image.get().is_some())
            .finish()
    }
}

impl PartialEq for Thumbnail {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.width == other.width && self.height == other.height
    }
}

impl Eq for Thumbnail {}

/// 计算图像的平均 RGB 颜色。空图像返回黑色。
pub fn average_color(image: &RgbaImage) -> Rgb<u8> {
    let pixel_count = u64::from(image.width()) * u64::from(image.height());
    if pixel_count == 0 {
        return Rgb([0, 0, 0]);
    }

    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += u64::from(*channel);
        }
    }

    Rgb(sums.map(|sum| (sum / pixel_count) as u8))
}
