use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

const FILTER: FilterType = FilterType::Triangle;

/// Padding in pixels per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Padding {
    pub(crate) top: u32,
    pub(crate) bottom: u32,
    pub(crate) left: u32,
    pub(crate) right: u32,
}

pub(crate) fn solid(width: u32, height: u32, fill: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width.max(1), height.max(1), fill)
}

/// Resizes to exactly `width` x `height`; both are clamped to at least one pixel.
pub(crate) fn resize_exact(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let width = width.max(1);
    let height = height.max(1);
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FILTER)
}

pub(crate) fn resize_to_height(image: &RgbImage, height: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let width = (w as u64 * height as u64 / h.max(1) as u64) as u32;
    resize_exact(image, width, height)
}

pub(crate) fn resize_to_width(image: &RgbImage, width: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let height = (h as u64 * width as u64 / w.max(1) as u64) as u32;
    resize_exact(image, width, height)
}

pub(crate) fn pad(image: &RgbImage, padding: Padding, fill: Rgb<u8>) -> RgbImage {
    if padding == Padding::default() {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let mut canvas = RgbImage::from_pixel(
        w + padding.left + padding.right,
        h + padding.top + padding.bottom,
        fill,
    );
    imageops::replace(&mut canvas, image, padding.left as i64, padding.top as i64);
    canvas
}

/// Places images side by side; every part must share the first part's height.
pub(crate) fn hconcat(parts: &[RgbImage]) -> RgbImage {
    let height = parts.first().map(|part| part.height()).unwrap_or(1);
    let width: u32 = parts.iter().map(|part| part.width()).sum();
    let mut canvas = RgbImage::new(width.max(1), height);
    let mut x = 0i64;
    for part in parts {
        imageops::replace(&mut canvas, part, x, 0);
        x += part.width() as i64;
    }
    canvas
}

/// Stacks images top to bottom; every part must share the first part's width.
pub(crate) fn vconcat(parts: &[RgbImage]) -> RgbImage {
    let width = parts.first().map(|part| part.width()).unwrap_or(1);
    let height: u32 = parts.iter().map(|part| part.height()).sum();
    let mut canvas = RgbImage::new(width, height.max(1));
    let mut y = 0i64;
    for part in parts {
        imageops::replace(&mut canvas, part, 0, y);
        y += part.height() as i64;
    }
    canvas
}

pub(crate) fn rotate90_clockwise(image: &RgbImage) -> RgbImage {
    imageops::rotate90(image)
}

pub(crate) fn rotate270_clockwise(image: &RgbImage) -> RgbImage {
    imageops::rotate270(image)
}
