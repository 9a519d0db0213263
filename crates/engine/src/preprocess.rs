//! 图像预处理模块
//!
//! 补白、缩放、归一化以及文字区域裁剪

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, Array4};

use crate::error::OcrError;

/// 检测模型输入尺寸需为 32 的倍数
pub const DET_SIZE_ALIGN: u32 = 32;

/// 方向分类模型的输入尺寸
pub const ANGLE_IMAGE_WIDTH: u32 = 192;
pub const ANGLE_IMAGE_HEIGHT: u32 = 32;

/// 识别模型的输入高度
pub const CRNN_IMAGE_HEIGHT: u32 = 32;

/// DBNet 归一化参数: (pixel - mean) * norm
const DB_MEAN: [f32; 3] = [0.485 * 255.0, 0.456 * 255.0, 0.406 * 255.0];
const DB_NORM: [f32; 3] = [1.0 / 0.229 / 255.0, 1.0 / 0.224 / 255.0, 1.0 / 0.225 / 255.0];

/// AngleNet / CRNN 归一化参数
const REC_MEAN: [f32; 3] = [127.5, 127.5, 127.5];
const REC_NORM: [f32; 3] = [1.0 / 127.5, 1.0 / 127.5, 1.0 / 127.5];

/// 检测输入的缩放参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParam {
    pub src_width: u32,
    pub src_height: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    pub ratio_width: f32,
    pub ratio_height: f32,
}

impl ScaleParam {
    /// 按目标长边计算缩放参数，输出尺寸对齐到 32 的倍数
    pub fn new(src_width: u32, src_height: u32, target_size: u32) -> Self {
        let max_side = src_width.max(src_height).max(1) as f32;
        let ratio = target_size as f32 / max_side;

        let dst_width = align_down((src_width as f32 * ratio) as u32);
        let dst_height = align_down((src_height as f32 * ratio) as u32);

        Self {
            src_width,
            src_height,
            dst_width,
            dst_height,
            ratio_width: dst_width as f32 / src_width.max(1) as f32,
            ratio_height: dst_height as f32 / src_height.max(1) as f32,
        }
    }
}

fn align_down(value: u32) -> u32 {
    (value / DET_SIZE_ALIGN * DET_SIZE_ALIGN).max(DET_SIZE_ALIGN)
}

/// 计算检测时的目标长边
///
/// `max_side_len <= 0` 或大于原图长边时使用原图长边，再加上两侧补白
pub fn target_side_len(
    orig_w: u32,
    orig_h: u32,
    max_side_len: i32,
    padding: u32,
) -> Result<u32, OcrError> {
    let origin_max_side = orig_w.max(orig_h);
    let resize = if max_side_len <= 0 || max_side_len as u32 > origin_max_side {
        origin_max_side
    } else {
        max_side_len as u32
    };
    padded_len(resize, padding)
}

/// 加上两侧补白后的边长
fn padded_len(len: u32, padding: u32) -> Result<u32, OcrError> {
    padding
        .checked_mul(2)
        .and_then(|both| len.checked_add(both))
        .ok_or_else(|| OcrError::ImageProcess(format!("补白 {} 像素超出尺寸上限", padding)))
}

/// 在图像四周补白
pub fn make_padding(img: &DynamicImage, padding: u32) -> Result<RgbImage, OcrError> {
    let rgb = img.to_rgb8();
    if padding == 0 {
        return Ok(rgb);
    }
    let width = padded_len(rgb.width(), padding)?;
    let height = padded_len(rgb.height(), padding)?;
    let mut padded: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([255, 255, 255]));
    image::imageops::overlay(&mut padded, &rgb, padding as i64, padding as i64);
    Ok(padded)
}

/// 为检测模型准备输入
pub fn prepare_det_input(img: &RgbImage, scale: &ScaleParam) -> Array4<f32> {
    let resized = image::imageops::resize(
        img,
        scale.dst_width,
        scale.dst_height,
        image::imageops::FilterType::Triangle,
    );
    normalize_image(&resized, DB_MEAN, DB_NORM).insert_axis(ndarray::Axis(0))
}

/// 为方向分类模型准备输入: 按高度缩放，宽度不足时右侧填充
pub fn prepare_angle_input(img: &DynamicImage) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width().max(1), rgb.height().max(1));

    let ratio = ANGLE_IMAGE_HEIGHT as f32 / h as f32;
    let new_w = ((w as f32 * ratio) as u32).clamp(1, ANGLE_IMAGE_WIDTH);

    let resized = image::imageops::resize(
        &rgb,
        new_w,
        ANGLE_IMAGE_HEIGHT,
        image::imageops::FilterType::Triangle,
    );

    let mut padded: RgbImage =
        ImageBuffer::from_pixel(ANGLE_IMAGE_WIDTH, ANGLE_IMAGE_HEIGHT, Rgb([127, 127, 127]));
    image::imageops::overlay(&mut padded, &resized, 0, 0);

    normalize_image(&padded, REC_MEAN, REC_NORM).insert_axis(ndarray::Axis(0))
}

/// 为识别模型准备输入: 固定高度，宽度按比例
pub fn prepare_crnn_input(img: &DynamicImage) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width().max(1), rgb.height().max(1));

    let ratio = CRNN_IMAGE_HEIGHT as f32 / h as f32;
    let new_w = ((w as f32 * ratio).round() as u32).max(1);

    let resized = image::imageops::resize(
        &rgb,
        new_w,
        CRNN_IMAGE_HEIGHT,
        image::imageops::FilterType::Triangle,
    );

    normalize_image(&resized, REC_MEAN, REC_NORM).insert_axis(ndarray::Axis(0))
}

/// 将 RGB 图像归一化为 CHW 格式的 tensor (BGR 顺序)
fn normalize_image(img: &RgbImage, mean: [f32; 3], norm: [f32; 3]) -> Array3<f32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut tensor = Array3::<f32>::zeros((3, h, w));

    for y in 0..h {
        for x in 0..w {
            let pixel = img.get_pixel(x as u32, y as u32);
            tensor[[0, y, x]] = (pixel[2] as f32 - mean[0]) * norm[0]; // B
            tensor[[1, y, x]] = (pixel[1] as f32 - mean[1]) * norm[1]; // G
            tensor[[2, y, x]] = (pixel[0] as f32 - mean[2]) * norm[2]; // R
        }
    }

    tensor
}

/// 裁剪检测到的文本区域
pub fn crop_text_region(img: &DynamicImage, box_points: &[[f32; 2]; 4]) -> DynamicImage {
    let min_x = box_points.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min).max(0.0) as u32;
    let min_y = box_points.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min).max(0.0) as u32;
    let max_x = box_points.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max).max(0.0) as u32;
    let max_y = box_points.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max).max(0.0) as u32;

    let x0 = min_x.min(img.width().saturating_sub(1));
    let y0 = min_y.min(img.height().saturating_sub(1));
    let x1 = max_x.min(img.width().saturating_sub(1));
    let y1 = max_y.min(img.height().saturating_sub(1));

    let crop_w = (x1.saturating_sub(x0)).max(1);
    let crop_h = (y1.saturating_sub(y0)).max(1);

    img.crop_imm(x0, y0, crop_w, crop_h)
}
