//! 文字方向分类模块
//!
//! 判断文字区域是否旋转了 180 度

use image::DynamicImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;

use crate::error::OcrError;
use crate::preprocess;
use crate::threading::apply_session_threads;

/// 方向分类结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angle {
    /// 0: 正向, 1: 旋转 180 度, -1: 未分类
    pub index: i32,
    pub score: f32,
    /// 毫秒
    pub time: f64,
}

impl Angle {
    pub fn unclassified() -> Self {
        Self {
            index: -1,
            score: 0.0,
            time: 0.0,
        }
    }
}

/// 方向分类器
pub struct AngleNet {
    session: Session,
}

impl AngleNet {
    pub fn new(model_path: &Path) -> Result<Self, OcrError> {
        let builder = Session::builder()
            .map_err(|e: ort::Error| OcrError::ModelLoad(e.to_string()))?;
        let builder = apply_session_threads(builder)
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| OcrError::ModelLoad(format!("加载方向分类模型失败: {}", e)))?;

        Ok(Self { session })
    }

    /// 逐个分类文字区域，`most_angle` 时统一为多数方向
    pub fn get_angles(
        &mut self,
        part_images: &[DynamicImage],
        do_angle: bool,
        most_angle: bool,
    ) -> Result<Vec<Angle>, OcrError> {
        if !do_angle {
            return Ok(vec![Angle::unclassified(); part_images.len()]);
        }

        let mut angles = Vec::with_capacity(part_images.len());
        for img in part_images {
            let start = Instant::now();
            let (index, score) = self.classify(img)?;
            angles.push(Angle {
                index,
                score,
                time: start.elapsed().as_secs_f64() * 1000.0,
            });
        }

        if most_angle {
            apply_most_angle(&mut angles);
        }
        Ok(angles)
    }

    fn classify(&mut self, img: &DynamicImage) -> Result<(i32, f32), OcrError> {
        let input = preprocess::prepare_angle_input(img);
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| OcrError::Inference(e.to_string()))?;

        let outputs = self.session
            .run(ort::inputs![input_tensor])
            .map_err(|e| OcrError::Inference(format!("方向分类推理失败: {}", e)))?;

        let output_view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(e.to_string()))?;
        let scores: Vec<f32> = output_view.iter().copied().collect();
        drop(outputs);

        Ok(arg_max(&scores))
    }
}

fn arg_max(scores: &[f32]) -> (i32, f32) {
    let mut max_idx = 0usize;
    let mut max_score = f32::NEG_INFINITY;
    for (idx, &score) in scores.iter().enumerate() {
        if score > max_score {
            max_score = score;
            max_idx = idx;
        }
    }
    if scores.is_empty() {
        (0, 0.0)
    } else {
        (max_idx as i32, max_score)
    }
}

/// 超过半数区域判为旋转时全部视为旋转，否则全部视为正向
fn apply_most_angle(angles: &mut [Angle]) {
    if angles.is_empty() {
        return;
    }
    let rotated = angles.iter().filter(|a| a.index == 1).count();
    let half = angles.len() as f32 / 2.0;
    let most_index = if (rotated as f32) < half { 0 } else { 1 };

    log::debug!("[OCR] 多数方向: {} ({}/{})", most_index, rotated, angles.len());
    for angle in angles.iter_mut() {
        angle.index = most_index;
    }
}
