//! 文字检测模块
//!
//! 使用 DBNet (Differentiable Binarization) 模型检测文字区域

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use ndarray::{Array2, Array4, ArrayViewD};
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use crate::error::OcrError;
use crate::preprocess::ScaleParam;
use crate::threading::apply_session_threads;
use crate::types::TextBox;

/// 文字框最短边下限（扩张前）
const MIN_SIZE: f32 = 3.0;
/// 文字框最短边下限（扩张后）
const MIN_UNCLIPPED_SIZE: f32 = 5.0;

/// 检测后处理参数
#[derive(Debug, Clone, Copy)]
pub struct DbParams {
    pub box_score_thresh: f32,
    pub box_thresh: f32,
    pub un_clip_ratio: f32,
}

/// 文字检测器
pub struct DbNet {
    session: Session,
}

impl DbNet {
    /// 从 ONNX 模型文件创建检测器
    pub fn new(model_path: &Path) -> Result<Self, OcrError> {
        let builder = Session::builder()
            .map_err(|e: ort::Error| OcrError::ModelLoad(e.to_string()))?;
        let builder = apply_session_threads(builder)
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| OcrError::ModelLoad(format!("加载检测模型失败: {}", e)))?;

        Ok(Self { session })
    }

    /// 检测图像中的文字区域，返回缩放前（补白图）坐标系下的文字框
    pub fn detect(
        &mut self,
        input: Array4<f32>,
        scale: &ScaleParam,
        params: &DbParams,
    ) -> Result<Vec<TextBox>, OcrError> {
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| OcrError::Inference(e.to_string()))?;

        let outputs = self.session
            .run(ort::inputs![input_tensor])
            .map_err(|e| OcrError::Inference(format!("检测推理失败: {}", e)))?;

        // 复制数据以避免借用冲突
        let output_view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(e.to_string()))?;
        let output_owned = output_view.to_owned();
        drop(outputs);

        post_process(&output_owned.view(), scale, params)
    }
}

/// 将概率图转换为文字框
pub(crate) fn post_process(
    output: &ArrayViewD<f32>,
    scale: &ScaleParam,
    params: &DbParams,
) -> Result<Vec<TextBox>, OcrError> {
    let shape = output.shape();
    let prob_map = match shape.len() {
        4 => output.slice(ndarray::s![0, 0, .., ..]).to_owned(),
        3 => output.slice(ndarray::s![0, .., ..]).to_owned(),
        _ => return Err(OcrError::Inference(format!("意外的输出形状: {:?}", shape))),
    };

    let (h, w) = prob_map.dim();
    let mut binary = GrayImage::new(w as u32, h as u32);
    for ((y, x), &val) in prob_map.indexed_iter() {
        if val > params.box_thresh {
            binary.put_pixel(x as u32, y as u32, Luma([255]));
        }
    }
    let dilated = imageproc::morphology::dilate(&binary, Norm::LInf, 1);

    Ok(find_boxes(&dilated, &prob_map, scale, params))
}

fn find_boxes(
    binary: &GrayImage,
    prob_map: &Array2<f32>,
    scale: &ScaleParam,
    params: &DbParams,
) -> Vec<TextBox> {
    let (w, h) = (binary.width() as usize, binary.height() as usize);
    let mut visited = Array2::<bool>::from_elem((h, w), false);
    let mut boxes = Vec::new();

    for start_y in 0..h {
        for start_x in 0..w {
            if binary.get_pixel(start_x as u32, start_y as u32)[0] != 255
                || visited[[start_y, start_x]]
            {
                continue;
            }

            let mut min_x = start_x;
            let mut max_x = start_x;
            let mut min_y = start_y;
            let mut max_y = start_y;
            let mut score_sum = 0.0f32;
            let mut count = 0;
            let mut queue = vec![(start_x, start_y)];
            visited[[start_y, start_x]] = true;

            while let Some((x, y)) = queue.pop() {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                score_sum += prob_map[[y, x]];
                count += 1;

                for (dx, dy) in &[(0i32, -1i32), (0, 1), (-1, 0), (1, 0)] {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx >= 0 && nx < w as i32 && ny >= 0 && ny < h as i32 {
                        let (nx, ny) = (nx as usize, ny as usize);
                        if binary.get_pixel(nx as u32, ny as u32)[0] == 255 && !visited[[ny, nx]] {
                            visited[[ny, nx]] = true;
                            queue.push((nx, ny));
                        }
                    }
                }
            }

            let box_w = (max_x - min_x + 1) as f32;
            let box_h = (max_y - min_y + 1) as f32;
            if box_w.min(box_h) < MIN_SIZE {
                continue;
            }
            let avg_score = score_sum / count as f32;
            if avg_score < params.box_score_thresh {
                continue;
            }

            // 按 area * ratio / perimeter 向外扩张
            let distance = box_w * box_h * params.un_clip_ratio / (2.0 * (box_w + box_h));
            let x1 = (min_x as f32 - distance).max(0.0);
            let y1 = (min_y as f32 - distance).max(0.0);
            let x2 = (max_x as f32 + distance).min(w as f32 - 1.0);
            let y2 = (max_y as f32 + distance).min(h as f32 - 1.0);
            if (x2 - x1).min(y2 - y1) < MIN_UNCLIPPED_SIZE {
                continue;
            }

            let (sx, sy) = (scale.ratio_width, scale.ratio_height);
            boxes.push(TextBox {
                points: [
                    [x1 / sx, y1 / sy],
                    [x2 / sx, y1 / sy],
                    [x2 / sx, y2 / sy],
                    [x1 / sx, y2 / sy],
                ],
                score: avg_score,
            });
        }
    }

    boxes.sort_by(|a, b| {
        a.points[0][1]
            .partial_cmp(&b.points[0][1])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.points[0][0]
                    .partial_cmp(&b.points[0][0])
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    boxes
}
