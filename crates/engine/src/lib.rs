//! OcrLite ONNX Runtime 引擎
//!
//! DBNet 检测 + AngleNet 方向分类 + CRNN 识别

mod angle_net;
mod crnn_net;
mod db_net;
mod draw;
mod error;
mod preprocess;
mod threading;
mod types;

pub use angle_net::{Angle, AngleNet};
pub use crnn_net::{CrnnNet, TextLine};
pub use db_net::{DbNet, DbParams};
pub use error::OcrError;
pub use threading::{num_thread, set_num_thread};
pub use types::*;

use image::DynamicImage;
use std::path::Path;
use std::time::Instant;

use crate::preprocess::ScaleParam;

/// 控制台日志受 `LoggerOptions::console` 控制
macro_rules! console {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.console {
            log::info!($($arg)*);
        }
    };
}

/// OCR 引擎
///
/// 先调用 [`OcrLite::init_models`] 加载模型，之后才能检测
#[derive(Default)]
pub struct OcrLite {
    db_net: Option<DbNet>,
    angle_net: Option<AngleNet>,
    crnn_net: Option<CrnnNet>,
    logger: LoggerOptions,
}

/// 检测结果及对应的文字区域裁剪图
struct Detection {
    result: OcrResult,
    part_images: Vec<DynamicImage>,
}

impl OcrLite {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置推理线程数，对之后加载的模型生效
    pub fn set_num_thread(&mut self, num_thread: usize) {
        threading::set_num_thread(num_thread);
    }

    pub fn init_logger(&mut self, options: LoggerOptions) {
        self.logger = options;
    }

    pub fn logger(&self) -> LoggerOptions {
        self.logger
    }

    /// 加载三个模型和字典，任一失败则全部不可用
    pub fn init_models(&mut self, paths: &ModelPaths) -> Result<(), OcrError> {
        self.db_net = None;
        self.angle_net = None;
        self.crnn_net = None;

        console!(self.logger, "[OCR] 加载检测模型: {:?}", paths.db_net);
        let db_net = DbNet::new(&paths.db_net)?;

        console!(self.logger, "[OCR] 加载方向分类模型: {:?}", paths.angle_net);
        let angle_net = AngleNet::new(&paths.angle_net)?;

        console!(self.logger, "[OCR] 加载识别模型: {:?}", paths.crnn_net);
        let crnn_net = CrnnNet::new(&paths.crnn_net, &paths.keys)?;

        self.db_net = Some(db_net);
        self.angle_net = Some(angle_net);
        self.crnn_net = Some(crnn_net);

        console!(self.logger, "[OCR] 引擎初始化完成");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.db_net.is_some() && self.angle_net.is_some() && self.crnn_net.is_some()
    }

    /// 识别图片文件
    ///
    /// `output_dir` 为空时不写出任何调试图片
    pub fn detect(
        &mut self,
        output_dir: &Path,
        image_path: &Path,
        params: &DetectParams,
    ) -> Result<OcrResult, OcrError> {
        let img = image::open(image_path)
            .map_err(|e| OcrError::ImageProcess(format!("打开图片失败: {}", e)))?;

        let detection = self.run(&img, params)?;

        if !output_dir.as_os_str().is_empty() {
            self.write_debug_images(output_dir, image_path, &img, &detection);
        }

        Ok(detection.result)
    }

    /// 识别内存中的图片
    pub fn detect_image(
        &mut self,
        img: &DynamicImage,
        params: &DetectParams,
    ) -> Result<OcrResult, OcrError> {
        Ok(self.run(img, params)?.result)
    }

    fn run(&mut self, img: &DynamicImage, params: &DetectParams) -> Result<Detection, OcrError> {
        let logger = self.logger;
        let (Some(db_net), Some(angle_net), Some(crnn_net)) = (
            self.db_net.as_mut(),
            self.angle_net.as_mut(),
            self.crnn_net.as_mut(),
        ) else {
            return Err(OcrError::ModelNotLoaded);
        };

        let detect_start = Instant::now();
        let (orig_w, orig_h) = (img.width(), img.height());
        let padding = params.padding.max(0) as u32;

        // 1. 补白并缩放后检测文字区域
        let padded = preprocess::make_padding(img, padding)?;
        let target = preprocess::target_side_len(orig_w, orig_h, params.max_side_len, padding)?;
        let scale = ScaleParam::new(padded.width(), padded.height(), target);
        console!(logger, "[OCR] 检测尺寸: {:?}", scale);

        let db_start = Instant::now();
        let input = preprocess::prepare_det_input(&padded, &scale);
        let db_params = DbParams {
            box_score_thresh: params.box_score_thresh,
            box_thresh: params.box_thresh,
            un_clip_ratio: params.un_clip_ratio,
        };
        let boxes: Vec<TextBox> = db_net
            .detect(input, &scale, &db_params)?
            .into_iter()
            .map(|b| remove_padding(b, padding, orig_w, orig_h))
            .collect();
        let db_net_time = elapsed_ms(db_start);
        console!(logger, "[OCR] 检测到 {} 个文字区域，耗时 {:.2} ms", boxes.len(), db_net_time);

        // 2. 方向分类
        let part_images: Vec<DynamicImage> = boxes
            .iter()
            .map(|b| preprocess::crop_text_region(img, &b.points))
            .collect();
        let angles = angle_net.get_angles(&part_images, params.do_angle, params.most_angle)?;

        // 3. 逐块识别
        let mut text_blocks = Vec::with_capacity(boxes.len());
        let blocks = boxes.iter().zip(&part_images).zip(&angles).enumerate();
        for (idx, ((text_box, part), angle)) in blocks {
            let crnn_start = Instant::now();
            let line = if angle.index == 1 {
                crnn_net.recognize(&part.rotate180())?
            } else {
                crnn_net.recognize(part)?
            };
            let crnn_time = elapsed_ms(crnn_start);

            console!(
                logger,
                "[OCR] 区域 {}: \"{}\" (得分: {:.2}, 方向: {})",
                idx,
                line.text,
                text_box.score,
                angle.index
            );

            text_blocks.push(TextBlock {
                box_point: text_box.to_points(),
                char_scores: line.char_scores,
                text: line.text,
                box_score: text_box.score,
                angle_index: angle.index,
                angle_score: angle.score,
                angle_time: angle.time,
                crnn_time,
                block_time: angle.time + crnn_time,
            });
        }

        let detect_time = elapsed_ms(detect_start);
        console!(
            logger,
            "[OCR] 识别完成，共 {} 个结果，总耗时 {:.2} ms",
            text_blocks.len(),
            detect_time
        );

        Ok(Detection {
            result: OcrResult {
                db_net_time,
                detect_time,
                text_blocks,
            },
            part_images,
        })
    }

    fn write_debug_images(
        &self,
        output_dir: &Path,
        image_path: &Path,
        img: &DynamicImage,
        detection: &Detection,
    ) {
        if self.logger.part_images {
            for (idx, part) in detection.part_images.iter().enumerate() {
                let path = draw::output_path(output_dir, image_path, &format!("-part-{}", idx));
                if let Err(e) = draw::save_image(&part.to_rgb8(), &path) {
                    log::warn!("[OCR] {}", e);
                }
            }
        }
        if self.logger.result_image {
            let canvas = draw::draw_text_blocks(img, &detection.result.text_blocks);
            let path = draw::output_path(output_dir, image_path, "-result");
            match draw::save_image(&canvas, &path) {
                Ok(()) => console!(self.logger, "[OCR] 结果图: {:?}", path),
                Err(e) => log::warn!("[OCR] {}", e),
            }
        }
    }
}

/// 从补白图坐标转换回原图坐标
fn remove_padding(mut text_box: TextBox, padding: u32, img_w: u32, img_h: u32) -> TextBox {
    let max_x = img_w.saturating_sub(1) as f32;
    let max_y = img_h.saturating_sub(1) as f32;
    for p in text_box.points.iter_mut() {
        p[0] = (p[0] - padding as f32).clamp(0.0, max_x);
        p[1] = (p[1] - padding as f32).clamp(0.0, max_y);
    }
    text_box
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_padding_clamps_to_image() {
        let text_box = TextBox {
            points: [[40.0, 60.0], [200.0, 60.0], [200.0, 80.0], [40.0, 80.0]],
            score: 0.8,
        };
        let unpadded = remove_padding(text_box, 50, 100, 100);
        assert_eq!(unpadded.points[0], [0.0, 10.0]);
        assert_eq!(unpadded.points[1], [99.0, 10.0]);
        assert_eq!(unpadded.points[2], [99.0, 30.0]);
    }

    #[test]
    fn test_detect_without_models_fails() {
        let mut engine = OcrLite::new();
        assert!(!engine.is_loaded());
        let img = DynamicImage::new_rgb8(16, 16);
        let err = engine.detect_image(&img, &DetectParams::default()).unwrap_err();
        assert!(matches!(err, OcrError::ModelNotLoaded));
    }

    #[test]
    fn test_init_logger_round_trip() {
        let mut engine = OcrLite::new();
        let options = LoggerOptions {
            console: true,
            part_images: false,
            result_image: true,
        };
        engine.init_logger(options);
        assert_eq!(engine.logger(), options);
    }
}
