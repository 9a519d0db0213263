//! 调试图片输出

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::{Path, PathBuf};

use crate::error::OcrError;
use crate::types::TextBlock;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// 在原图上绘制文字框
pub fn draw_text_blocks(img: &DynamicImage, blocks: &[TextBlock]) -> RgbImage {
    let mut canvas = img.to_rgb8();
    for block in blocks {
        let points = &block.box_point;
        for i in 0..points.len() {
            let from = points[i];
            let to = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut canvas,
                (from.x as f32, from.y as f32),
                (to.x as f32, to.y as f32),
                BOX_COLOR,
            );
        }
    }
    canvas
}

/// `<output_dir>/<stem><suffix>.jpg`
pub fn output_path(output_dir: &Path, image_path: &Path, suffix: &str) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    output_dir.join(format!("{}{}.jpg", stem, suffix))
}

pub fn save_image(img: &RgbImage, path: &Path) -> Result<(), OcrError> {
    img.save(path)
        .map_err(|e| OcrError::ImageProcess(format!("保存图片失败 {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;
    use image::ImageBuffer;

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/tmp/out"), Path::new("/data/scan.png"), "-result");
        assert_eq!(path, PathBuf::from("/tmp/out/scan-result.jpg"));
    }

    #[test]
    fn test_draw_text_blocks_marks_corners() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 20, Rgb([0, 0, 0])));
        let block = TextBlock {
            box_point: vec![
                Point { x: 2, y: 2 },
                Point { x: 15, y: 2 },
                Point { x: 15, y: 10 },
                Point { x: 2, y: 10 },
            ],
            char_scores: Vec::new(),
            text: String::new(),
            box_score: 0.9,
            angle_index: -1,
            angle_score: 0.0,
            angle_time: 0.0,
            crnn_time: 0.0,
            block_time: 0.0,
        };
        let canvas = draw_text_blocks(&img, &[block]);
        assert_eq!(canvas.get_pixel(2, 2), &BOX_COLOR);
        assert_eq!(canvas.get_pixel(8, 10), &BOX_COLOR);
        assert_eq!(canvas.get_pixel(8, 6), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_save_image_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img: RgbImage = ImageBuffer::from_pixel(8, 8, Rgb([10, 20, 30]));
        save_image(&img, &path).unwrap();
        assert!(path.exists());
    }
}
