//! 引擎共享类型定义

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PADDING: i32 = 50;
pub const DEFAULT_MAX_SIDE_LEN: i32 = 1024;
pub const DEFAULT_BOX_SCORE_THRESH: f32 = 0.6;
pub const DEFAULT_BOX_THRESH: f32 = 0.3;
pub const DEFAULT_UN_CLIP_RATIO: f32 = 2.0;
pub const DEFAULT_DO_ANGLE: bool = true;
pub const DEFAULT_MOST_ANGLE: bool = true;

/// 整数像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// 检测参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectParams {
    /// 图像四周补白像素
    pub padding: i32,
    /// 长边上限，<= 0 表示使用原图尺寸
    pub max_side_len: i32,
    /// 文字框平均得分阈值
    pub box_score_thresh: f32,
    /// 概率图二值化阈值
    pub box_thresh: f32,
    /// 文字框扩张系数
    pub un_clip_ratio: f32,
    /// 是否执行方向分类
    pub do_angle: bool,
    /// 是否统一为出现最多的方向
    pub most_angle: bool,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            max_side_len: DEFAULT_MAX_SIDE_LEN,
            box_score_thresh: DEFAULT_BOX_SCORE_THRESH,
            box_thresh: DEFAULT_BOX_THRESH,
            un_clip_ratio: DEFAULT_UN_CLIP_RATIO,
            do_angle: DEFAULT_DO_ANGLE,
            most_angle: DEFAULT_MOST_ANGLE,
        }
    }
}

/// 单个文字块的识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    /// 四个角点，顺时针，从左上开始
    pub box_point: Vec<Point>,
    pub char_scores: Vec<f32>,
    pub text: String,
    pub box_score: f32,
    /// 方向分类结果，未执行分类时为 -1
    pub angle_index: i32,
    pub angle_score: f32,
    pub angle_time: f64,
    pub crnn_time: f64,
    pub block_time: f64,
}

/// 一次检测的完整结果（耗时单位: 毫秒）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub db_net_time: f64,
    pub detect_time: f64,
    pub text_blocks: Vec<TextBlock>,
}

impl OcrResult {
    /// 按检测顺序列出识别文字
    pub fn texts(&self) -> Vec<String> {
        self.text_blocks.iter().map(|b| b.text.clone()).collect()
    }
}

/// 模型文件路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPaths {
    pub db_net: PathBuf,
    pub angle_net: PathBuf,
    pub crnn_net: PathBuf,
    pub keys: PathBuf,
}

impl ModelPaths {
    pub fn new(
        db_net: impl Into<PathBuf>,
        angle_net: impl Into<PathBuf>,
        crnn_net: impl Into<PathBuf>,
        keys: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db_net: db_net.into(),
            angle_net: angle_net.into(),
            crnn_net: crnn_net.into(),
            keys: keys.into(),
        }
    }

    /// 以 (名称, 路径) 形式遍历四个文件
    pub fn entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("dbNet", self.db_net.as_path()),
            ("angleNet", self.angle_net.as_path()),
            ("crnnNet", self.crnn_net.as_path()),
            ("keys", self.keys.as_path()),
        ]
    }
}

/// 日志与调试图片输出开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerOptions {
    /// 输出到控制台
    pub console: bool,
    /// 保存每个文字区域的裁剪图
    pub part_images: bool,
    /// 保存带框选标注的结果图
    pub result_image: bool,
}

/// 检测到的文字框（浮点坐标）
#[derive(Debug, Clone)]
pub struct TextBox {
    pub points: [[f32; 2]; 4],
    pub score: f32,
}

impl TextBox {
    pub fn to_points(&self) -> Vec<Point> {
        self.points
            .iter()
            .map(|p| Point {
                x: p[0].round() as i32,
                y: p[1].round() as i32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_block_uses_camel_case_keys() {
        let block = TextBlock {
            box_point: vec![Point { x: 1, y: 2 }; 4],
            char_scores: vec![0.5],
            text: "a".to_string(),
            box_score: 0.9,
            angle_index: 0,
            angle_score: 0.8,
            angle_time: 1.0,
            crnn_time: 2.0,
            block_time: 3.0,
        };
        let value = serde_json::to_value(&block).unwrap();
        for key in [
            "boxPoint",
            "charScores",
            "text",
            "boxScore",
            "angleIndex",
            "angleScore",
            "angleTime",
            "crnnTime",
            "blockTime",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["boxPoint"][0]["x"], 1);
    }

    #[test]
    fn test_detect_params_default_values() {
        let params = DetectParams::default();
        assert_eq!(params.padding, 50);
        assert_eq!(params.max_side_len, 1024);
        assert!((params.box_score_thresh - 0.6).abs() < f32::EPSILON);
        assert!((params.box_thresh - 0.3).abs() < f32::EPSILON);
        assert!((params.un_clip_ratio - 2.0).abs() < f32::EPSILON);
        assert!(params.do_angle);
        assert!(params.most_angle);
    }

    #[test]
    fn test_text_box_rounds_points() {
        let text_box = TextBox {
            points: [[1.4, 1.6], [10.5, 1.6], [10.5, 8.2], [1.4, 8.2]],
            score: 0.7,
        };
        let points = text_box.to_points();
        assert_eq!(points[0], Point { x: 1, y: 2 });
        assert_eq!(points[2], Point { x: 11, y: 8 });
    }
}
