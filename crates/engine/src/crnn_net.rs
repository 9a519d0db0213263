//! 文字识别模块
//!
//! 使用 CRNN 模型识别检测到的文字区域

use image::DynamicImage;
use ndarray::ArrayViewD;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use crate::error::OcrError;
use crate::preprocess;
use crate::threading::apply_session_threads;

/// 文字识别器
pub struct CrnnNet {
    session: Session,
    keys: Vec<String>,
}

/// 识别结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub char_scores: Vec<f32>,
}

impl CrnnNet {
    /// 从 ONNX 模型文件和字典创建识别器
    pub fn new(model_path: &Path, keys_path: &Path) -> Result<Self, OcrError> {
        let builder = Session::builder()
            .map_err(|e: ort::Error| OcrError::ModelLoad(e.to_string()))?;
        let builder = apply_session_threads(builder)
            .map_err(|e| OcrError::ModelLoad(e.to_string()))?;
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| OcrError::ModelLoad(format!("加载识别模型失败: {}", e)))?;

        let keys = load_keys(keys_path)?;
        log::info!("[OCR] 加载字典: {} 个字符", keys.len());

        Ok(Self { session, keys })
    }

    /// 识别单个文字区域
    pub fn recognize(&mut self, img: &DynamicImage) -> Result<TextLine, OcrError> {
        let input = preprocess::prepare_crnn_input(img);
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| OcrError::Inference(e.to_string()))?;

        let outputs = self.session
            .run(ort::inputs![input_tensor])
            .map_err(|e| OcrError::Inference(format!("识别推理失败: {}", e)))?;

        let output_view = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(e.to_string()))?;
        let output_owned = output_view.to_owned();
        drop(outputs);

        decode_ctc(&output_owned.view(), &self.keys)
    }
}

/// CTC 贪心解码
///
/// 支持 `[1, T, C]` 与 `[T, 1, C]` 两种输出布局，类别 0 为空白
pub(crate) fn decode_ctc(output: &ArrayViewD<f32>, keys: &[String]) -> Result<TextLine, OcrError> {
    let shape = output.shape();
    if shape.len() != 3 {
        return Err(OcrError::Inference(format!("意外的输出形状: {:?}", shape)));
    }
    let time_major = shape[0] != 1;
    let (seq_len, num_classes) = if time_major {
        (shape[0], shape[2])
    } else {
        (shape[1], shape[2])
    };

    let mut line = TextLine::default();
    let mut last_idx: Option<usize> = None;

    for t in 0..seq_len {
        let mut max_prob = f32::NEG_INFINITY;
        let mut max_idx = 0;

        for c in 0..num_classes {
            let prob = if time_major { output[[t, 0, c]] } else { output[[0, t, c]] };
            if prob > max_prob {
                max_prob = prob;
                max_idx = c;
            }
        }

        if max_idx != 0 && Some(max_idx) != last_idx {
            if let Some(key) = keys.get(max_idx - 1) {
                line.text.push_str(key);
                line.char_scores.push(max_prob);
            }
        }
        last_idx = Some(max_idx);
    }

    Ok(line)
}

/// 加载字典，每行一个字符，末尾追加空格类别
fn load_keys(path: &Path) -> Result<Vec<String>, OcrError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| OcrError::ModelLoad(format!("加载字典失败: {}", e)))?;
    let mut keys: Vec<String> = content
        .lines()
        .map(|s| s.trim_end_matches('\r').to_string())
        .collect();
    if keys.is_empty() {
        return Err(OcrError::ModelLoad("字典为空".to_string()));
    }
    keys.push(" ".to_string());
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::io::Write;

    fn keys() -> Vec<String> {
        ["a", "b", "c", " "].iter().map(|s| s.to_string()).collect()
    }

    fn one_hot(seq: &[usize], num_classes: usize, time_major: bool) -> Array3<f32> {
        let shape = if time_major {
            (seq.len(), 1, num_classes)
        } else {
            (1, seq.len(), num_classes)
        };
        let mut out = Array3::<f32>::from_elem(shape, 0.01);
        for (t, &c) in seq.iter().enumerate() {
            if time_major {
                out[[t, 0, c]] = 0.9;
            } else {
                out[[0, t, c]] = 0.9;
            }
        }
        out
    }

    #[test]
    fn test_decode_ctc_collapses_repeats_and_blanks() {
        let output = one_hot(&[1, 1, 0, 1, 2, 0, 3], 5, false);
        let line = decode_ctc(&output.into_dyn().view(), &keys()).unwrap();
        assert_eq!(line.text, "aabc");
        assert_eq!(line.char_scores.len(), 4);
        assert!((line.char_scores[0] - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_decode_ctc_time_major_layout() {
        let output = one_hot(&[2, 0, 4, 3], 5, true);
        let line = decode_ctc(&output.into_dyn().view(), &keys()).unwrap();
        assert_eq!(line.text, "b c");
    }

    #[test]
    fn test_decode_ctc_ignores_out_of_range_class() {
        let output = one_hot(&[1, 6], 7, false);
        let line = decode_ctc(&output.into_dyn().view(), &keys()).unwrap();
        assert_eq!(line.text, "a");
        assert_eq!(line.char_scores.len(), 1);
    }

    #[test]
    fn test_load_keys_appends_space() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "中").unwrap();
        writeln!(file, "文").unwrap();
        let keys = load_keys(file.path()).unwrap();
        assert_eq!(keys, vec!["中", "文", " "]);
    }

    #[test]
    fn test_load_keys_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(load_keys(file.path()), Err(OcrError::ModelLoad(_))));
    }
}
