use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use ocrlite_engine::{DetectParams, ModelPaths};

/// 线程数环境变量
pub const THREADS_ENV: &str = "OCRLITE_THREADS";

/// 默认结果缓冲区 10 KiB
pub const DEFAULT_BUFFER_LEN: usize = 10 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrConfig {
    // ============ 推理 ============
    /// 推理线程数，为空时读取环境变量或 CPU 数
    pub thread_count: Option<usize>,

    // ============ 模型文件 ============
    /// 模型目录
    pub models_dir: PathBuf,
    pub db_net_file: String,
    pub angle_net_file: String,
    pub crnn_net_file: String,
    pub keys_file: String,

    // ============ 识别 ============
    /// 结果缓冲区初始大小
    pub buffer_len: usize,
    pub params: DetectParams,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            thread_count: None,
            models_dir: PathBuf::from("./models"),
            db_net_file: "dbnet.onnx".to_string(),
            angle_net_file: "angle_net.onnx".to_string(),
            crnn_net_file: "crnn_lite_lstm.onnx".to_string(),
            keys_file: "keys.txt".to_string(),
            buffer_len: DEFAULT_BUFFER_LEN,
            params: DetectParams::default(),
        }
    }
}

impl OcrConfig {
    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths::new(
            self.models_dir.join(&self.db_net_file),
            self.models_dir.join(&self.angle_net_file),
            self.models_dir.join(&self.crnn_net_file),
            self.models_dir.join(&self.keys_file),
        )
    }

    /// 显式配置 → `OCRLITE_THREADS` → 可用 CPU 数
    pub fn resolve_thread_count(&self) -> usize {
        let env = std::env::var(THREADS_ENV).ok();
        resolve_thread_count(self.thread_count, env.as_deref())
    }
}

fn resolve_thread_count(explicit: Option<usize>, env: Option<&str>) -> usize {
    explicit
        .or_else(|| env.and_then(|v| v.trim().parse::<usize>().ok()))
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 读取配置，文件不存在时返回默认值
pub fn load_config(path: &Path) -> Result<OcrConfig, ConfigError> {
    if !path.exists() {
        return Ok(OcrConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_config(path: &Path, config: &OcrConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_paths() {
        let paths = OcrConfig::default().model_paths();
        assert_eq!(paths.db_net, Path::new("./models/dbnet.onnx"));
        assert_eq!(paths.angle_net, Path::new("./models/angle_net.onnx"));
        assert_eq!(paths.crnn_net, Path::new("./models/crnn_lite_lstm.onnx"));
        assert_eq!(paths.keys, Path::new("./models/keys.txt"));
    }

    #[test]
    fn test_resolve_thread_count_order() {
        assert_eq!(resolve_thread_count(Some(3), Some("8")), 3);
        assert_eq!(resolve_thread_count(None, Some(" 6 ")), 6);
        assert!(resolve_thread_count(None, Some("abc")) >= 1);
        assert!(resolve_thread_count(Some(0), None) >= 1);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, OcrConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ocr.json");
        let mut config = OcrConfig::default();
        config.thread_count = Some(2);
        config.models_dir = PathBuf::from("/opt/ocr/models");
        config.params.do_angle = false;

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.json");
        fs::write(&path, r#"{"bufferLen": 2048, "params": {"maxSideLen": 960}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.buffer_len, 2048);
        assert_eq!(config.params.max_side_len, 960);
        assert_eq!(config.params.padding, 50);
        assert_eq!(config.keys_file, "keys.txt");
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Json(_))));
    }
}
