//! OcrLite C 接口
//!
//! 以 `extern "C"` 函数导出 OCR 引擎（DBNet 检测、AngleNet 方向分类、CRNN 识别），
//! 供 C/C++ 与其他语言通过 `include/ocr.h` 调用。识别结果以 JSON 写入调用方提供的缓冲区。

pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod output;

pub use client::OcrClient;
pub use config::{load_config, save_config, ConfigError, OcrConfig};
pub use engine::OcrEngine;
pub use error::{FacadeError, FacadeResult, OcrStatus};
pub use ffi::{
    ocr_cleanup, ocr_detect, ocr_detect2, ocr_init, ocr_last_result_len, K_OCR_ERROR,
    K_OCR_SUCCESS,
};
pub use output::DetectionPayload;

pub use ocrlite_engine::{
    DetectParams, ModelPaths, OcrResult, Point, TextBlock, DEFAULT_BOX_SCORE_THRESH,
    DEFAULT_BOX_THRESH, DEFAULT_DO_ANGLE, DEFAULT_MAX_SIDE_LEN, DEFAULT_MOST_ANGLE,
    DEFAULT_PADDING, DEFAULT_UN_CLIP_RATIO,
};
