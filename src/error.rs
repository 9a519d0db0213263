//! 门面层错误类型
//!
//! 这些错误只在 Rust 内部流转，越过 C 边界时统一折叠为 [`OcrStatus::Error`]

use std::os::raw::c_int;
use std::path::PathBuf;
use thiserror::Error;

use ocrlite_engine::OcrError;

#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("OCR 引擎未初始化")]
    NoEngine,

    #[error("OCR 引擎模型未就绪")]
    EngineNotReady,

    #[error("{kind} 文件不存在: {path:?}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("参数无效: {0}")]
    InvalidArgument(&'static str),

    #[error("缓冲区过小: 需要 {required} 字节, 实际 {capacity} 字节")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error(transparent)]
    Engine(#[from] OcrError),

    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Panic(String),

    /// C 接口返回 kOcrError，具体原因见日志
    #[error("{0} 调用失败")]
    CallFailed(&'static str),
}

pub type FacadeResult<T> = Result<T, FacadeError>;

/// C 边界上的二值状态码
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStatus {
    Error = 0,
    Success = 1,
}

impl OcrStatus {
    pub fn code(self) -> c_int {
        self as c_int
    }
}

impl<T> From<&FacadeResult<T>> for OcrStatus {
    fn from(result: &FacadeResult<T>) -> Self {
        match result {
            Ok(_) => OcrStatus::Success,
            Err(_) => OcrStatus::Error,
        }
    }
}
