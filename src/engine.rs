//! OCR 引擎 trait 定义

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use ocrlite_engine::{DetectParams, LoggerOptions, ModelPaths, OcrError, OcrLite, OcrResult};

/// 门面层调用的引擎接口
pub trait OcrEngine: Send {
    /// 设置推理线程数
    fn set_thread_count(&mut self, num_thread: usize);

    /// 配置控制台日志、区域裁剪图和结果图输出
    fn init_logger(&mut self, options: LoggerOptions);

    /// 加载模型和字典
    fn load_models(&mut self, paths: &ModelPaths) -> Result<(), OcrError>;

    /// 模型是否已加载
    fn is_ready(&self) -> bool;

    /// 识别图片，`output_dir` 为空时不输出调试图片
    fn detect(
        &mut self,
        output_dir: &Path,
        image_path: &Path,
        params: &DetectParams,
    ) -> Result<OcrResult, OcrError>;
}

impl OcrEngine for OcrLite {
    fn set_thread_count(&mut self, num_thread: usize) {
        self.set_num_thread(num_thread);
    }

    fn init_logger(&mut self, options: LoggerOptions) {
        OcrLite::init_logger(self, options);
    }

    fn load_models(&mut self, paths: &ModelPaths) -> Result<(), OcrError> {
        // ONNX Runtime 动态库缺失时会 panic
        panic::catch_unwind(AssertUnwindSafe(|| self.init_models(paths)))
            .unwrap_or_else(|payload| Err(OcrError::ModelLoad(panic_message(payload.as_ref()))))
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }

    fn detect(
        &mut self,
        output_dir: &Path,
        image_path: &Path,
        params: &DetectParams,
    ) -> Result<OcrResult, OcrError> {
        OcrLite::detect(self, output_dir, image_path, params)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
