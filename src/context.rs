//! 引擎生命周期与检测流程
//!
//! 进程内唯一的引擎实例由 [`OcrContext`] 持有，C 接口层通过全局互斥锁访问它

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ocrlite_engine::{DetectParams, LoggerOptions, ModelPaths, OcrLite};

use crate::engine::OcrEngine;
use crate::error::{FacadeError, FacadeResult};
use crate::logging;
use crate::output;

/// 全局引擎槽位
static CONTEXT: Mutex<OcrContext> = Mutex::new(OcrContext::new());

/// 锁定全局上下文，锁中毒时继续使用内部状态
pub fn global() -> MutexGuard<'static, OcrContext> {
    CONTEXT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// initialize 打开控制台日志与结果图，关闭区域裁剪图
const INIT_LOGGER: LoggerOptions = LoggerOptions {
    console: true,
    part_images: false,
    result_image: true,
};

pub struct OcrContext {
    engine: Option<Box<dyn OcrEngine>>,
    last_result_len: usize,
}

impl Default for OcrContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrContext {
    pub const fn new() -> Self {
        Self {
            engine: None,
            last_result_len: 0,
        }
    }

    /// 使用 ONNX 引擎初始化
    pub fn initialize(&mut self, thread_count: usize, paths: &ModelPaths) -> FacadeResult<()> {
        self.initialize_with(thread_count, paths, || -> Box<dyn OcrEngine> {
            Box::new(OcrLite::new())
        })
    }

    /// 校验文件后创建（或复用）引擎并加载模型
    ///
    /// 模型加载失败只记录日志，仍返回成功；之后的检测会因模型未就绪而失败
    pub fn initialize_with<F>(
        &mut self,
        thread_count: usize,
        paths: &ModelPaths,
        create: F,
    ) -> FacadeResult<()>
    where
        F: FnOnce() -> Box<dyn OcrEngine>,
    {
        log::info!(
            "[OCR] ocr_init numThread={}, dbNetPath={:?}, anglePath={:?}, crnnPath={:?}, keyPath={:?}",
            thread_count,
            paths.db_net,
            paths.angle_net,
            paths.crnn_net,
            paths.keys
        );
        ensure_files_exist(paths)?;

        let thread_count = thread_count.max(1);
        if let Ok(available) = std::thread::available_parallelism() {
            if thread_count > available.get() {
                log::warn!(
                    "[OCR] 线程数 {} 超过可用 CPU 数 {}",
                    thread_count,
                    available.get()
                );
            }
        }

        logging::init_console();
        let reused = self.engine.is_some();
        let engine = self.engine.get_or_insert_with(create);
        engine.set_thread_count(thread_count);
        engine.init_logger(INIT_LOGGER);
        if reused {
            log::info!("[OCR] 复用已有引擎实例");
        }

        if let Err(e) = engine.load_models(paths) {
            log::error!("[OCR] {}", e);
        }
        Ok(())
    }

    /// 释放引擎，未初始化时无操作
    pub fn cleanup(&mut self) {
        if self.engine.take().is_some() {
            log::info!("[OCR] 引擎已释放");
        }
        self.last_result_len = 0;
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// 最近一次序列化结果的字节数（包括因缓冲区不足而被拒绝的结果）
    pub fn last_result_len(&self) -> usize {
        self.last_result_len
    }

    /// 识别图片并返回序列化后的 JSON 字节
    pub fn detect(&mut self, image_path: &Path, params: &DetectParams) -> FacadeResult<Vec<u8>> {
        self.last_result_len = 0;

        let engine = self.engine.as_mut().ok_or(FacadeError::NoEngine)?;
        if !engine.is_ready() {
            return Err(FacadeError::EngineNotReady);
        }
        if !image_path.exists() {
            return Err(FacadeError::MissingFile {
                kind: "image",
                path: image_path.to_path_buf(),
            });
        }

        log::info!(
            "[OCR] padding({}),maxSideLen({}),boxScoreThresh({}),boxThresh({}),unClipRatio({}),doAngle({}),mostAngle({})",
            params.padding,
            params.max_side_len,
            params.box_score_thresh,
            params.box_thresh,
            params.un_clip_ratio,
            params.do_angle,
            params.most_angle
        );

        let result = engine.detect(Path::new(""), image_path, params)?;
        let bytes = output::serialize_result(result)?;
        self.last_result_len = bytes.len();
        Ok(bytes)
    }

    /// 识别图片并写入 `out`，返回写入的字节数
    pub fn detect_into(
        &mut self,
        image_path: &Path,
        params: &DetectParams,
        out: &mut [u8],
    ) -> FacadeResult<usize> {
        let bytes = self.detect(image_path, params)?;
        output::write_to_buffer(&bytes, out)
    }
}

fn ensure_files_exist(paths: &ModelPaths) -> FacadeResult<()> {
    for (kind, path) in paths.entries() {
        if !path.exists() {
            log::warn!("[OCR] invalid file path: {} {:?}", kind, path);
            return Err(FacadeError::MissingFile {
                kind,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
