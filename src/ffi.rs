//! C 接口
//!
//! 与 `include/ocr.h` 一一对应。所有函数都不会把 panic 传播给调用方，
//! 失败原因只写入日志，返回值只有 `kOcrError` / `kOcrSuccess` 两种

use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use ocrlite_engine::{
    DetectParams, ModelPaths, DEFAULT_BOX_SCORE_THRESH, DEFAULT_BOX_THRESH, DEFAULT_DO_ANGLE,
    DEFAULT_MAX_SIDE_LEN, DEFAULT_MOST_ANGLE, DEFAULT_PADDING, DEFAULT_UN_CLIP_RATIO,
};

use crate::context;
use crate::engine::panic_message;
use crate::error::{FacadeError, FacadeResult, OcrStatus};
use crate::output;

pub const K_OCR_ERROR: c_int = OcrStatus::Error as c_int;
pub const K_OCR_SUCCESS: c_int = OcrStatus::Success as c_int;

/// 执行 `f` 并折叠为状态码
fn guarded<F>(name: &str, f: F) -> c_int
where
    F: FnOnce() -> FacadeResult<()>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(FacadeError::Panic(panic_message(payload.as_ref()))));
    if let Err(e) = &result {
        log::warn!("[OCR] {} 失败: {}", name, e);
    }
    OcrStatus::from(&result).code()
}

/// 将 C 字符串转换为路径
///
/// # Safety
/// `ptr` 为空或指向以 NUL 结尾的字符串
unsafe fn path_from_ptr(ptr: *const c_char, name: &'static str) -> FacadeResult<PathBuf> {
    if ptr.is_null() {
        return Err(FacadeError::InvalidArgument(name));
    }
    let bytes = CStr::from_ptr(ptr).to_bytes();

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
    }
    #[cfg(not(unix))]
    {
        std::str::from_utf8(bytes)
            .map(PathBuf::from)
            .map_err(|_| FacadeError::InvalidArgument(name))
    }
}

/// 初始化 OCR
///
/// 四个文件任一不存在时返回 `kOcrError`；模型加载失败仍返回 `kOcrSuccess`
///
/// # Safety
/// 四个路径参数为空或指向以 NUL 结尾的字符串
#[no_mangle]
pub unsafe extern "C" fn ocr_init(
    num_thread: c_int,
    db_net_path: *const c_char,
    angle_path: *const c_char,
    crnn_path: *const c_char,
    key_path: *const c_char,
) -> c_int {
    guarded("ocr_init", || {
        let paths = ModelPaths::new(
            path_from_ptr(db_net_path, "dbNetPath")?,
            path_from_ptr(angle_path, "anglePath")?,
            path_from_ptr(crnn_path, "crnnPath")?,
            path_from_ptr(key_path, "keyPath")?,
        );
        let num_thread = usize::try_from(num_thread).unwrap_or(1);
        context::global().initialize(num_thread, &paths)
    })
}

/// 释放引擎，可重复调用
#[no_mangle]
pub extern "C" fn ocr_cleanup() {
    let _ = panic::catch_unwind(|| context::global().cleanup());
}

/// 识别图片，结果以 JSON 写入 `out_buffer`
///
/// `buffer_len` 传入缓冲区容量，成功时改写为实际长度；结果放不下时返回
/// `kOcrError` 且不改动缓冲区和 `buffer_len`
///
/// # Safety
/// `image_path` 为空或指向以 NUL 结尾的字符串；`buffer_len` 为空或可读写；
/// `out_buffer` 为空或至少可写 `*buffer_len` 字节
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ocr_detect(
    image_path: *const c_char,
    out_buffer: *mut c_char,
    buffer_len: *mut c_int,
    padding: c_int,
    max_side_len: c_int,
    box_score_thresh: c_float,
    box_thresh: c_float,
    un_clip_ratio: c_float,
    do_angle: bool,
    most_angle: bool,
) -> c_int {
    guarded("ocr_detect", || {
        if buffer_len.is_null() {
            return Err(FacadeError::InvalidArgument("buffer_len"));
        }
        if out_buffer.is_null() {
            return Err(FacadeError::InvalidArgument("out_buffer"));
        }
        let image = path_from_ptr(image_path, "image_path")?;
        let capacity = usize::try_from(*buffer_len).unwrap_or(0);

        let params = DetectParams {
            padding,
            max_side_len,
            box_score_thresh,
            box_thresh,
            un_clip_ratio,
            do_angle,
            most_angle,
        };

        let bytes = context::global().detect(&image, &params)?;
        let written = output::copy_to_raw(&bytes, out_buffer.cast::<u8>(), capacity)?;
        *buffer_len = written as c_int;
        Ok(())
    })
}

/// 使用默认参数识别图片
///
/// # Safety
/// 同 [`ocr_detect`]
#[no_mangle]
pub unsafe extern "C" fn ocr_detect2(
    image_path: *const c_char,
    out_buffer: *mut c_char,
    buffer_len: *mut c_int,
) -> c_int {
    ocr_detect(
        image_path,
        out_buffer,
        buffer_len,
        DEFAULT_PADDING,
        DEFAULT_MAX_SIDE_LEN,
        DEFAULT_BOX_SCORE_THRESH,
        DEFAULT_BOX_THRESH,
        DEFAULT_UN_CLIP_RATIO,
        DEFAULT_DO_ANGLE,
        DEFAULT_MOST_ANGLE,
    )
}

/// 最近一次识别结果序列化后的字节数，缓冲区不足时可据此重新分配
#[no_mangle]
pub extern "C" fn ocr_last_result_len() -> c_int {
    panic::catch_unwind(|| context::global().last_result_len())
        .map(|len| c_int::try_from(len).unwrap_or(c_int::MAX))
        .unwrap_or(0)
}
