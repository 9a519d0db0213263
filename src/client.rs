//! 基于 C 接口的安全封装
//!
//! 与其他语言绑定的用法一致：初始化、识别、释放，均经过导出的 C 函数

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;

use ocrlite_engine::DetectParams;

use crate::config::OcrConfig;
use crate::error::{FacadeError, FacadeResult};
use crate::ffi;
use crate::output::{self, DetectionPayload};

pub struct OcrClient {
    params: DetectParams,
    buffer_len: usize,
}

impl OcrClient {
    /// 按配置初始化全局引擎
    pub fn init(config: &OcrConfig) -> FacadeResult<Self> {
        let paths = config.model_paths();
        let db_net = to_c_path(&paths.db_net, "dbNetPath")?;
        let angle_net = to_c_path(&paths.angle_net, "anglePath")?;
        let crnn_net = to_c_path(&paths.crnn_net, "crnnPath")?;
        let keys = to_c_path(&paths.keys, "keyPath")?;
        let num_thread = c_int::try_from(config.resolve_thread_count()).unwrap_or(c_int::MAX);

        let status = unsafe {
            ffi::ocr_init(
                num_thread,
                db_net.as_ptr(),
                angle_net.as_ptr(),
                crnn_net.as_ptr(),
                keys.as_ptr(),
            )
        };
        if status != ffi::K_OCR_SUCCESS {
            return Err(FacadeError::CallFailed("ocr_init"));
        }

        Ok(Self {
            params: config.params,
            buffer_len: config.buffer_len.max(1),
        })
    }

    pub fn params(&self) -> &DetectParams {
        &self.params
    }

    /// 识别图片，缓冲区不足时按实际长度扩容重试一次
    pub fn detect(&self, image_path: &Path) -> FacadeResult<DetectionPayload> {
        let image = to_c_path(image_path, "image_path")?;
        let mut buf = vec![0u8; self.buffer_len];

        if let Some(len) = self.call_detect(&image, &mut buf) {
            return output::parse_payload(&buf[..len]);
        }

        let required = usize::try_from(ffi::ocr_last_result_len()).unwrap_or(0);
        if required <= buf.len() {
            return Err(FacadeError::CallFailed("ocr_detect"));
        }
        log::debug!("[OCR] 结果 {} 字节，扩容缓冲区后重试", required);
        buf.resize(required, 0);
        match self.call_detect(&image, &mut buf) {
            Some(len) => output::parse_payload(&buf[..len]),
            None => Err(FacadeError::CallFailed("ocr_detect")),
        }
    }

    /// 识别并以空格拼接全部文字
    pub fn detect_text(&self, image_path: &Path) -> FacadeResult<String> {
        Ok(self.detect(image_path)?.extract_text())
    }

    /// 释放全局引擎
    pub fn cleanup(self) {
        ffi::ocr_cleanup();
    }

    fn call_detect(&self, image: &CString, buf: &mut [u8]) -> Option<usize> {
        let mut len = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);
        let p = &self.params;
        let status = unsafe {
            ffi::ocr_detect(
                image.as_ptr(),
                buf.as_mut_ptr().cast(),
                &mut len,
                p.padding,
                p.max_side_len,
                p.box_score_thresh,
                p.box_thresh,
                p.un_clip_ratio,
                p.do_angle,
                p.most_angle,
            )
        };
        if status == ffi::K_OCR_SUCCESS {
            usize::try_from(len).ok()
        } else {
            None
        }
    }
}

fn to_c_path(path: &Path, name: &'static str) -> FacadeResult<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or(FacadeError::InvalidArgument(name))?
        .as_bytes()
        .to_vec();

    CString::new(bytes).map_err(|_| FacadeError::InvalidArgument(name))
}
