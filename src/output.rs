//! 识别结果序列化与输出缓冲区写入

use serde::{Deserialize, Serialize};

use ocrlite_engine::{OcrResult, TextBlock};

use crate::error::{FacadeError, FacadeResult};

/// 写入调用方缓冲区的 JSON 结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPayload {
    pub db_net_time: f64,
    pub detect_time: f64,
    pub text_blocks: Vec<TextBlock>,
    /// 与 `text_blocks` 一一对应的文字
    pub texts: Vec<String>,
}

impl From<OcrResult> for DetectionPayload {
    fn from(result: OcrResult) -> Self {
        let texts = result.texts();
        Self {
            db_net_time: result.db_net_time,
            detect_time: result.detect_time,
            text_blocks: result.text_blocks,
            texts,
        }
    }
}

impl DetectionPayload {
    /// 以空格拼接全部文字
    pub fn extract_text(&self) -> String {
        self.texts.join(" ")
    }
}

/// 序列化为紧凑 JSON 字节
pub fn serialize_result(result: OcrResult) -> FacadeResult<Vec<u8>> {
    let payload = DetectionPayload::from(result);
    Ok(serde_json::to_vec(&payload)?)
}

/// 解析缓冲区中的 JSON
pub fn parse_payload(bytes: &[u8]) -> FacadeResult<DetectionPayload> {
    Ok(serde_json::from_slice(bytes)?)
}

/// 检查 `required` 字节能否放入容量为 `capacity` 的缓冲区
pub fn ensure_fits(required: usize, capacity: usize) -> FacadeResult<()> {
    if required > capacity {
        return Err(FacadeError::BufferTooSmall { required, capacity });
    }
    Ok(())
}

/// 将数据复制到容量为 `out.len()` 的缓冲区，返回写入长度
///
/// 放不下时不写入任何字节
pub fn write_to_buffer(data: &[u8], out: &mut [u8]) -> FacadeResult<usize> {
    ensure_fits(data.len(), out.len())?;
    out[..data.len()].copy_from_slice(data);
    Ok(data.len())
}

/// 将数据复制到调用方提供的原始缓冲区，返回写入长度
///
/// 缓冲区内容可以未初始化；放不下时不写入任何字节
///
/// # Safety
/// `out` 至少可写 `capacity` 字节，且与 `data` 不重叠
pub unsafe fn copy_to_raw(data: &[u8], out: *mut u8, capacity: usize) -> FacadeResult<usize> {
    ensure_fits(data.len(), capacity)?;
    std::ptr::copy_nonoverlapping(data.as_ptr(), out, data.len());
    Ok(data.len())
}
