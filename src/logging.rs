//! 控制台日志
//!
//! 宿主进程若已注册 logger，则沿用宿主的 logger

use std::sync::Once;

static INIT: Once = Once::new();

/// 安装 env_logger，默认级别 info，可用 `RUST_LOG` 覆盖
pub fn init_console() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        if env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .try_init()
            .is_err()
        {
            log::debug!("[OCR] 已存在全局 logger，跳过控制台日志初始化");
        }
    });
}
