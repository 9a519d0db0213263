use ort::session::builder::SessionBuilder;
use ort::Error;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_MAX_THREADS: usize = 4;

/// 进程级推理线程数，0 表示尚未设置
static NUM_THREAD: AtomicUsize = AtomicUsize::new(0);

fn default_thread_count() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_MAX_THREADS);
    available.min(DEFAULT_MAX_THREADS).max(1)
}

/// 设置进程级推理线程数（后续创建的会话生效）
pub fn set_num_thread(num_thread: usize) {
    let num_thread = num_thread.max(1);
    NUM_THREAD.store(num_thread, Ordering::SeqCst);

    set_env_if_missing("OMP_NUM_THREADS", &num_thread.to_string());
    set_env_if_missing("ORT_NUM_THREADS", &num_thread.to_string());
}

/// 当前生效的推理线程数
pub fn num_thread() -> usize {
    match NUM_THREAD.load(Ordering::SeqCst) {
        0 => default_thread_count(),
        n => n,
    }
}

fn set_env_if_missing(key: &str, value: &str) {
    if std::env::var_os(key).is_none() {
        std::env::set_var(key, value);
    }
}

pub fn apply_session_threads(builder: SessionBuilder) -> Result<SessionBuilder, Error> {
    let intra = num_thread();

    log::debug!("[OCR] 线程设置: intra={}, inter=1", intra);

    let builder = builder.with_intra_threads(intra)?;
    let builder = builder.with_inter_threads(1)?;
    builder.with_parallel_execution(false)
}
