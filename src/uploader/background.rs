//! # 后台执行并等待
//!
//! 宿主界面通常以“请稍候”对话框阻塞前台，同时在后台线程完成上传。
//! 这里不依赖任何 UI 框架：任务在独立线程的 tokio 运行时中执行，
//! 调用线程阻塞在通道上直到任务完成。
//!
//! 使用 `std::sync::mpsc` 等待，因此即使调用线程本身处于 tokio 运行时内也不会 panic
//! （但会阻塞该工作线程，异步调用方应直接 `await` 上传函数）。

use std::future::Future;
use std::sync::mpsc;
use std::time::Instant;

use crate::lutim::UploadError;

/// 在后台线程执行 `task` 并阻塞等待结果。
pub fn run_and_wait<F, T>(title: &str, message: &str, task: F) -> Result<T, UploadError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    log::info!("⏳ {}：{}", title, message);
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("lutim-background".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(Err(format!("无法创建后台运行时：{}", e)));
                    return;
                }
            };
            let output = runtime.block_on(task);
            let _ = tx.send(Ok(output));
        })
        .map_err(|e| UploadError::Internal(format!("无法创建后台线程：{}", e)))?;

    let result = rx
        .recv()
        .map_err(|_| UploadError::Internal("后台任务异常退出".to_string()))?
        .map_err(UploadError::Internal);

    log::debug!("⌛ {} 后台任务结束 - {}ms", title, started.elapsed().as_millis());
    result
}
