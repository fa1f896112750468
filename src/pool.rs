//! 执行非阻塞解析的工作线程池。
//!
//! 默认使用一个进程级、惰性创建的多线程 tokio 运行时，线程在多次调用间复用。
//! 也可以把调用方自己的运行时句柄交给 [`WorkerPool::from_handle`]。

use std::{future::Future, sync::OnceLock};

use parking_lot::{Mutex, const_mutex};
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task::{JoinHandle, block_in_place};
use tracing::info;

use crate::error::{Result, SonglinkError};

static SHARED_RUNTIME: OnceLock<Runtime> = OnceLock::new();
static INIT_LOCK: Mutex<()> = const_mutex(());

/// 工作线程池的句柄。克隆代价很低。
#[derive(Debug, Clone)]
pub struct WorkerPool {
    handle: Handle,
}

impl WorkerPool {
    /// 返回进程级共享的线程池，首次调用时创建。
    ///
    /// # 错误
    /// 无法创建运行时（例如无法派生线程）时返回 `SonglinkError::Io`。
    pub fn shared() -> Result<Self> {
        if let Some(runtime) = SHARED_RUNTIME.get() {
            return Ok(Self::from_handle(runtime.handle().clone()));
        }

        let _guard = INIT_LOCK.lock();
        if let Some(runtime) = SHARED_RUNTIME.get() {
            return Ok(Self::from_handle(runtime.handle().clone()));
        }

        let runtime = Builder::new_multi_thread()
            .thread_name("songlink-worker")
            .enable_all()
            .build()?;
        info!("[Pool] 已创建共享的工作线程池");
        let runtime = SHARED_RUNTIME.get_or_init(|| runtime);
        Ok(Self::from_handle(runtime.handle().clone()))
    }

    /// 使用调用方提供的 tokio 运行时。
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// 在线程池上执行一个任务，立即返回。
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// 在当前线程上驱动 `future` 直到完成。
    ///
    /// 在多线程运行时的上下文中（包括工作线程与 `spawn_blocking` 线程），
    /// 通过 [`tokio::task::block_in_place`] 让出执行器后再阻塞。
    ///
    /// # 错误
    /// 当前线程处于单线程 (`current_thread`) 运行时的上下文中时返回
    /// `SonglinkError::InvalidInput`，因为在那里阻塞会占住唯一的执行器线程。
    /// 这也包括单线程运行时的 `spawn_blocking` 线程，二者无法区分。
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        match Handle::try_current() {
            Err(_) => Ok(self.handle.block_on(future)),
            Ok(current) if matches!(current.runtime_flavor(), RuntimeFlavor::MultiThread) => {
                Ok(block_in_place(|| self.handle.block_on(future)))
            }
            Ok(_) => Err(SonglinkError::InvalidInput(
                "不能在单线程异步运行时内部调用阻塞的解析接口，请改用 `resolve().await`"
                    .to_string(),
            )),
        }
    }
}
