//! 轮询器模块
//!
//! 在当前线程上周期性执行一个异步任务，替代浏览器的 `setInterval`。
//! 必须在 `tokio::task::LocalSet` 内启动。

use std::cell::RefCell;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 周期性轮询器
///
/// - 启动后立即执行一次，之后每隔 `period` 执行一次
/// - 上一次执行结束前不会开始下一次，错过的周期顺延
/// - 重复启动无效，同一时刻最多只有一个定时任务
/// - drop 时自动停止
pub struct Poller {
    name: &'static str,
    period: Duration,
    handle: RefCell<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period: period.max(MIN_PERIOD),
            handle: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .borrow()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// 启动轮询
    ///
    /// 已在运行时不做任何事并返回 `false`。
    pub fn start<F, Fut>(&self, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        if self.is_running() {
            return false;
        }

        let period = self.period;
        let handle = tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });

        tracing::debug!(poller = self.name, period_ms = period.as_millis() as u64, "poller started");
        *self.handle.borrow_mut() = Some(handle);
        true
    }

    /// 停止轮询，已停止时无副作用
    ///
    /// 可以在自身的 tick 内调用，当前这次 tick 在下一个挂起点结束。
    pub fn stop(&self) {
        let Some(handle) = self.handle.borrow_mut().take() else {
            return;
        };
        handle.abort();
        tracing::debug!(poller = self.name, "poller stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
