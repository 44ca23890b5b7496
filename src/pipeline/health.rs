// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 后端可用性监控 (Availability Monitor)
//!
//! 独立线程轮询 `/health`, 只驱动连接状态显示, 不影响检测循环
//! - 就绪:       Online, 停止强制轮询 (只接受外部触发的复查)
//! - 可达未就绪: 保持离线显示 ("初始化中"), 2s 后重试
//! - 不可达:     Offline, 5s 后重试

use super::client::{HealthOutcome, HealthProbe};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const READY_RETRY: Duration = Duration::from_secs(2);
pub const OFFLINE_RETRY: Duration = Duration::from_secs(5);

/// 连接状态 (对外两值: 在线/离线)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityState {
    pub is_online: bool,
}

/// 状态栏显示
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    /// 后端可达但模型尚未加载, 按离线显示
    Initializing,
    Offline,
}

impl Connectivity {
    pub fn state(&self) -> ConnectivityState {
        ConnectivityState {
            is_online: matches!(self, Connectivity::Online),
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Connectivity::Online => "Backend Online",
            Connectivity::Initializing => "Backend Initializing...",
            Connectivity::Offline => "Backend Offline",
        }
    }
}

/// 单次轮询后的决定
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollDecision {
    /// 显示状态变化时才有值
    pub update: Option<Connectivity>,
    /// 下次强制轮询间隔, `None` 表示等待外部触发
    pub next_poll: Option<Duration>,
}

#[derive(Clone, Copy, Debug)]
pub struct AvailabilityMonitor {
    display: Connectivity,
    ready_retry: Duration,
    offline_retry: Duration,
}

impl Default for AvailabilityMonitor {
    fn default() -> Self {
        Self::new(READY_RETRY, OFFLINE_RETRY)
    }
}

impl AvailabilityMonitor {
    pub fn new(ready_retry: Duration, offline_retry: Duration) -> Self {
        Self {
            display: Connectivity::Offline, // 未知按离线处理
            ready_retry,
            offline_retry,
        }
    }

    pub fn display(&self) -> Connectivity {
        self.display
    }

    pub fn state(&self) -> ConnectivityState {
        self.display.state()
    }

    pub fn observe(&mut self, outcome: HealthOutcome) -> PollDecision {
        let (display, next_poll) = match outcome {
            HealthOutcome::Ready => (Connectivity::Online, None),
            HealthOutcome::NotReady => (Connectivity::Initializing, Some(self.ready_retry)),
            HealthOutcome::Unreachable => (Connectivity::Offline, Some(self.offline_retry)),
        };

        let update = (display != self.display).then_some(display);
        self.display = display;
        PollDecision { update, next_poll }
    }
}

/// 监控线程句柄, 丢弃即停止
pub struct MonitorHandle {
    updates: Receiver<Connectivity>,
    trigger: Sender<()>,
    _thread: JoinHandle<()>,
}

impl MonitorHandle {
    /// 外部触发一次复查 (在线后恢复轮询的唯一途径)
    pub fn recheck(&self) {
        let _ = self.trigger.try_send(());
    }

    /// 状态更新 (不阻塞)
    pub fn updates(&self) -> crossbeam_channel::TryIter<'_, Connectivity> {
        self.updates.try_iter()
    }

    pub fn receiver(&self) -> &Receiver<Connectivity> {
        &self.updates
    }
}

/// 启动监控线程, 首先推送一次初始离线状态
pub fn spawn_availability_monitor<P>(probe: Arc<P>, monitor: AvailabilityMonitor) -> MonitorHandle
where
    P: HealthProbe + ?Sized + 'static,
{
    let (update_tx, update_rx) = crossbeam_channel::unbounded();
    let (trigger_tx, trigger_rx) = crossbeam_channel::bounded::<()>(1);

    let thread = std::thread::spawn(move || {
        let mut monitor = monitor;
        if update_tx.send(monitor.display()).is_err() {
            return;
        }

        loop {
            let outcome = probe.health();
            let decision = monitor.observe(outcome);
            log::debug!("🩺 健康检查: {:?} → {:?}", outcome, decision);

            if let Some(display) = decision.update {
                log::info!("🔌 {}", display.text());
                if update_tx.send(display).is_err() {
                    break;
                }
            }

            let resume = match decision.next_poll {
                Some(delay) => match trigger_rx.recv_timeout(delay) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => true,
                    Err(RecvTimeoutError::Disconnected) => false,
                },
                None => trigger_rx.recv().is_ok(),
            };
            if !resume {
                break;
            }
        }
        log::debug!("🩺 健康检查线程退出");
    });

    MonitorHandle {
        updates: update_rx,
        trigger: trigger_tx,
        _thread: thread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    #[test]
    fn test_never_ready_retries_every_two_seconds() {
        let mut monitor = AvailabilityMonitor::default();
        let first = monitor.observe(HealthOutcome::NotReady);
        assert_eq!(first.update, Some(Connectivity::Initializing));
        assert_eq!(first.next_poll, Some(Duration::from_secs(2)));

        for _ in 0..10 {
            let decision = monitor.observe(HealthOutcome::NotReady);
            assert_eq!(decision.update, None);
            assert_eq!(decision.next_poll, Some(Duration::from_secs(2)));
        }
        assert!(!monitor.state().is_online);
    }

    #[test]
    fn test_unreachable_retries_every_five_seconds() {
        let mut monitor = AvailabilityMonitor::default();
        // 初始即离线, 不重复推送
        let decision = monitor.observe(HealthOutcome::Unreachable);
        assert_eq!(decision.update, None);
        assert_eq!(decision.next_poll, Some(Duration::from_secs(5)));
        assert_eq!(
            monitor.observe(HealthOutcome::Unreachable).next_poll,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_ready_stops_forced_polling() {
        let mut monitor = AvailabilityMonitor::default();
        monitor.observe(HealthOutcome::Unreachable);
        monitor.observe(HealthOutcome::NotReady);
        let decision = monitor.observe(HealthOutcome::Ready);
        assert_eq!(decision.update, Some(Connectivity::Online));
        assert_eq!(decision.next_poll, None);
        assert!(monitor.state().is_online);

        // 外部复查发现掉线 → 重新进入5s节奏
        let decision = monitor.observe(HealthOutcome::Unreachable);
        assert_eq!(decision.update, Some(Connectivity::Offline));
        assert_eq!(decision.next_poll, Some(OFFLINE_RETRY));
    }

    /// 按脚本返回结果的探针, 脚本用完后一直返回最后一个
    struct ScriptedProbe {
        script: Mutex<Vec<HealthOutcome>>,
        calls: AtomicUsize,
    }

    impl HealthProbe for ScriptedProbe {
        fn health(&self) -> HealthOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0]
            }
        }
    }

    #[test]
    fn test_monitor_thread_stops_polling_once_ready() {
        let probe = Arc::new(ScriptedProbe {
            script: Mutex::new(vec![
                HealthOutcome::Unreachable,
                HealthOutcome::NotReady,
                HealthOutcome::Ready,
            ]),
            calls: AtomicUsize::new(0),
        });
        let handle = spawn_availability_monitor(
            probe.clone(),
            AvailabilityMonitor::new(Duration::from_millis(10), Duration::from_millis(20)),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while !seen.contains(&Connectivity::Online) && Instant::now() < deadline {
            if let Ok(update) = handle
                .receiver()
                .recv_timeout(Duration::from_millis(50))
            {
                seen.push(update);
            }
        }
        assert_eq!(
            seen,
            vec![
                Connectivity::Offline,
                Connectivity::Initializing,
                Connectivity::Online
            ]
        );

        // 就绪后不再轮询
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);

        // 外部触发复查
        handle.recheck();
        let deadline = Instant::now() + Duration::from_secs(5);
        while probe.calls.load(Ordering::SeqCst) < 4 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    }
}
