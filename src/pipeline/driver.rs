// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 循环驱动 (Loop Driver) - 纯状态机, 不依赖任何渲染/IO
//!
//! 每个显示帧调用一次 `tick`:
//! - 计算 FPS (首帧无数据)
//! - 检测开启且没有在途请求时, 发起一轮推理 (单飞)
//! - 推理完成 (成功或失败) 后必须调用 `complete` 清除在途标记
//!
//! 每次 start/stop 递增会话代数, 旧代数的结果在 `complete` 处被丢弃

use std::time::Instant;

/// 默认置信度阈值
pub const DEFAULT_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopState {
    pub is_active: bool,
    pub is_request_in_flight: bool,
    pub last_tick: Option<Instant>,
    pub current_fps: u32,
    pub confidence_threshold: f32,
}

/// 一轮推理的凭证, 阈值在发起时刻采样
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleTicket {
    pub generation: u64,
    pub threshold: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// 本帧计算出的 FPS
    pub fps: Option<u32>,
    /// 需要发起的推理
    pub cycle: Option<CycleTicket>,
}

#[derive(Debug)]
pub struct LoopDriver {
    state: LoopState,
    generation: u64,
}

impl Default for LoopDriver {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl LoopDriver {
    pub fn new(threshold: f32) -> Self {
        Self {
            state: LoopState {
                is_active: false,
                is_request_in_flight: false,
                last_tick: None,
                current_fps: 0,
                confidence_threshold: threshold.clamp(0.0, 1.0),
            },
            generation: 0,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn threshold(&self) -> f32 {
        self.state.confidence_threshold
    }

    /// 阈值只影响之后发起的请求
    pub fn set_threshold(&mut self, threshold: f32) {
        self.state.confidence_threshold = threshold.clamp(0.0, 1.0);
    }

    /// 进入运行状态, 已在运行时忽略
    pub fn start(&mut self) -> bool {
        if self.state.is_active {
            return false;
        }
        self.generation += 1;
        self.state.is_active = true;
        self.state.is_request_in_flight = false;
        self.state.last_tick = None;
        self.state.current_fps = 0;
        true
    }

    pub fn stop(&mut self) {
        if self.state.is_active {
            self.generation += 1;
        }
        self.state.is_active = false;
        self.state.is_request_in_flight = false;
        self.state.last_tick = None;
        self.state.current_fps = 0;
    }

    pub fn tick(&mut self, now: Instant, detection_enabled: bool) -> TickOutcome {
        // 停止后到达的 tick 不做任何事
        if !self.state.is_active {
            return TickOutcome::default();
        }

        let mut outcome = TickOutcome::default();
        if let Some(last) = self.state.last_tick {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            if elapsed > 0.0 {
                self.state.current_fps = (1.0 / elapsed).round() as u32;
                outcome.fps = Some(self.state.current_fps);
            }
        }
        self.state.last_tick = Some(now);

        if detection_enabled && !self.state.is_request_in_flight {
            self.state.is_request_in_flight = true;
            outcome.cycle = Some(CycleTicket {
                generation: self.generation,
                threshold: self.state.confidence_threshold,
            });
        }
        outcome
    }

    /// 一轮推理结束 (无论成败)
    ///
    /// 返回 `true` 表示结果属于当前运行会话, 可以使用; `false` 表示应丢弃
    pub fn complete(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.state.is_active {
            return false;
        }
        self.state.is_request_in_flight = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_tick_has_no_fps() {
        let mut driver = LoopDriver::default();
        assert!(driver.start());
        let t0 = Instant::now();
        let first = driver.tick(t0, false);
        assert_eq!(first.fps, None);

        let second = driver.tick(t0 + Duration::from_millis(40), false);
        assert_eq!(second.fps, Some(25));
        assert_eq!(driver.state().current_fps, 25);

        // 同一时刻重复 tick 不计算 FPS
        let same = driver.tick(t0 + Duration::from_millis(40), false);
        assert_eq!(same.fps, None);
        assert_eq!(driver.state().current_fps, 25);
    }

    #[test]
    fn test_tick_after_stop_is_noop() {
        let mut driver = LoopDriver::default();
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0, true);
        driver.stop();

        let outcome = driver.tick(t0 + Duration::from_millis(16), true);
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(driver.state().last_tick, None);
        assert_eq!(driver.state().current_fps, 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut driver = LoopDriver::default();
        assert!(driver.start());
        let generation = driver.generation();
        let t0 = Instant::now();
        let ticket = driver.tick(t0, true).cycle.unwrap();

        assert!(!driver.start());
        assert_eq!(driver.generation(), generation);
        // 在途标记不受重复 start 影响
        assert!(driver.state().is_request_in_flight);
        assert!(driver.complete(ticket.generation));
    }

    #[test]
    fn test_single_flight_under_slow_backend() {
        // 60Hz tick, 推理往返 100ms
        let mut driver = LoopDriver::default();
        driver.start();
        let t0 = Instant::now();
        let tick = Duration::from_micros(16_667);
        let latency = Duration::from_millis(100);

        let mut outstanding: Vec<(CycleTicket, Instant)> = Vec::new();
        let mut issued = 0;
        for i in 0..600u32 {
            let now = t0 + tick * i;

            // 到期的响应在 tick 边界被消费
            let (done, pending): (Vec<_>, Vec<_>) =
                outstanding.into_iter().partition(|(_, due)| *due <= now);
            outstanding = pending;
            for (ticket, _) in done {
                assert!(driver.complete(ticket.generation));
            }

            if let Some(ticket) = driver.tick(now, true).cycle {
                issued += 1;
                outstanding.push((ticket, now + latency));
            }
            assert!(outstanding.len() <= 1);
        }
        // 100ms 往返 ≈ 6 帧, 10秒内每 6 帧发起一次
        assert_eq!(issued, 100);
    }

    #[test]
    fn test_late_completion_after_stop_is_discarded() {
        let mut driver = LoopDriver::default();
        driver.start();
        let ticket = driver.tick(Instant::now(), true).cycle.unwrap();
        driver.stop();
        assert!(!driver.complete(ticket.generation));

        // 重新启动后旧凭证依旧无效, 新一轮可以立即发起
        driver.start();
        assert!(!driver.complete(ticket.generation));
        let fresh = driver.tick(Instant::now(), true).cycle.unwrap();
        assert_ne!(fresh.generation, ticket.generation);
        assert!(driver.complete(fresh.generation));
    }

    #[test]
    fn test_threshold_sampled_at_request_time() {
        let mut driver = LoopDriver::default();
        driver.start();
        let t0 = Instant::now();

        let first = driver.tick(t0, true).cycle.unwrap();
        assert_eq!(first.threshold, 0.5);

        // 请求在途时修改阈值, 不影响已发出的请求
        driver.set_threshold(70.0 / 100.0);
        assert!(driver.tick(t0 + Duration::from_millis(16), true).cycle.is_none());
        driver.complete(first.generation);

        let second = driver.tick(t0 + Duration::from_millis(32), true).cycle.unwrap();
        assert_eq!(second.threshold.to_string(), "0.7");
    }

    #[test]
    fn test_detection_disabled_keeps_fps_running() {
        let mut driver = LoopDriver::default();
        driver.start();
        let t0 = Instant::now();
        driver.tick(t0, false);
        let outcome = driver.tick(t0 + Duration::from_millis(50), false);
        assert_eq!(outcome.fps, Some(20));
        assert!(outcome.cycle.is_none());
        assert!(!driver.state().is_request_in_flight);
    }
}
