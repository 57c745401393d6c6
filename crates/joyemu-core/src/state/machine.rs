//! Per-connection protocol state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::protocol::MAC_LEN;

/// How the timer byte of subcommand replies is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Ticks elapsed since the previous subcommand, truncated to 8 bits.
    #[default]
    Derived,
    /// Always 0xFF.
    Saturated,
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::Derived => write!(f, "derived"),
            TimerMode::Saturated => write!(f, "saturated"),
        }
    }
}

/// Elapsed-ticks counter refreshed on every subcommand.
#[derive(Debug)]
pub struct ElapsedTimer {
    last_tick: Instant,
    tick_unit: Duration,
    mode: TimerMode,
    elapsed: u8,
}

impl ElapsedTimer {
    pub fn new(tick_unit: Duration, mode: TimerMode) -> Self {
        Self::starting_at(Instant::now(), tick_unit, mode)
    }

    pub fn starting_at(start: Instant, tick_unit: Duration, mode: TimerMode) -> Self {
        Self {
            last_tick: start,
            tick_unit,
            mode,
            elapsed: 0,
        }
    }

    /// Refresh from the wall clock and return the new value.
    pub fn update(&mut self) -> u8 {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> u8 {
        let unit = self.tick_unit.as_nanos().max(1);
        let ticks = now.saturating_duration_since(self.last_tick).as_nanos() / unit;
        self.elapsed = match self.mode {
            TimerMode::Derived => (ticks & 0xFF) as u8,
            TimerMode::Saturated => 0xFF,
        };
        self.last_tick = now;
        self.elapsed
    }

    pub fn elapsed(&self) -> u8 {
        self.elapsed
    }
}

/// Flags read outside the reader thread.
///
/// Only the reader's call chain writes them.
#[derive(Debug, Default)]
pub struct SharedFlags {
    device_info_requested: AtomicBool,
    motion_sensor_enabled: AtomicBool,
    report_received: AtomicBool,
}

impl SharedFlags {
    pub fn device_info_requested(&self) -> bool {
        self.device_info_requested.load(Ordering::Acquire)
    }

    pub fn motion_sensor_enabled(&self) -> bool {
        self.motion_sensor_enabled.load(Ordering::Acquire)
    }

    pub fn report_received(&self) -> bool {
        self.report_received.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            device_info_requested: self.device_info_requested(),
            motion_sensor_enabled: self.motion_sensor_enabled(),
            report_received: self.report_received(),
        }
    }
}

/// Point-in-time copy of the connection flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    pub device_info_requested: bool,
    pub motion_sensor_enabled: bool,
    pub report_received: bool,
}

/// State owned by the output reader for one connection.
#[derive(Debug)]
pub struct ProtocolState {
    timer: ElapsedTimer,
    flags: Arc<SharedFlags>,
    mac_address: [u8; MAC_LEN],
    /// Last mode requested by SetInputReportMode. Recorded, not acted on.
    input_report_mode: Option<u8>,
}

impl ProtocolState {
    pub fn new(mac_address: [u8; MAC_LEN], timer: ElapsedTimer) -> Self {
        Self {
            timer,
            flags: Arc::new(SharedFlags::default()),
            mac_address,
            input_report_mode: None,
        }
    }

    /// Handle for threads that only read the flags.
    pub fn shared(&self) -> Arc<SharedFlags> {
        Arc::clone(&self.flags)
    }

    pub fn update_timer(&mut self) -> u8 {
        self.timer.update()
    }

    pub fn elapsed_ticks(&self) -> u8 {
        self.timer.elapsed()
    }

    pub fn mac_address(&self) -> &[u8; MAC_LEN] {
        &self.mac_address
    }

    /// Sticky: once set it stays set for the connection.
    pub fn mark_device_info_requested(&mut self) {
        if !self.flags.device_info_requested.swap(true, Ordering::AcqRel) {
            tracing::info!("Host requested device info");
        }
    }

    pub fn device_info_requested(&self) -> bool {
        self.flags.device_info_requested()
    }

    /// Apply an EnableImu payload byte. Only `0x01` turns the sensor on;
    /// nothing turns it off.
    pub fn apply_enable_imu(&mut self, arg: u8) {
        if arg == 0x01 {
            self.flags.motion_sensor_enabled.store(true, Ordering::Release);
        }
    }

    pub fn motion_sensor_enabled(&self) -> bool {
        self.flags.motion_sensor_enabled()
    }

    pub fn mark_report_received(&mut self) {
        self.flags.report_received.store(true, Ordering::Release);
    }

    pub fn report_received(&self) -> bool {
        self.flags.report_received()
    }

    pub fn set_input_report_mode(&mut self, mode: u8) {
        tracing::debug!(mode = %format!("0x{:02X}", mode), "Input report mode requested");
        self.input_report_mode = Some(mode);
    }

    pub fn input_report_mode(&self) -> Option<u8> {
        self.input_report_mode
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.flags.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    #[test]
    fn test_timer_derived() {
        let start = Instant::now();
        let mut timer = ElapsedTimer::starting_at(start, Duration::from_millis(5), TimerMode::Derived);
        assert_eq!(timer.update_at(start + Duration::from_millis(50)), 10);
        // Measured from the previous update, not from the start.
        assert_eq!(timer.update_at(start + Duration::from_millis(60)), 2);
        // 300 ticks truncates to 300 - 256.
        assert_eq!(timer.update_at(start + Duration::from_millis(1560)), 44);
    }

    #[test]
    fn test_timer_saturated() {
        let start = Instant::now();
        let mut timer = ElapsedTimer::starting_at(start, Duration::from_millis(5), TimerMode::Saturated);
        assert_eq!(timer.update_at(start), 0xFF);
        assert_eq!(timer.elapsed(), 0xFF);
    }

    #[test]
    fn test_device_info_is_sticky() {
        let mut state = ProtocolState::new(MAC, ElapsedTimer::new(Duration::from_nanos(4), TimerMode::Derived));
        assert!(!state.device_info_requested());
        state.mark_device_info_requested();
        state.mark_device_info_requested();
        assert!(state.device_info_requested());
        assert!(state.shared().device_info_requested());
    }

    #[test]
    fn test_enable_imu_only_sets() {
        let mut state = ProtocolState::new(MAC, ElapsedTimer::new(Duration::from_nanos(4), TimerMode::Derived));
        state.apply_enable_imu(0x00);
        assert!(!state.motion_sensor_enabled());
        state.apply_enable_imu(0x01);
        assert!(state.motion_sensor_enabled());
        state.apply_enable_imu(0x00);
        assert!(state.motion_sensor_enabled());
    }
}
