// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crank position and RPM timing.
//!
//! The crank edge interrupt hands the elapsed timer ticks since the previous
//! edge to [CrankTiming::on_edge]. The timer compare match interrupt calls
//! [CrankTiming::on_stall] when no edge arrived within the full timer period.
//! The main loop takes a [CrankSnapshot] and converts it with an [RpmSensor].

use crate::mutex::{CriticalSection, MutexCell};

pub const F_CPU: u32 = 16_000_000;
pub const CYLINDERS: usize = 5;

/// Duration slots covering one full 720 degree cycle.
pub const SLOTS: usize = CYLINDERS * 2;

/// Per cylinder deviation is clamped to this magnitude.
pub const DEVIATION_LIMIT: i32 = 32000;

/// Number of input re-samples of the edge bounce filter.
const BOUNCE_SAMPLES: u8 = 4;

/// Timing difference values at or above this are not averaged.
const TIMING_DIFF_VALID_LIMIT: u16 = 32768;

/// Geometry and time base of a crank position sensor.
pub trait RpmSensor {
    fn timer_clock_hz(&self) -> u32;

    fn teeth_per_revolution(&self) -> u32;

    /// Shortest plausible tooth duration, in timer ticks.
    fn min_duration(&self) -> u16;

    /// Number of recent slots averaged by the filtered measurement.
    fn filter_window(&self) -> usize {
        CYLINDERS
    }

    /// Convert a tooth duration to revolutions per minute.
    fn duration_to_rpm(&self, ticks: u32) -> u16 {
        if ticks == 0 {
            return 0;
        }
        let rpm = 60 * self.timer_clock_hz() / self.teeth_per_revolution() / ticks;
        rpm.min(u16::MAX as u32) as u16
    }

    /// Convert a tick offset within one tooth to tenths of a degree.
    fn ticks_to_decidegrees(&self, ticks: u32, duration: u32) -> i32 {
        if duration == 0 {
            return 0;
        }
        let per_tooth = 3600 / self.teeth_per_revolution();
        ((ticks as u64 * per_tooth as u64) / duration as u64).min(i32::MAX as u64) as i32
    }
}

/// One flywheel mark per cylinder. Timer runs at F_CPU/64.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCps;

impl DefaultCps {
    pub const CLOCK_HZ: u32 = F_CPU / 64;
    pub const TEETH: u32 = CYLINDERS as u32;
    /// 7500 rpm.
    pub const MIN_DURATION: u16 = 400;
}

impl RpmSensor for DefaultCps {
    fn timer_clock_hz(&self) -> u32 {
        Self::CLOCK_HZ
    }

    fn teeth_per_revolution(&self) -> u32 {
        Self::TEETH
    }

    fn min_duration(&self) -> u16 {
        Self::MIN_DURATION
    }
}

/// 144 teeth wheel. Timer runs at F_CPU.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomCps;

impl CustomCps {
    pub const CLOCK_HZ: u32 = F_CPU;
    pub const TEETH: u32 = 144;
    /// 7500 rpm.
    pub const MIN_DURATION: u16 = (60 * (F_CPU / Self::TEETH) / 7500) as u16;
}

impl RpmSensor for CustomCps {
    fn timer_clock_hz(&self) -> u32 {
        Self::CLOCK_HZ
    }

    fn teeth_per_revolution(&self) -> u32 {
        Self::TEETH
    }

    fn min_duration(&self) -> u16 {
        Self::MIN_DURATION
    }

    fn filter_window(&self) -> usize {
        SLOTS
    }
}

/// Sensor strategy, selected when the system is constructed.
#[derive(Clone, Copy, Debug)]
pub enum RpmSensorKind {
    Default(DefaultCps),
    Custom(CustomCps),
}

impl RpmSensorKind {
    pub const fn min_duration_ticks(&self) -> u16 {
        match self {
            Self::Default(_) => DefaultCps::MIN_DURATION,
            Self::Custom(_) => CustomCps::MIN_DURATION,
        }
    }
}

impl RpmSensor for RpmSensorKind {
    fn timer_clock_hz(&self) -> u32 {
        match self {
            Self::Default(s) => s.timer_clock_hz(),
            Self::Custom(s) => s.timer_clock_hz(),
        }
    }

    fn teeth_per_revolution(&self) -> u32 {
        match self {
            Self::Default(s) => s.teeth_per_revolution(),
            Self::Custom(s) => s.teeth_per_revolution(),
        }
    }

    fn min_duration(&self) -> u16 {
        self.min_duration_ticks()
    }

    fn filter_window(&self) -> usize {
        match self {
            Self::Default(s) => s.filter_window(),
            Self::Custom(s) => s.filter_window(),
        }
    }
}

/// Sensor line transition that raises the edge interrupt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl TriggerEdge {
    /// Line level a valid pulse keeps right after the edge.
    pub const fn settled_high(self) -> bool {
        matches!(self, Self::Rising)
    }

    /// AVR external interrupt sense control bits (ISCn1:ISCn0).
    pub const fn isc_bits(self) -> u8 {
        match self {
            Self::Rising => 0b11,
            Self::Falling => 0b10,
        }
    }
}

/// The bounce filter of [CrankTiming::on_edge] discards captures that read
/// the line high. A valid crank pulse is the falling edge.
pub const CRANK_TRIGGER: TriggerEdge = TriggerEdge::Falling;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeResult {
    /// Duration stored.
    Accepted,
    /// Line was high during re-sampling. Capture discarded, timer keeps running.
    Bounced,
    /// First edge after a stall or a skipped tooth. Timer restarts.
    Rearmed,
    /// Implausibly short duration. Counted as error, next tooth is skipped.
    Unplausible,
}

impl EdgeResult {
    /// Whether the capture timer must be restarted.
    pub fn restart_timer(self) -> bool {
        self != Self::Bounced
    }
}

pub struct CrankTiming {
    min_duration: u16,
    durations: MutexCell<[u16; SLOTS]>,
    slot: MutexCell<u8>,
    last: MutexCell<u16>,
    stalled: MutexCell<bool>,
    skip: MutexCell<u8>,
    errors: MutexCell<u8>,
    needle_armed: MutexCell<bool>,
    timing_diff: MutexCell<Option<u16>>,
}

impl CrankTiming {
    pub const fn new(min_duration: u16) -> Self {
        Self {
            min_duration,
            durations: MutexCell::new([0; SLOTS]),
            slot: MutexCell::new(0),
            last: MutexCell::new(0),
            stalled: MutexCell::new(true),
            skip: MutexCell::new(0),
            errors: MutexCell::new(0),
            needle_armed: MutexCell::new(false),
            timing_diff: MutexCell::new(None),
        }
    }

    /// Crank edge interrupt handler.
    ///
    /// `elapsed` is the timer count since the previous restart.
    /// `line_high` samples the raw sensor input.
    /// It must read low after a [CRANK_TRIGGER] edge.
    pub fn on_edge(
        &self,
        cs: CriticalSection<'_>,
        elapsed: u16,
        mut line_high: impl FnMut() -> bool,
    ) -> EdgeResult {
        for _ in 0..BOUNCE_SAMPLES {
            if line_high() {
                return EdgeResult::Bounced;
            }
        }

        if self.stalled.get(cs) {
            self.stalled.set(cs, false);
            self.needle_armed.set(cs, true);
            return EdgeResult::Rearmed;
        }

        let skip = self.skip.get(cs);
        if skip > 0 {
            self.skip.set(cs, skip - 1);
            return EdgeResult::Rearmed;
        }

        if elapsed < self.min_duration {
            self.errors.set(cs, self.errors.get(cs).saturating_add(1));
            self.skip.set(cs, 1);
            return EdgeResult::Unplausible;
        }

        let slot = self.slot.get(cs) as usize % SLOTS;
        let mut durations = self.durations.get(cs);
        durations[slot] = elapsed;
        self.durations.set(cs, durations);
        self.slot.set(cs, ((slot + 1) % SLOTS) as u8);
        self.last.set(cs, elapsed);
        self.needle_armed.set(cs, true);

        EdgeResult::Accepted
    }

    /// Timer compare match interrupt handler. The engine stopped.
    pub fn on_stall(&self, cs: CriticalSection<'_>) {
        self.durations.set(cs, [0; SLOTS]);
        self.slot.set(cs, 0);
        self.last.set(cs, 0);
        self.stalled.set(cs, true);
        self.skip.set(cs, 0);
        self.needle_armed.set(cs, false);
        self.timing_diff.set(cs, None);
    }

    /// Needle lift sensor interrupt handler.
    ///
    /// Only the first needle edge after each crank edge is recorded.
    pub fn on_needle_edge(&self, cs: CriticalSection<'_>, since_crank_edge: u16) {
        if !self.needle_armed.replace(cs, false) {
            return;
        }
        let diff = match self.timing_diff.get(cs) {
            Some(prev) if prev < TIMING_DIFF_VALID_LIMIT => {
                ((prev as u32 + since_crank_edge as u32) / 2) as u16
            }
            _ => since_crank_edge,
        };
        self.timing_diff.set(cs, Some(diff));
    }

    /// Read and clear the error counter.
    pub fn get_error(&self) -> u8 {
        critical_section::with(|cs| self.errors.take(cs))
    }

    pub fn snapshot_cs(&self, cs: CriticalSection<'_>) -> CrankSnapshot {
        CrankSnapshot {
            durations: self.durations.get(cs),
            slot: self.slot.get(cs),
            last: self.last.get(cs),
            stalled: self.stalled.get(cs),
            timing_diff: self.timing_diff.get(cs),
        }
    }

    /// Consistent copy of the interrupt state.
    pub fn snapshot(&self) -> CrankSnapshot {
        critical_section::with(|cs| self.snapshot_cs(cs))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CrankSnapshot {
    durations: [u16; SLOTS],
    slot: u8,
    last: u16,
    stalled: bool,
    timing_diff: Option<u16>,
}

impl CrankSnapshot {
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Slot that receives the next duration.
    pub fn current_slot(&self) -> u8 {
        self.slot
    }

    pub fn durations(&self) -> &[u16; SLOTS] {
        &self.durations
    }

    /// Latest raw tooth duration in ticks. 0 when stopped.
    pub fn latest_raw_value(&self) -> u16 {
        self.last
    }

    pub fn timing_diff(&self) -> Option<u16> {
        self.timing_diff
    }

    pub fn latest_measure(&self, sensor: &impl RpmSensor) -> u16 {
        sensor.duration_to_rpm(self.last as u32)
    }

    /// Average over the `count` most recent slots.
    fn recent_average(&self, sensor: &impl RpmSensor, count: usize) -> u16 {
        if self.last == 0 {
            return 0;
        }
        let count = count.clamp(1, SLOTS);
        let mut sum = 0_u32;
        let mut n = 0_u32;
        for i in 1..=count {
            let idx = (self.slot as usize + SLOTS - i) % SLOTS;
            let d = self.durations[idx];
            if d != 0 {
                sum += d as u32;
                n += 1;
            }
        }
        if n == 0 {
            0
        } else {
            sensor.duration_to_rpm(sum / n)
        }
    }

    pub fn latest_measure_filtered(&self, sensor: &impl RpmSensor) -> u16 {
        self.recent_average(sensor, sensor.filter_window())
    }

    pub fn latest_measure_two_teeth(&self, sensor: &impl RpmSensor) -> u16 {
        self.recent_average(sensor, 2)
    }

    fn cylinder_duration(&self, cyl: usize) -> i32 {
        self.durations[cyl * 2] as i32 + self.durations[cyl * 2 + 1] as i32
    }

    /// Timing of cylinder 0 minus timing of cylinder `cyl`.
    pub fn deviation_for_cylinder(&self, cyl: usize) -> i16 {
        if cyl >= CYLINDERS {
            return 0;
        }
        let dev = self.cylinder_duration(0) - self.cylinder_duration(cyl);
        dev.clamp(-DEVIATION_LIMIT, DEVIATION_LIMIT) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low() -> bool {
        false
    }

    fn edge(crank: &CrankTiming, elapsed: u16) -> EdgeResult {
        critical_section::with(|cs| crank.on_edge(cs, elapsed, low))
    }

    fn running(durations: &[u16]) -> CrankTiming {
        let crank = CrankTiming::new(DefaultCps::MIN_DURATION);
        assert_eq!(edge(&crank, 0), EdgeResult::Rearmed);
        for d in durations {
            assert_eq!(edge(&crank, *d), EdgeResult::Accepted);
        }
        crank
    }

    #[test]
    fn test_rpm_conversion() {
        assert_eq!(DefaultCps.duration_to_rpm(3000), 1000);
        assert_eq!(DefaultCps.duration_to_rpm(0), 0);
        assert_eq!(DefaultCps.duration_to_rpm(1), u16::MAX);
        assert_eq!(CustomCps.duration_to_rpm(6666), 1000);
        assert_eq!(CustomCps::MIN_DURATION, 888);
        let kind = RpmSensorKind::Custom(CustomCps);
        assert_eq!(kind.filter_window(), SLOTS);
        assert_eq!(kind.duration_to_rpm(6666), 1000);
    }

    #[test]
    fn test_bounce_filter() {
        let crank = running(&[3000]);
        let mut samples = 0;
        let res = critical_section::with(|cs| {
            crank.on_edge(cs, 500, || {
                samples += 1;
                samples == 2
            })
        });
        assert_eq!(res, EdgeResult::Bounced);
        assert!(!res.restart_timer());
        let snap = crank.snapshot();
        assert_eq!(snap.latest_raw_value(), 3000);
        assert_eq!(snap.current_slot(), 1);
    }

    #[test]
    fn test_trigger_polarity() {
        assert_eq!(CRANK_TRIGGER.isc_bits(), 0b10);
        let crank = running(&[3000]);
        let line = CRANK_TRIGGER.settled_high();
        let mut samples = 0;
        let res = critical_section::with(|cs| {
            crank.on_edge(cs, 2000, || {
                samples += 1;
                line
            })
        });
        assert_eq!(res, EdgeResult::Accepted);
        assert_eq!(samples, BOUNCE_SAMPLES);
        assert_eq!(crank.snapshot().latest_raw_value(), 2000);

        // A rising edge trigger would see its own pulse as bounce.
        let line = TriggerEdge::Rising.settled_high();
        let res = critical_section::with(|cs| crank.on_edge(cs, 2000, || line));
        assert_eq!(res, EdgeResult::Bounced);
    }

    #[test]
    fn test_filtered() {
        let crank = running(&[3000, 3000, 3000, 2000, 2000, 2000, 2000, 2000]);
        let snap = crank.snapshot();
        assert_eq!(snap.latest_measure(&DefaultCps), 1500);
        assert_eq!(snap.latest_measure_filtered(&DefaultCps), 1500);
        assert_eq!(snap.latest_measure_two_teeth(&DefaultCps), 1500);

        let crank = running(&[3000, 3000, 3000, 3000, 2000]);
        let snap = crank.snapshot();
        // (4 * 3000 + 2000) / 5 = 2800
        assert_eq!(snap.latest_measure_filtered(&DefaultCps), 1071);
        // (3000 + 2000) / 2 = 2500
        assert_eq!(snap.latest_measure_two_teeth(&DefaultCps), 1200);
    }

    #[test]
    fn test_stall() {
        let crank = running(&[3000; 12]);
        assert_eq!(crank.snapshot().latest_measure(&DefaultCps), 1000);
        critical_section::with(|cs| crank.on_stall(cs));
        let snap = crank.snapshot();
        assert!(snap.is_stalled());
        assert_eq!(snap.latest_raw_value(), 0);
        assert_eq!(snap.latest_measure(&DefaultCps), 0);
        assert_eq!(snap.latest_measure_filtered(&DefaultCps), 0);
        assert_eq!(snap.durations(), &[0; SLOTS]);
        assert_eq!(snap.current_slot(), 0);

        // The first edge only re-arms.
        assert_eq!(edge(&crank, 65535), EdgeResult::Rearmed);
        assert_eq!(crank.snapshot().latest_measure(&DefaultCps), 0);
        assert_eq!(edge(&crank, 3000), EdgeResult::Accepted);
        assert_eq!(crank.snapshot().latest_measure(&DefaultCps), 1000);
    }

    #[test]
    fn test_deviation() {
        let mut d = [3000_u16; SLOTS];
        d[0] = 40000;
        d[1] = 40000;
        d[2] = 500;
        d[3] = 500;
        d[4] = 3100;
        let crank = running(&d);
        let snap = crank.snapshot();
        assert_eq!(snap.deviation_for_cylinder(0), 0);
        assert_eq!(snap.deviation_for_cylinder(1), 32000);
        assert_eq!(snap.deviation_for_cylinder(2), 32000);

        let crank = running(&[3000, 3000, 3000, 3000, 3100, 3000]);
        let snap = crank.snapshot();
        assert_eq!(snap.deviation_for_cylinder(2), -100);
        assert_eq!(snap.deviation_for_cylinder(1), 0);
        assert_eq!(snap.deviation_for_cylinder(CYLINDERS), 0);

        let mut d = [500_u16; SLOTS];
        d[2] = 40000;
        d[3] = 40000;
        let snap = running(&d).snapshot();
        assert_eq!(snap.deviation_for_cylinder(1), -32000);
    }

    #[test]
    fn test_unplausible_read_and_clear() {
        let crank = running(&[3000]);
        assert_eq!(edge(&crank, 100), EdgeResult::Unplausible);
        assert_eq!(edge(&crank, 2900), EdgeResult::Rearmed);
        assert_eq!(edge(&crank, 3000), EdgeResult::Accepted);
        assert_eq!(crank.get_error(), 1);
        assert_eq!(crank.get_error(), 0);
        assert_eq!(crank.snapshot().current_slot(), 2);
    }

    #[test]
    fn test_needle_timing() {
        let crank = running(&[3000]);
        critical_section::with(|cs| {
            crank.on_needle_edge(cs, 100);
            // Not re-armed yet.
            crank.on_needle_edge(cs, 900);
        });
        assert_eq!(crank.snapshot().timing_diff(), Some(100));
        edge(&crank, 3000);
        critical_section::with(|cs| crank.on_needle_edge(cs, 200));
        assert_eq!(crank.snapshot().timing_diff(), Some(150));
        assert_eq!(DefaultCps.ticks_to_decidegrees(150, 3000), 36);
    }
}

// vim: ts=4 sw=4 expandtab
