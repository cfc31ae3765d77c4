//! Injection timing control through the N108 solenoid.
//!
//! The needle lift sensor fires some ticks after the flywheel mark. The mark
//! sits at [BTDC_MARK] so the measured advance is the mark position minus the
//! angle covered by the needle delay.

use crate::{
    controls::{Controls, Value},
    crank::{CrankSnapshot, RpmSensor},
    fixpt::Fixpt,
    hal::{Actuators, PwmChannel},
    maps::MapId,
    node::NodeId,
    pid::{Pid, PidParams},
    registry::Registry,
};

/// Flywheel mark position in 0.1 degrees before TDC.
pub const BTDC_MARK: i32 = 605;

pub const TIMING_DUTY_MAX: i32 = 242;

/// Resolution of the closed loop advance map in 0.1 degrees.
pub const ADVANCE_MAP_STEP: i32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimingMode {
    Off,
    OpenLoop,
    ClosedLoop,
}

impl TimingMode {
    pub fn from_node(v: i32) -> Self {
        match v {
            1 => Self::OpenLoop,
            2 => Self::ClosedLoop,
            _ => Self::Off,
        }
    }
}

/// Measured advance in 0.1 degrees. `None` without a needle measurement.
pub fn measured_advance(crank: &CrankSnapshot, sensor: &impl RpmSensor) -> Option<i32> {
    let duration = crank.latest_raw_value();
    match crank.timing_diff() {
        Some(diff) if duration != 0 && !crank.is_stalled() => {
            Some(BTDC_MARK - sensor.ticks_to_decidegrees(diff as u32, duration as u32))
        }
        _ => None,
    }
}

pub struct TimingControl {
    pid: Pid,
}

impl TimingControl {
    pub const fn new() -> Self {
        Self { pid: Pid::new() }
    }

    fn params(reg: &Registry) -> PidParams {
        PidParams::from_percent(
            reg.value(NodeId::TimingKp),
            reg.value(NodeId::TimingKi),
            0,
            0,
            TIMING_DUTY_MAX,
        )
    }

    pub fn update(
        &mut self,
        reg: &mut Registry,
        controls: &mut Controls,
        crank: &CrankSnapshot,
        sensor: &impl RpmSensor,
        out: &mut impl Actuators,
    ) {
        let mode = TimingMode::from_node(reg.value(NodeId::TimingMethod));
        let rpm8 = controls.axis(Value::Rpm8bit);
        let fuel8 = controls.axis(Value::FuelAmount8bit);
        let actual = measured_advance(crank, sensor);

        let mut target = 0;
        let mut amount = 0;
        let duty = match mode {
            TimingMode::Off => {
                self.pid.reset();
                0
            }
            TimingMode::OpenLoop => {
                self.pid.reset();
                let duty = reg.map_lookup(MapId::OpenLoopAdvance, rpm8, fuel8) as i32;
                duty.min(TIMING_DUTY_MAX)
            }
            TimingMode::ClosedLoop => {
                target = reg.map_lookup(MapId::ClosedLoopAdvance, rpm8, fuel8) as i32
                    * ADVANCE_MAP_STEP;
                match actual {
                    Some(actual) => {
                        self.pid.set_target(Fixpt::from_int(target));
                        let pid = self.pid.tick(&Self::params(reg), Fixpt::from_int(actual));
                        amount = pid.value;
                        pid.value
                    }
                    None => {
                        self.pid.reset();
                        0
                    }
                }
            }
        };

        controls.set(Value::EngineTimingTarget, target);
        controls.set(Value::EngineTimingActual, actual.unwrap_or(0));
        controls.set(Value::EngineTimingDiff, crank.timing_diff().unwrap_or(0) as i32);
        controls.set(
            Value::EngineTimingMeasuredDuration,
            crank.latest_raw_value() as i32,
        );
        controls.set(Value::EngineTimingDutyCycle, duty);
        controls.set(Value::TimingPidAmount, amount);
        reg.publish(NodeId::EngineTiming, actual.unwrap_or(0));

        out.set_pwm(PwmChannel::Timing, duty as u16);
    }
}

impl Default for TimingControl {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
