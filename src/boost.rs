//! Boost pressure control through the N75 valve.

use crate::{
    controls::{Controls, Value},
    fixpt::Fixpt,
    hal::{Actuators, PwmChannel},
    maps::MapId,
    node::NodeId,
    pid::{Clip, Pid, PidParams},
    registry::Registry,
    units::to_kpa,
};

pub const BOOST_DUTY_MAX: i32 = 255;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoostMode {
    Off,
    OpenLoop,
    ClosedLoop,
}

impl BoostMode {
    pub fn from_node(v: i32) -> Self {
        match v {
            1 => Self::OpenLoop,
            2 => Self::ClosedLoop,
            _ => Self::Off,
        }
    }
}

pub struct BoostControl {
    pid: Pid,
}

impl BoostControl {
    pub const fn new() -> Self {
        Self { pid: Pid::new() }
    }

    fn params(reg: &Registry) -> PidParams {
        let range = reg.value(NodeId::BoostPidRange) * BOOST_DUTY_MAX / 100;
        PidParams::from_percent(
            reg.value(NodeId::BoostKp),
            reg.value(NodeId::BoostKi),
            reg.value(NodeId::BoostKd),
            -range,
            range,
        )
        .with_speed(reg.value(NodeId::BoostSpeed))
        .with_bias(reg.value(NodeId::BoostBias))
    }

    pub fn update(&mut self, reg: &mut Registry, controls: &mut Controls, out: &mut impl Actuators) {
        let mode = BoostMode::from_node(reg.value(NodeId::BoostAdjusting));
        let rpm8 = controls.axis(Value::Rpm8bit);
        let tps8 = controls.axis_10bit(Value::TpsActual);
        let fuel8 = controls.axis(Value::FuelAmount8bit);
        let actual = controls.get(Value::BoostPressure);

        let target_raw = reg.map_lookup(MapId::TurboTargetPressure, rpm8, tps8);
        let target = to_kpa(reg.value(NodeId::MapKpa), target_raw as i32);

        let (duty, correction, clip) = if mode == BoostMode::Off {
            self.pid.reset();
            (0, 0, Clip::Ok)
        } else {
            let base = reg.map_lookup(MapId::TurboControl, rpm8, fuel8) as i32;
            let correction = if mode == BoostMode::ClosedLoop {
                self.pid.set_target(Fixpt::from_int(target));
                self.pid
                    .tick(&Self::params(reg), Fixpt::from_int(actual))
                    .value
            } else {
                self.pid.reset();
                0
            };
            let duty = base + correction;
            if duty > BOOST_DUTY_MAX {
                (BOOST_DUTY_MAX, correction, Clip::Max)
            } else if duty < 0 {
                (0, correction, Clip::Min)
            } else {
                (duty, correction, Clip::Ok)
            }
        };

        // Linearize the valve.
        let n75 = if mode == BoostMode::Off {
            0
        } else {
            reg.map_lookup(MapId::ActuatorTension, duty as u8, 0)
        };

        controls.set(Value::BoostTarget, target);
        controls.set(Value::BoostPidCorrection, correction);
        controls.set(Value::BoostValveDutyCycle, duty);
        controls.set(Value::BoostActuatorClipReason, clip as i32);
        controls.set(Value::N75DutyCycle, n75 as i32);
        reg.publish(NodeId::BoostTarget, target);
        reg.publish(NodeId::BoostActual, actual);

        out.set_pwm(PwmChannel::Boost, n75 as u16);
    }
}

impl Default for BoostControl {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
