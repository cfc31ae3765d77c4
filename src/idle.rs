//! Idle speed control.
//!
//! Only active in [RunMode::PidIdle] with the idle loop enabled. The output is
//! the fuel amount, bounded by the idle fuel nodes.

use crate::{
    controls::{Controls, RunMode, Value},
    fixpt::Fixpt,
    maps::MapId,
    node::NodeId,
    pid::{Pid, PidParams},
    registry::Registry,
    units::idle_rpm_to_axis,
};

/// Gain schedule map value of unity gain.
const KP_SCHEDULE_UNITY: i32 = 10;

pub struct IdleControl {
    pid: Pid,
    active: bool,
}

impl IdleControl {
    pub const fn new() -> Self {
        Self {
            pid: Pid::new(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn params(reg: &mut Registry, rpm: i32) -> PidParams {
        let schedule = reg.map_lookup(MapId::IdlePidP, idle_rpm_to_axis(rpm), 0) as i32;
        PidParams::from_percent(
            reg.value(NodeId::IdleKp) * schedule / KP_SCHEDULE_UNITY,
            reg.value(NodeId::IdleKi),
            reg.value(NodeId::IdleKd),
            reg.value(NodeId::IdleMinFuel),
            reg.value(NodeId::IdleMaxFuel),
        )
        .with_speed(reg.value(NodeId::IdlePidSpeed))
        .with_bias(reg.value(NodeId::IdlePidBias))
    }

    /// Returns the idle fuel amount or `None` if the loop is inactive.
    pub fn update(
        &mut self,
        mode: RunMode,
        rpm: i32,
        reg: &mut Registry,
        controls: &mut Controls,
    ) -> Option<i32> {
        let active = reg.flag(NodeId::IdleAdjusting) && mode == RunMode::PidIdle;
        if !active {
            if self.active {
                self.pid.reset();
            }
            self.active = false;
            controls.set(Value::IdlePidCorrection, 0);
            return None;
        }
        self.active = true;

        self.pid
            .set_target(Fixpt::from_int(reg.value(NodeId::IdleSpeedTarget)));
        let params = Self::params(reg, rpm);
        let out = self.pid.tick(&params, Fixpt::from_int(rpm));
        controls.set(Value::IdlePidCorrection, out.value);
        Some(out.value)
    }
}

impl Default for IdleControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixpt::fixpt;

    fn enabled() -> Registry {
        let mut reg = Registry::new();
        reg.set_node_value(NodeId::IdleAdjusting, 1);
        reg
    }

    #[test]
    fn test_disabled() {
        let mut reg = Registry::new();
        let mut controls = Controls::new();
        let mut idle = IdleControl::new();
        assert_eq!(idle.update(RunMode::PidIdle, 500, &mut reg, &mut controls), None);
        assert!(!idle.is_active());
    }

    #[test]
    fn test_bounded_output() {
        let mut reg = enabled();
        let mut controls = Controls::new();
        let mut idle = IdleControl::new();

        // Well below the idle target.
        let fuel = idle
            .update(RunMode::PidIdle, 400, &mut reg, &mut controls)
            .unwrap();
        assert!(fuel > 140 && fuel <= 520, "{fuel}");
        assert_eq!(controls.get(Value::IdlePidCorrection), fuel);

        // Far above: pulled down to the minimum fuel.
        let fuel = idle
            .update(RunMode::PidIdle, 1600, &mut reg, &mut controls)
            .unwrap();
        assert_eq!(fuel, 140);
    }

    #[test]
    fn test_reset_when_leaving_idle() {
        let mut reg = enabled();
        let mut controls = Controls::new();
        let mut idle = IdleControl::new();
        idle.update(RunMode::PidIdle, 400, &mut reg, &mut controls);
        assert!(idle.pid.integral() > fixpt!(0));
        assert_eq!(idle.update(RunMode::LowLoad, 1500, &mut reg, &mut controls), None);
        assert_eq!(idle.pid.integral(), fixpt!(0));
        assert_eq!(controls.get(Value::IdlePidCorrection), 0);
    }
}

// vim: ts=4 sw=4 expandtab
