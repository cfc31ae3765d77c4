use crate::fixpt::{Fixpt, fixpt};

/// Setpoint ramp of the generic controllers.
/// Disabled: the setpoint follows the target immediately.
pub const SETPOINT_RAMP_ENA: bool = false;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Clip {
    Ok = 0,
    Max = 1,
    Min = 2,
}

/// Controller parameters. Rebuilt from the nodes on every tick.
#[derive(Clone, Debug)]
pub struct PidParams {
    pub kp: Fixpt,
    pub ki: Fixpt,
    pub kd: Fixpt,
    /// Output and integral bounds.
    pub min: i32,
    pub max: i32,
    /// Setpoint ramp step per tick.
    pub speed: Fixpt,
    /// Gain applied to negative deviations.
    pub bias: Option<Fixpt>,
}

impl PidParams {
    /// Parameters from percent gains, as stored in the nodes.
    pub fn from_percent(kp: i32, ki: i32, kd: i32, min: i32, max: i32) -> Self {
        Self {
            kp: Fixpt::from_fraction(kp, 100),
            ki: Fixpt::from_fraction(ki, 100),
            kd: Fixpt::from_fraction(kd, 100),
            min,
            max,
            speed: Fixpt::MAX,
            bias: None,
        }
    }

    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = Fixpt::from_int(speed);
        self
    }

    /// Negative deviation gain in percent.
    pub fn with_bias(mut self, bias: i32) -> Self {
        self.bias = Some(Fixpt::from_fraction(bias, 100));
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PidOutput {
    pub value: i32,
    pub p: Fixpt,
    pub i: Fixpt,
    pub d: Fixpt,
    pub clip: Clip,
}

pub struct Pid {
    ramp: bool,
    target: Fixpt,
    sp: Fixpt,
    i: Fixpt,
    prev_e: Fixpt,
}

impl Pid {
    pub const fn new() -> Self {
        Self::with_ramp(SETPOINT_RAMP_ENA)
    }

    pub const fn with_ramp(ramp: bool) -> Self {
        Self {
            ramp,
            target: fixpt!(0),
            sp: fixpt!(0),
            i: fixpt!(0),
            prev_e: fixpt!(0),
        }
    }

    pub fn set_target(&mut self, target: Fixpt) {
        self.target = target;
    }

    pub fn target(&self) -> Fixpt {
        self.target
    }

    /// Current working setpoint.
    pub fn setpoint(&self) -> Fixpt {
        self.sp
    }

    /// Jump the setpoint to the target.
    pub fn settle(&mut self) {
        self.sp = self.target;
    }

    fn step_setpoint(&mut self, speed: Fixpt) {
        if !self.ramp {
            self.sp = self.target;
        } else if self.sp < self.target {
            self.sp = (self.sp + speed).min(self.target);
        } else {
            self.sp = (self.sp - speed).max(self.target);
        }
    }

    pub fn tick(&mut self, params: &PidParams, r: Fixpt) -> PidOutput {
        self.step_setpoint(params.speed);

        // deviation
        let mut e = self.sp - r;
        if e < fixpt!(0) {
            if let Some(bias) = params.bias {
                e = e * bias;
            }
        }

        let min = Fixpt::from_int(params.min);
        let max = Fixpt::from_int(params.max.max(params.min));

        // P term
        let p = params.kp * e;

        // I term
        let i = (self.i + params.ki * e).clamp(min, max);
        self.i = i;

        // D term
        let d = params.kd * (e - self.prev_e);
        self.prev_e = e;

        let out = (p + i + d).to_int();
        let (value, clip) = if out > max.to_int() {
            (max.to_int(), Clip::Max)
        } else if out < min.to_int() {
            (min.to_int(), Clip::Min)
        } else {
            (out, Clip::Ok)
        };

        PidOutput {
            value,
            p,
            i,
            d,
            clip,
        }
    }

    /// Clear the integral. The deviation history is kept.
    pub fn reset(&mut self) {
        self.i = fixpt!(0);
    }

    pub fn integral(&self) -> Fixpt {
        self.i
    }
}

impl Default for Pid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gains() {
        let params = PidParams::from_percent(0, 0, 0, -100, 100);
        let mut pid = Pid::new();
        pid.set_target(Fixpt::from_int(500));
        for r in [0, 200, 900, -50] {
            let out = pid.tick(&params, Fixpt::from_int(r));
            assert_eq!(out.value, 0);
            assert_eq!(out.clip, Clip::Ok);
        }

        let params = PidParams::from_percent(0, 0, 0, 10, 100);
        let out = pid.tick(&params, fixpt!(0));
        assert_eq!(out.value, 10);
    }

    #[test]
    fn test_integral_winds_up_to_max() {
        let params = PidParams::from_percent(0, 10, 0, 0, 255);
        let mut pid = Pid::new();
        pid.set_target(Fixpt::from_int(100));
        let mut prev = pid.integral();
        for _ in 0..100 {
            pid.tick(&params, fixpt!(0));
            assert!(pid.integral() >= prev);
            prev = pid.integral();
        }
        assert_eq!(pid.integral(), Fixpt::from_int(255));
        let out = pid.tick(&params, fixpt!(0));
        assert_eq!(out.value, 255);

        pid.reset();
        assert_eq!(pid.integral(), fixpt!(0));
    }

    #[test]
    fn test_pd_terms() {
        let params = PidParams::from_percent(200, 0, 100, -1000, 1000);
        let mut pid = Pid::new();
        pid.set_target(Fixpt::from_int(10));
        let out = pid.tick(&params, fixpt!(0));
        assert_eq!(out.p, Fixpt::from_int(20));
        assert_eq!(out.d, Fixpt::from_int(10));
        assert_eq!(out.value, 30);
        let out = pid.tick(&params, fixpt!(0));
        assert_eq!(out.d, fixpt!(0));
        assert_eq!(out.value, 20);
        let out = pid.tick(&params, Fixpt::from_int(2000));
        assert_eq!(out.clip, Clip::Min);
        assert_eq!(out.value, -1000);
    }

    #[test]
    fn test_bias() {
        let params = PidParams::from_percent(100, 0, 0, -1000, 1000).with_bias(50);
        let mut pid = Pid::new();
        pid.set_target(Fixpt::from_int(100));
        assert_eq!(pid.tick(&params, Fixpt::from_int(200)).value, -50);
        assert_eq!(pid.tick(&params, Fixpt::from_int(0)).value, 100);
    }

    #[test]
    fn test_ramp() {
        let params = PidParams::from_percent(0, 0, 0, 0, 0).with_speed(30);
        let mut pid = Pid::new();
        pid.set_target(Fixpt::from_int(100));
        pid.tick(&params, fixpt!(0));
        assert_eq!(pid.setpoint(), Fixpt::from_int(100));

        let mut pid = Pid::with_ramp(true);
        pid.set_target(Fixpt::from_int(100));
        pid.tick(&params, fixpt!(0));
        assert_eq!(pid.setpoint(), Fixpt::from_int(30));
        for _ in 0..3 {
            pid.tick(&params, fixpt!(0));
        }
        assert_eq!(pid.setpoint(), Fixpt::from_int(100));
        pid.set_target(Fixpt::from_int(80));
        pid.tick(&params, fixpt!(0));
        assert_eq!(pid.setpoint(), Fixpt::from_int(80));
    }
}

// vim: ts=4 sw=4 expandtab
