// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quantity adjuster servo loop.
//!
//! The fuel quantity target is a position in 0..1023. The feedback sensor is
//! scaled onto the same range and a ramped PID drives the servo PWM.

use crate::{
    analog::{AdcChannel, AdcSmoother, AnalogInput},
    controls::{Controls, RunMode, Value},
    dtc::{Dtc, DtcCode},
    fixpt::Fixpt,
    hal::{Actuators, PwmChannel},
    node::NodeId,
    pid::{Pid, PidParams},
    registry::Registry,
    units::scale_range,
};
use portable_atomic::{AtomicU8, Ordering};

pub const QA_POSITION_MAX: i32 = 1023;

/// Divisor of the QA PID gain nodes.
const QA_GAIN_DIV: i32 = 256;

/// Detects nested invocations of a routine.
pub struct CallGuard {
    depth: AtomicU8,
}

impl CallGuard {
    pub const fn new() -> Self {
        Self {
            depth: AtomicU8::new(0),
        }
    }

    /// Returns the token and whether another call is still active.
    pub fn enter(&self) -> (CallToken<'_>, bool) {
        let prev = self.depth.fetch_add(1, Ordering::AcqRel);
        (CallToken(&self.depth), prev != 0)
    }

    pub fn depth(&self) -> u8 {
        self.depth.load(Ordering::Acquire)
    }
}

impl Default for CallGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Leaves the guarded routine on drop.
pub struct CallToken<'a>(&'a AtomicU8);

impl Drop for CallToken<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Read the raw feedback from the source matching the run mode.
pub fn read_feedback(
    mode: RunMode,
    synced: bool,
    adc: &impl AnalogInput,
    smoother: &mut AdcSmoother,
) -> u16 {
    match mode {
        RunMode::Stopped | RunMode::Cranking => adc.read_value(AdcChannel::QaPos),
        RunMode::HighLoad => smoother.read_value_averaged(adc, AdcChannel::QaPos),
        RunMode::PidIdle | RunMode::LowLoad if synced => adc.read_synced(),
        RunMode::PidIdle | RunMode::LowLoad => adc.read_value(AdcChannel::QaPos),
    }
}

pub struct QuantityAdjuster {
    pid: Pid,
    accuracy: i32,
}

impl QuantityAdjuster {
    pub const fn new() -> Self {
        Self {
            pid: Pid::with_ramp(true),
            accuracy: 0,
        }
    }

    /// Request a position. Zero also drops the ramp and stops the servo.
    pub fn set_position(&mut self, target: i32) {
        let target = target.clamp(0, QA_POSITION_MAX);
        self.pid.set_target(Fixpt::from_int(target));
        if target == 0 {
            self.pid.settle();
        }
    }

    pub fn target(&self) -> i32 {
        self.pid.target().to_int()
    }

    /// Averaged absolute position deviation.
    pub fn accuracy(&self) -> i32 {
        self.accuracy
    }

    fn params(reg: &Registry) -> PidParams {
        let gain = |id| Fixpt::from_fraction(reg.value(id), QA_GAIN_DIV);
        PidParams {
            kp: gain(NodeId::QaPidKp),
            ki: gain(NodeId::QaPidKi),
            kd: gain(NodeId::QaPidKd),
            min: reg.value(NodeId::QaMinPwm),
            max: reg.value(NodeId::QaMaxPwm),
            speed: Fixpt::from_int(reg.value(NodeId::QaPidSpeed)),
            bias: None,
        }
        .with_bias(reg.value(NodeId::QaPidBias))
    }

    /// One servo step with the raw feedback sample `raw`.
    pub fn update(
        &mut self,
        guard: &CallGuard,
        raw: u16,
        reg: &mut Registry,
        controls: &mut Controls,
        out: &mut impl Actuators,
        dtc: &mut Dtc,
    ) {
        let (_token, nested) = guard.enter();
        if nested {
            dtc.set_error(DtcCode::Trap1);
        }

        let position = scale_range(
            raw as i32,
            reg.value(NodeId::QaFeedbackMin),
            reg.value(NodeId::QaFeedbackMax),
            QA_POSITION_MAX,
        );

        let pid = self.pid.tick(&Self::params(reg), Fixpt::from_int(position));
        let setpoint = self.pid.setpoint().to_int();
        self.accuracy = (self.accuracy + (setpoint - position).abs()) / 2;

        let duty = if self.target() == 0 {
            0
        } else {
            pid.value.clamp(0, PwmChannel::Qa.max_duty() as i32)
        };

        controls.set(Value::QaFeedbackActual, raw as i32);
        controls.set(Value::QaFeedbackRaw, position);
        controls.set(Value::QaFeedbackSetpoint, setpoint);
        controls.set(Value::QaPidP, pid.p.to_int());
        controls.set(Value::QaPidI, pid.i.to_int());
        controls.set(Value::QaPidD, pid.d.to_int());
        controls.set(Value::QaPwmActual, duty);
        controls.set(Value::QaJitter, self.accuracy);
        reg.publish(NodeId::QaSetPoint, setpoint);
        reg.publish(NodeId::QaDebugJitter, self.accuracy);

        if controls.get(Value::QaDebug) == 0 {
            out.set_pwm(PwmChannel::Qa, duty as u16);
        }
    }
}

impl Default for QuantityAdjuster {
    fn default() -> Self {
        Self::new()
    }
}


// vim: ts=4 sw=4 expandtab
