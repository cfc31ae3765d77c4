//! Actuator boundary. Implemented by the register level drivers.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PwmChannel {
    /// Quantity adjuster servo.
    Qa,
    /// Injection timing solenoid (N108).
    Timing,
    /// Boost pressure valve (N75).
    Boost,
}

impl PwmChannel {
    pub const fn max_duty(self) -> u16 {
        match self {
            Self::Qa => 1023,
            Self::Timing | Self::Boost => 255,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Relay {
    Glow,
    Fan,
}

pub trait Actuators {
    /// Set a PWM duty cycle in `0..=chan.max_duty()`.
    fn set_pwm(&mut self, chan: PwmChannel, duty: u16);

    fn set_relay(&mut self, relay: Relay, on: bool);
}


// vim: ts=4 sw=4 expandtab
