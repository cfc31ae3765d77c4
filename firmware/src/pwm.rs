//! PWM and relay outputs.
//!
//! Timer 3 drives the QA servo with 10 bit fast PWM.
//! Timer 4 drives the timing and boost solenoids with 8 bit fast PWM.

use crate::hw::{PA_RELAY_FAN, PA_RELAY_GLOW, mcu};
use edc::hal::{Actuators, PwmChannel, Relay};

pub struct Outputs {
    tc3: mcu::TC3,
    tc4: mcu::TC4,
    porta: mcu::PORTA,
}

impl Outputs {
    #[rustfmt::skip]
    pub fn new(tc3: mcu::TC3, tc4: mcu::TC4, porta: mcu::PORTA) -> Self {
        // SAFETY: The PWM timers are only used by this driver.
        unsafe {
            // COM3A1, WGM31:30 + WGM32: fast PWM 10 bit. CS: 1 -> 15.6 kHz.
            tc3.ocr3a.write(|w| w.bits(0));
            tc3.tccr3a.write(|w| w.bits((1 << 7) | 0x03));
            tc3.tccr3b.write(|w| w.bits((1 << 3) | 0x01));

            // COM4A1, COM4C1, WGM40 + WGM42: fast PWM 8 bit. CS: 256 -> 244 Hz.
            tc4.ocr4a.write(|w| w.bits(0));
            tc4.ocr4c.write(|w| w.bits(0));
            tc4.tccr4a.write(|w| w.bits((1 << 7) | (1 << 3) | 0x01));
            tc4.tccr4b.write(|w| w.bits((1 << 3) | 0x04));
        }
        Self { tc3, tc4, porta }
    }
}

impl Actuators for Outputs {
    fn set_pwm(&mut self, chan: PwmChannel, duty: u16) {
        let duty = duty.min(chan.max_duty());
        // SAFETY: 16 bit compare register writes go through the TEMP register.
        //         No ISR touches timers 3 and 4.
        unsafe {
            match chan {
                PwmChannel::Qa => self.tc3.ocr3a.write(|w| w.bits(duty)),
                PwmChannel::Timing => self.tc4.ocr4a.write(|w| w.bits(duty)),
                PwmChannel::Boost => self.tc4.ocr4c.write(|w| w.bits(duty)),
            }
        }
    }

    fn set_relay(&mut self, relay: Relay, on: bool) {
        let mask = match relay {
            Relay::Glow => PA_RELAY_GLOW,
            Relay::Fan => PA_RELAY_FAN,
        };
        // SAFETY: PORTA only carries the relay outputs.
        unsafe {
            self.porta.porta.modify(|r, w| {
                if on {
                    w.bits(r.bits() | mask)
                } else {
                    w.bits(r.bits() & !mask)
                }
            });
        }
    }
}

// vim: ts=4 sw=4 expandtab
