pub use avr_device::atmega2560::{self as mcu, Peripherals};
pub use avr_device::interrupt;

use crate::mutex::IrqCtx;

macro_rules! define_isr {
    ($name:ident, $handler:path) => {
        #[avr_device::interrupt(atmega2560)]
        fn $name() {
            // SAFETY: We are inside of an interrupt handler.
            // Therefore, it is safe to construct an `IrqCtx`.
            let c = unsafe { IrqCtx::new() };
            $handler(&c);
        }
    };
}

define_isr!(ADC, crate::analog::irq_handler_adc);
define_isr!(INT4, crate::crank::irq_handler_crank_edge);
define_isr!(INT5, crate::crank::irq_handler_needle_edge);
define_isr!(TIMER1_COMPA, crate::crank::irq_handler_stall);
define_isr!(TIMER0_COMPA, crate::timer::irq_handler_timer0_compa);
#[cfg(feature = "debug")]
define_isr!(USART0_TX, crate::uart::irq_handler_usart0_tx);

/// Relay outputs on PORTA.
pub const PA_RELAY_FAN: u8 = 1 << 2;
pub const PA_RELAY_GLOW: u8 = 1 << 4;

/// PE3: QA servo PWM (OC3A).
pub const PE_PWM_QA: u8 = 1 << 3;
/// PE4: crank position sensor (INT4).
pub const PE_CRANK: u8 = 1 << 4;
/// PE5: needle lift sensor (INT5).
pub const PE_NEEDLE: u8 = 1 << 5;

/// PH3: timing solenoid PWM (OC4A).
pub const PH_PWM_TIMING: u8 = 1 << 3;
/// PH5: boost valve PWM (OC4C).
pub const PH_PWM_BOOST: u8 = 1 << 5;

#[rustfmt::skip]
pub fn ports_init(porta: &mcu::PORTA, porte: &mcu::PORTE, porth: &mcu::PORTH) {
    // SAFETY: Plain GPIO configuration before interrupts are enabled.
    unsafe {
        porta.porta.write(|w| w.bits(0));
        porta.ddra.write(|w| w.bits(PA_RELAY_FAN | PA_RELAY_GLOW));

        porte.porte.write(|w| w.bits(0));
        porte.ddre.write(|w| w.bits(PE_PWM_QA));

        porth.porth.write(|w| w.bits(0));
        porth.ddrh.write(|w| w.bits(PH_PWM_TIMING | PH_PWM_BOOST));
    }
}

// vim: ts=4 sw=4 expandtab
