use crate::{
    hw::mcu,
    mutex::{IrqCtx, LazyMainInit, MainCtx},
};
use edc::{mutex::MutexCell, timer::Timestamp};

#[allow(non_snake_case)]
pub struct TimerPeriph {
    pub TC0: mcu::TC0,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static TIMER_PERIPH: LazyMainInit<TimerPeriph> = unsafe { LazyMainInit::uninit() };

static MILLIS: MutexCell<u32> = MutexCell::new(0);

#[rustfmt::skip]
pub fn timer_init(m: &MainCtx) {
    let tc0 = &TIMER_PERIPH.deref(m).TC0;
    // Timer 0 configuration:
    // CTC, CS: 64, TOP: 249 -> 1 ms per compare match.
    // SAFETY: Interrupts are not enabled yet.
    unsafe {
        tc0.tccr0a.write(|w| w.bits(1 << 1)); // WGM01
        tc0.tcnt0.write(|w| w.bits(0));
        tc0.ocr0a.write(|w| w.bits(249));
        tc0.timsk0.write(|w| w.bits(1 << 1)); // OCIE0A
        tc0.tccr0b.write(|w| w.bits(0x03));
    }
}

pub fn irq_handler_timer0_compa(c: &IrqCtx<'_>) {
    let ms = MILLIS.get(c.cs());
    MILLIS.set(c.cs(), ms.wrapping_add(1));
}

/// Milliseconds since reset.
pub fn timer_get() -> Timestamp {
    critical_section::with(|cs| Timestamp::from_ticks(MILLIS.get(cs)))
}

// vim: ts=4 sw=4 expandtab
