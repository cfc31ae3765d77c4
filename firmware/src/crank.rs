use crate::{
    analog::ADC_SAMPLER,
    hw::{PE_CRANK, mcu},
    mutex::{IrqCtx, LazyMainInit, MainCtx},
};
use edc::crank::{CRANK_TRIGGER, CrankTiming, DefaultCps, RpmSensorKind, TriggerEdge};

/// Installed crank position sensor.
pub const SENSOR: RpmSensorKind = RpmSensorKind::Default(DefaultCps);

pub static CRANK: CrankTiming = CrankTiming::new(SENSOR.min_duration_ticks());

#[allow(non_snake_case)]
pub struct CrankPeriph {
    pub TC1: mcu::TC1,
    pub EXINT: mcu::EXINT,
    pub PORTE: mcu::PORTE,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static CRANK_PERIPH: LazyMainInit<CrankPeriph> = unsafe { LazyMainInit::uninit() };

const WGM12: u8 = 1 << 3;
const OCIE1A: u8 = 1 << 1;

/// INT4 (crank) and INT5 (needle) both trigger on the falling edge.
const EICRB_MODE: u8 = CRANK_TRIGGER.isc_bits() | (TriggerEdge::Falling.isc_bits() << 2);
const INT4: u8 = 1 << 4;
const INT5: u8 = 1 << 5;

/// Timer 1 clock select matching the sensor time base.
const fn timer1_cs(sensor: RpmSensorKind) -> u8 {
    match sensor {
        RpmSensorKind::Default(_) => 0x03, // F_CPU / 64
        RpmSensorKind::Custom(_) => 0x01,  // F_CPU
    }
}

fn timer1_restart(tc1: &mcu::TC1) {
    // SAFETY: Timer 1 is owned by the crank ISRs.
    unsafe {
        tc1.tcnt1.write(|w| w.bits(0));
        tc1.tccr1b.write(|w| w.bits(WGM12 | timer1_cs(SENSOR)));
    }
}

#[rustfmt::skip]
pub fn crank_init(m: &MainCtx) {
    let p = CRANK_PERIPH.deref(m);
    // Timer 1 configuration:
    // CTC with TOP at OCR1A. A compare match means no edge in a full period.
    // SAFETY: Interrupts are not enabled yet.
    unsafe {
        p.TC1.tccr1a.write(|w| w.bits(0));
        p.TC1.tccr1b.write(|w| w.bits(0));
        p.TC1.ocr1a.write(|w| w.bits(0xFFFF));
        p.TC1.timsk1.write(|w| w.bits(OCIE1A));

        p.EXINT.eicrb.write(|w| w.bits(EICRB_MODE));
        p.EXINT.eifr.write(|w| w.bits(INT4 | INT5));
        p.EXINT.eimsk.write(|w| w.bits(INT4 | INT5));
    }
    timer1_restart(&p.TC1);
}

/// The valid pulse is the falling edge. The line must still read low here.
pub fn irq_handler_crank_edge(c: &IrqCtx<'_>) {
    let p = CRANK_PERIPH.deref_irq(c);
    let elapsed = p.TC1.tcnt1.read().bits();
    let res = CRANK.on_edge(c.cs(), elapsed, || {
        p.PORTE.pine.read().bits() & PE_CRANK != 0
    });
    if res.restart_timer() {
        timer1_restart(&p.TC1);
        ADC_SAMPLER.latch_synced(c.cs());
    }
}

pub fn irq_handler_needle_edge(c: &IrqCtx<'_>) {
    let p = CRANK_PERIPH.deref_irq(c);
    let since_crank_edge = p.TC1.tcnt1.read().bits();
    CRANK.on_needle_edge(c.cs(), since_crank_edge);
}

pub fn irq_handler_stall(c: &IrqCtx<'_>) {
    let p = CRANK_PERIPH.deref_irq(c);
    // Stop the timer until the next edge.
    // SAFETY: Timer 1 is owned by the crank ISRs.
    unsafe {
        p.TC1.tccr1b.write(|w| w.bits(0));
    }
    CRANK.on_stall(c.cs());
}

// vim: ts=4 sw=4 expandtab
