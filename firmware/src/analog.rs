use crate::{
    hw::mcu,
    mutex::{IrqCtx, LazyMainInit, MainCtx},
};
use edc::analog::{AdcChannel, AdcSampler};

#[allow(non_snake_case)]
pub struct AdcPeriph {
    pub ADC: mcu::ADC,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static ADC_PERIPH: LazyMainInit<AdcPeriph> = unsafe { LazyMainInit::uninit() };

pub static ADC_SAMPLER: AdcSampler = AdcSampler::new();

const REFS0: u8 = 1 << 6;
const ADEN: u8 = 1 << 7;
const ADSC: u8 = 1 << 6;
const ADIE: u8 = 1 << 3;
const ADPS_128: u8 = 0x07;
const MUX5: u8 = 1 << 3;

fn select(adc: &mcu::ADC, chan: AdcChannel) {
    let mux5 = if chan.bank_high() { MUX5 } else { 0 };
    // SAFETY: Only the mux and reference bits are written.
    unsafe {
        adc.adcsrb.modify(|r, w| w.bits((r.bits() & !MUX5) | mux5));
        adc.admux.write(|w| w.bits(REFS0 | chan.mux()));
    }
}

#[rustfmt::skip]
pub fn adc_init(m: &MainCtx) {
    let adc = &ADC_PERIPH.deref(m).ADC;
    // SAFETY: The converter is idle. Its interrupt is not enabled yet.
    unsafe {
        adc.adcsra.write(|w| w.bits(0));
        adc.adcsrb.write(|w| w.bits(0));
        adc.didr0.write(|w| w.bits(0xFF));
        adc.didr2.write(|w| w.bits(0xFF));
    }
    let first = critical_section::with(|cs| ADC_SAMPLER.current_channel(cs));
    select(adc, first);
    // SAFETY: Start the first conversion. The chain continues in the ISR.
    unsafe {
        adc.adcsra.write(|w| w.bits(ADEN | ADSC | ADIE | ADPS_128));
    }
}

pub fn irq_handler_adc(c: &IrqCtx<'_>) {
    let adc = &ADC_PERIPH.deref_irq(c).ADC;
    let sample = adc.adc.read().bits();
    let next = ADC_SAMPLER.on_conversion_complete(c.cs(), sample);
    select(adc, next);
    // SAFETY: Setting ADSC starts the next conversion.
    unsafe {
        adc.adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
    }
}

// vim: ts=4 sw=4 expandtab
