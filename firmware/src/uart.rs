use crate::{
    hw::mcu,
    mutex::{IrqCtx, LazyMainInit, MainCtx},
};
use edc::debug::DebugStream;

pub const BAUDRATE: u32 = 19200;
const UBRR: u16 = (edc::crank::F_CPU / 16 / BAUDRATE - 1) as u16;

const TXEN0: u8 = 1 << 3;
const TXCIE0: u8 = 1 << 6;
const UCSZ_8BIT: u8 = 0x06;

#[allow(non_snake_case)]
pub struct UartPeriph {
    pub USART0: mcu::USART0,
}

// SAFETY: Is initialized when constructing the MainCtx.
pub static UART_PERIPH: LazyMainInit<UartPeriph> = unsafe { LazyMainInit::uninit() };

static STREAM: DebugStream = DebugStream::new();

/// Configure 8N1 and send the first byte.
/// The transmit complete interrupt keeps the stream going.
#[rustfmt::skip]
pub fn uart_init(m: &MainCtx) {
    let u = &UART_PERIPH.deref(m).USART0;
    let first = critical_section::with(|cs| STREAM.next_byte(cs));
    // SAFETY: Interrupts are not enabled yet.
    unsafe {
        u.ubrr0.write(|w| w.bits(UBRR));
        u.ucsr0a.write(|w| w.bits(0));
        u.ucsr0c.write(|w| w.bits(UCSZ_8BIT));
        u.ucsr0b.write(|w| w.bits(TXEN0 | TXCIE0));
        u.udr0.write(|w| w.bits(first));
    }
}

pub fn irq_handler_usart0_tx(c: &IrqCtx<'_>) {
    let u = &UART_PERIPH.deref_irq(c).USART0;
    // SAFETY: The transmitter is idle after TX complete.
    unsafe {
        u.udr0.write(|w| w.bits(STREAM.next_byte(c.cs())));
    }
}

// vim: ts=4 sw=4 expandtab
