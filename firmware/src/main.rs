#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod analog;
mod crank;
mod eeprom;
mod hw;
mod mutex;
mod pwm;
mod timer;
#[cfg(feature = "debug")]
mod uart;

use crate::{
    analog::{ADC_PERIPH, ADC_SAMPLER, AdcPeriph, adc_init},
    crank::{CRANK, CRANK_PERIPH, CrankPeriph, SENSOR, crank_init},
    eeprom::AvrEeprom,
    hw::{Peripherals, interrupt, mcu, ports_init},
    mutex::{MainCtx, unwrap_option},
    pwm::Outputs,
    timer::{TIMER_PERIPH, TimerPeriph, timer_get, timer_init},
};
use edc::{system::System, timer::RelTimestamp};

/// Control loop period.
const LOOP_PERIOD: RelTimestamp = RelTimestamp::from_millis(10);

fn wdt_init() {
    // SAFETY: The asm code only accesses the WDT registers
    //         which are not accessed from anywhere else in the program.
    unsafe {
        // Enable WDT with timeout 250 ms
        core::arch::asm!(
            "ldi {tmp}, 0x18", // WDCE=1, WDE=1
            "sts {WDTCSR}, {tmp}",
            "ldi {tmp}, 0x0C", // WDE=1, WDP2=1
            "sts {WDTCSR}, {tmp}",
            tmp = out(reg_upper) _,
            WDTCSR = const 0x60,
            options(nostack, preserves_flags)
        );
    }
}

fn wdt_poke(_wp: &mcu::WDT) {
    avr_device::asm::wdr();
}

#[avr_device::entry]
fn main() -> ! {
    wdt_init();

    let dp = unwrap_option(Peripherals::take());

    ports_init(&dp.PORTA, &dp.PORTE, &dp.PORTH);

    let ap = AdcPeriph { ADC: dp.ADC };
    let cp = CrankPeriph {
        TC1: dp.TC1,
        EXINT: dp.EXINT,
        PORTE: dp.PORTE,
    };
    let tp = TimerPeriph { TC0: dp.TC0 };
    #[cfg(feature = "debug")]
    let up = uart::UartPeriph {
        USART0: dp.USART0,
    };

    let init_static_vars = |ctx| {
        ADC_PERIPH.init(ctx, ap);
        CRANK_PERIPH.init(ctx, cp);
        TIMER_PERIPH.init(ctx, tp);
        #[cfg(feature = "debug")]
        uart::UART_PERIPH.init(ctx, up);
    };

    // # SAFETY
    //
    // This is the context handle for the main() function.
    // Holding a reference to this object proves that the holder
    // is running in main() context.
    let m = unsafe { MainCtx::new_with_init(init_static_vars) };

    let mut out = Outputs::new(dp.TC3, dp.TC4, dp.PORTA);
    let mut ee = AvrEeprom::new(dp.EEPROM);

    // Defaults stay active if the stored configuration is unusable.
    let mut system = System::new(SENSOR);
    system.init(&mut ee).ok();
    wdt_poke(&dp.WDT);

    timer_init(&m);
    adc_init(&m);
    crank_init(&m);
    #[cfg(feature = "debug")]
    uart::uart_init(&m);

    // SAFETY: This must be after construction of MainCtx
    //         and after initialization of static MainInit variables.
    unsafe { interrupt::enable() };

    let mut next = timer_get();
    loop {
        let now = timer_get();
        if now >= next {
            next = now + LOOP_PERIOD;
            system.run(&ADC_SAMPLER, &CRANK, &mut out, &mut ee, now);
        }
        wdt_poke(&dp.WDT);
    }
}

// vim: ts=4 sw=4 expandtab
