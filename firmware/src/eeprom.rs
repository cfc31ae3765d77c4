use crate::hw::{interrupt, mcu};
use edc::eeprom::{EEPROM_SIZE, Eeprom, EepromError};

const EERE: u8 = 1 << 0;
const EEPE: u8 = 1 << 1;

/// On-chip EEPROM.
pub struct AvrEeprom {
    ee: mcu::EEPROM,
}

impl AvrEeprom {
    pub fn new(ee: mcu::EEPROM) -> Self {
        Self { ee }
    }

    fn wait_ready(&self) {
        while self.ee.eecr.read().bits() & EEPE != 0 {
            avr_device::asm::wdr();
        }
    }

    fn read_byte(&self, addr: u16) -> u8 {
        self.wait_ready();
        // SAFETY: Address and strobe of a read access.
        unsafe {
            self.ee.eear.write(|w| w.bits(addr));
            self.ee.eecr.write(|w| w.bits(EERE));
        }
        self.ee.eedr.read().bits()
    }

    fn write_byte(&mut self, addr: u16, data: u8) {
        self.wait_ready();
        interrupt::free(|_| {
            // SAFETY: EEPE must follow EEMPE within four cycles.
            //         Interrupts are disabled and the sbi pair is back to back.
            unsafe {
                self.ee.eear.write(|w| w.bits(addr));
                self.ee.eedr.write(|w| w.bits(data));
                core::arch::asm!(
                    "sbi {EECR}, 2", // EEMPE
                    "sbi {EECR}, 1", // EEPE
                    EECR = const 0x1F,
                    options(nostack, preserves_flags)
                );
            }
        });
    }
}

impl Eeprom for AvrEeprom {
    fn size(&self) -> usize {
        EEPROM_SIZE
    }

    fn read(&self, addr: usize, buf: &mut [u8]) -> Result<(), EepromError> {
        self.check_range(addr, buf.len())?;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte((addr + i) as u16);
        }
        Ok(())
    }

    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), EepromError> {
        self.check_range(addr, data.len())?;
        for (i, &b) in data.iter().enumerate() {
            let a = (addr + i) as u16;
            // Spare the cell if it already holds the value.
            if self.read_byte(a) != b {
                self.write_byte(a, b);
            }
        }
        Ok(())
    }
}

// vim: ts=4 sw=4 expandtab
