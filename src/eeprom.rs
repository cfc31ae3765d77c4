//! Byte addressed non-volatile storage.

pub const EEPROM_SIZE: usize = 4096;

/// Value of an erased cell.
pub const ERASED: u8 = 0xFF;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum EepromError {
    #[error("EEPROM access out of range: {addr:#06x}+{len}")]
    OutOfRange { addr: usize, len: usize },
}

pub trait Eeprom {
    fn size(&self) -> usize;

    fn read(&self, addr: usize, buf: &mut [u8]) -> Result<(), EepromError>;

    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), EepromError>;

    fn check_range(&self, addr: usize, len: usize) -> Result<(), EepromError> {
        match addr.checked_add(len) {
            Some(end) if end <= self.size() => Ok(()),
            _ => Err(EepromError::OutOfRange { addr, len }),
        }
    }

    fn read_u16(&self, addr: usize) -> Result<u16, EepromError> {
        let mut b = [0; 2];
        self.read(addr, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn write_u16(&mut self, addr: usize, v: u16) -> Result<(), EepromError> {
        self.write(addr, &v.to_le_bytes())
    }
}

/// EEPROM image in RAM.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RamEeprom<const N: usize = EEPROM_SIZE> {
    data: [u8; N],
}

impl<const N: usize> RamEeprom<N> {
    pub const fn new() -> Self {
        Self { data: [ERASED; N] }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl<const N: usize> Default for RamEeprom<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Eeprom for RamEeprom<N> {
    fn size(&self) -> usize {
        N
    }

    fn read(&self, addr: usize, buf: &mut [u8]) -> Result<(), EepromError> {
        self.check_range(addr, buf.len())?;
        buf.copy_from_slice(&self.data[addr..addr + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), EepromError> {
        self.check_range(addr, data.len())?;
        self.data[addr..addr + data.len()].copy_from_slice(data);
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab
