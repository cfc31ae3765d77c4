use crate::{
    fixpt::{Fixpt, fixpt},
    mutex::{CriticalSection, MutexCell},
};

pub const ADC_CHANNELS: usize = 16;
pub const ADC_MAX: u16 = 0x3FF;

/// Above this level an analog input is considered unconnected.
/// The internal pullup feeds almost the full reference voltage.
pub const ANALOG_INPUT_HIGH_STATE_LIMIT: u16 = 975;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AdcChannel {
    QaPos = 0,
    TempFuel,
    BatteryVoltage,
    UndefA,
    UndefB,
    ServoPos,
    Lambda,
    Egt,
    Map,
    TempIntake,
    TempGearbox,
    TempCoolant,
    TpsPos,
    TpsWotSw,
    Aux14,
    Aux15,
}

impl AdcChannel {
    pub const fn from_index(index: u8) -> Self {
        match index & 0x0F {
            0 => Self::QaPos,
            1 => Self::TempFuel,
            2 => Self::BatteryVoltage,
            3 => Self::UndefA,
            4 => Self::UndefB,
            5 => Self::ServoPos,
            6 => Self::Lambda,
            7 => Self::Egt,
            8 => Self::Map,
            9 => Self::TempIntake,
            10 => Self::TempGearbox,
            11 => Self::TempCoolant,
            12 => Self::TpsPos,
            13 => Self::TpsWotSw,
            14 => Self::Aux14,
            _ => Self::Aux15,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converter bank select (MUX5). Channels 8..15 live in the upper bank.
    pub const fn bank_high(self) -> bool {
        (self as u8 >> 3) & 1 != 0
    }

    /// Multiplexer bits within the selected bank.
    pub const fn mux(self) -> u8 {
        self as u8 & 0x07
    }

    /// Exponential smoothing factor for [AdcSmoother].
    pub const fn smoothing(self) -> Fixpt {
        match self {
            Self::QaPos => fixpt!(1 / 2),
            Self::TpsPos => fixpt!(1 / 2),
            Self::Map => fixpt!(1 / 4),
            Self::BatteryVoltage => fixpt!(1 / 16),
            Self::TempFuel | Self::TempIntake | Self::TempGearbox | Self::TempCoolant => {
                fixpt!(1 / 64)
            }
            Self::Lambda | Self::Egt => fixpt!(1 / 8),
            _ => fixpt!(1),
        }
    }
}

/// Read contract of the analog inputs.
pub trait AnalogInput {
    /// Latest raw 10 bit sample of a channel.
    fn read_value(&self, chan: AdcChannel) -> u16;

    /// QA feedback sample latched at the last crank edge.
    fn read_synced(&self) -> u16;
}

/// Round robin sampler. Filled from the conversion complete interrupt.
pub struct AdcSampler {
    buffer: [MutexCell<u16>; ADC_CHANNELS],
    chan: MutexCell<u8>,
    synced: MutexCell<u16>,
}

impl AdcSampler {
    pub const fn new() -> Self {
        Self {
            buffer: [const { MutexCell::new(0) }; ADC_CHANNELS],
            chan: MutexCell::new(0),
            synced: MutexCell::new(0),
        }
    }

    /// The channel the running conversion belongs to.
    pub fn current_channel(&self, cs: CriticalSection<'_>) -> AdcChannel {
        AdcChannel::from_index(self.chan.get(cs))
    }

    /// Conversion complete interrupt handler.
    ///
    /// Stores the result and returns the channel that must be converted next.
    pub fn on_conversion_complete(&self, cs: CriticalSection<'_>, sample: u16) -> AdcChannel {
        let chan = self.chan.get(cs);
        self.buffer[(chan & 0x0F) as usize].set(cs, sample & ADC_MAX);
        let next = chan.wrapping_add(1) & 0x0F;
        self.chan.set(cs, next);
        AdcChannel::from_index(next)
    }

    /// Latch the QA feedback. Called from the crank edge interrupt.
    pub fn latch_synced(&self, cs: CriticalSection<'_>) {
        let v = self.buffer[AdcChannel::QaPos.index()].get(cs);
        self.synced.set(cs, v);
    }
}

impl Default for AdcSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogInput for AdcSampler {
    fn read_value(&self, chan: AdcChannel) -> u16 {
        critical_section::with(|cs| self.buffer[chan.index()].get(cs))
    }

    fn read_synced(&self) -> u16 {
        critical_section::with(|cs| self.synced.get(cs))
    }
}

/// Per channel exponential smoothing.
pub struct AdcSmoother {
    out: [Option<Fixpt>; ADC_CHANNELS],
}

impl AdcSmoother {
    pub const fn new() -> Self {
        Self {
            out: [None; ADC_CHANNELS],
        }
    }

    pub fn reset(&mut self) {
        self.out = [None; ADC_CHANNELS];
    }

    pub fn read_value_averaged(&mut self, adc: &impl AnalogInput, chan: AdcChannel) -> u16 {
        let input = Fixpt::from(adc.read_value(chan));
        let out = match self.out[chan.index()] {
            // Snap to the first sample.
            None => input,
            Some(out) => out + (input - out) * chan.smoothing(),
        };
        self.out[chan.index()] = Some(out);
        out.to_int_round().clamp(0, ADC_MAX as i32) as u16
    }
}

impl Default for AdcSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Fixed analog input values.
    #[derive(Clone, Debug)]
    pub struct MockAdc {
        pub values: [u16; ADC_CHANNELS],
        pub synced: u16,
    }

    impl MockAdc {
        pub fn new() -> Self {
            Self {
                values: [0; ADC_CHANNELS],
                synced: 0,
            }
        }

        pub fn set(&mut self, chan: AdcChannel, v: u16) {
            self.values[chan.index()] = v;
        }
    }

    impl AnalogInput for MockAdc {
        fn read_value(&self, chan: AdcChannel) -> u16 {
            self.values[chan.index()]
        }

        fn read_synced(&self) -> u16 {
            self.synced
        }
    }
}


// vim: ts=4 sw=4 expandtab
