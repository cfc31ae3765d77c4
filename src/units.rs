//! Axis units, node display types and raw value conversions.

/// Unit tag of a map axis or map result.
///
/// Only used for display. Lookup math always runs in raw byte space.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AxisUnit {
    Raw = 0x00,
    Rpm = 0x01,
    Tps = 0x02,
    Kpa = 0x03,
    Celsius = 0x04,
    Voltage = 0x05,
    DutyCycle = 0x06,
    IdleRpm = 0x07,
    InjectionTiming = 0x08,
    InjectedFuel = 0x09,
    Seconds = 0x10,
    FuelTrimAmount = 0x11,
    Pwm8 = 0x12,
    None = 0xFF,
}

impl AxisUnit {
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Self::Raw,
            0x01 => Self::Rpm,
            0x02 => Self::Tps,
            0x03 => Self::Kpa,
            0x04 => Self::Celsius,
            0x05 => Self::Voltage,
            0x06 => Self::DutyCycle,
            0x07 => Self::IdleRpm,
            0x08 => Self::InjectionTiming,
            0x09 => Self::InjectedFuel,
            0x10 => Self::Seconds,
            0x11 => Self::FuelTrimAmount,
            0x12 => Self::Pwm8,
            0xFF => Self::None,
            _ => return None,
        })
    }

    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Human readable value of a raw axis byte.
    pub fn display(self, raw: u8, scale: &DisplayScale) -> i32 {
        let raw = raw as i32;
        match self {
            Self::Rpm => to_rpm(scale.rpm_scale, raw),
            Self::Tps => to_tps(raw),
            Self::Kpa => to_kpa(scale.map_kpa, raw),
            Self::Celsius => to_temperature(raw),
            Self::Voltage => to_voltage_mv(raw),
            Self::IdleRpm => to_idle_rpm(raw),
            Self::DutyCycle | Self::Pwm8 => raw * 100 / 255,
            Self::InjectedFuel => raw * 4,
            Self::FuelTrimAmount => raw - 128,
            Self::Raw | Self::InjectionTiming | Self::Seconds | Self::None => raw,
        }
    }
}

/// Node values the display conversions depend on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DisplayScale {
    /// Full scale of the MAP sensor in kPa.
    pub map_kpa: i32,
    /// RPM at axis value 255.
    pub rpm_scale: i32,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self {
            map_kpa: 300,
            rpm_scale: 5000,
        }
    }
}

/// Display format of a node value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ValueType {
    Int = 0,
    Hex = 1,
    Celsius = 2,
    FixedPoint2 = 3,
    Percentage = 4,
    Kpa = 5,
    Voltage = 6,
    Boolean = 7,
    InjectionTiming = 8,
    BatteryVoltage = 9,
    Ms = 10,
    Pwm8 = 11,
}

pub fn to_kpa(map_kpa: i32, raw: i32) -> i32 {
    map_kpa * raw / 255
}

pub fn to_temperature(raw: i32) -> i32 {
    raw * 3 / 4 - 35
}

/// Millivolts of an 8 bit sample.
pub fn to_voltage_mv(raw: i32) -> i32 {
    raw * 1964 / 100
}

pub fn to_rpm(rpm_scale: i32, raw: i32) -> i32 {
    rpm_scale * raw / 255
}

pub fn to_tps(raw: i32) -> i32 {
    raw * 100 / 255
}

pub fn to_idle_rpm(raw: i32) -> i32 {
    raw * 8
}

/// Scale an engine speed onto the 0..255 map axis.
pub fn rpm_to_axis(rpm_scale: i32, rpm: i32) -> u8 {
    if rpm_scale <= 0 {
        return 0;
    }
    (rpm.max(0) as i64 * 255 / rpm_scale as i64).min(255) as u8
}

/// Temperature axis value of a temperature in degrees Celsius.
pub fn temperature_to_axis(celsius: i32) -> u8 {
    ((celsius + 35) * 4 / 3).clamp(0, 255) as u8
}

/// Scale an idle speed onto the 0..255 idle axis.
pub fn idle_rpm_to_axis(rpm: i32) -> u8 {
    (rpm / 8).clamp(0, 255) as u8
}

/// Scale a value within `[min, max]` onto `[0, out_max]`, clamped.
pub fn scale_range(v: i32, min: i32, max: i32, out_max: i32) -> i32 {
    if max <= min {
        return 0;
    }
    let v = v.clamp(min, max);
    ((v - min) as i64 * out_max as i64 / (max - min) as i64) as i32
}


// vim: ts=4 sw=4 expandtab
