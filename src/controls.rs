//! Live measurement and computed value table.

/// Index into the [Controls] table.
///
/// The discriminants are stable. They are referenced by node bindings.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Value {
    None = 0,
    TpsRaw = 1,
    TpsActual = 2,
    TempEngine = 3,
    TempFuel = 4,
    TempAir = 5,
    BoostPressure = 6,
    EngineRpm = 7,
    EngineTimingTarget = 8,
    EngineTimingActual = 9,
    QaFeedbackActual = 10,
    QaFeedbackRaw = 11,
    QaFeedbackSetpoint = 12,
    QaPwmActual = 13,
    MapRaw = 14,
    MapActual = 15,
    EngineRpmDurationBetweenTeeth = 16,
    EngineTimingMeasuredDuration = 17,
    EngineRpmJitter = 18,
    QaPidP = 19,
    QaPidI = 20,
    QaPidD = 21,
    BatteryVoltage = 22,
    QaJitter = 23,
    RunMode = 24,
    EngineRpmFiltered = 25,
    EngineRpmMin = 26,
    EngineRpmMax = 27,
    InjectionThresholdVoltage = 28,
    OutputGlow = 29,
    OutputFan = 30,
    EngineTimingDutyCycle = 31,
    EngineTimingDiff = 32,
    N75DutyCycle = 33,
    OutputTestMode = 34,
    FuelAmount = 35,
    FuelAmount8bit = 36,
    Rpm8bit = 37,
    FuelBaseAmount = 38,
    FuelEnrichmentAmount = 39,
    FuelLimitAmount = 40,
    TempEngineInput = 41,
    TempFuelInput = 42,
    TempAirInput = 43,
    FuelTrim = 44,
    IdlePidCorrection = 45,
    BoostPidCorrection = 46,
    TimingPidAmount = 47,
    BoostTarget = 48,
    BoostValveDutyCycle = 49,
    CurrentTeeth = 50,
    BoostActuatorClipReason = 51,
    SraPosition = 52,
    SraTarget = 53,
    QaDebug = 54,
    ActuatorSetPoint = 55,
    ActuatorActualPosition = 56,
    EngineRpmRaw = 57,
}

impl Value {
    pub const COUNT: usize = 58;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Engine operating state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum RunMode {
    Stopped = 0,
    Cranking = 1,
    PidIdle = 2,
    LowLoad = 3,
    HighLoad = 4,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Controls {
    values: [i32; Value::COUNT],
}

impl Controls {
    pub const fn new() -> Self {
        Self {
            values: [0; Value::COUNT],
        }
    }

    #[inline]
    pub fn get(&self, value: Value) -> i32 {
        self.values[value.index()]
    }

    /// Write a slot. Writes to [Value::None] are discarded.
    #[inline]
    pub fn set(&mut self, value: Value, v: i32) {
        if value != Value::None {
            self.values[value.index()] = v;
        }
    }

    /// 8 bit map axis value of a slot holding 0..255.
    pub fn axis(&self, value: Value) -> u8 {
        self.get(value).clamp(0, 255) as u8
    }

    /// 8 bit map axis value of a slot holding 0..1023.
    pub fn axis_10bit(&self, value: Value) -> u8 {
        (self.get(value) >> 2).clamp(0, 255) as u8
    }

    /// Raw access by index, for bindings stored as plain bytes.
    pub fn get_index(&self, index: u8) -> Option<i32> {
        self.values.get(index as usize).copied()
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_unbound() {
        let mut c = Controls::new();
        c.set(Value::None, 42);
        assert_eq!(c.get(Value::None), 0);
        c.set(Value::EngineRpmRaw, 7);
        assert_eq!(c.get_index(57), Some(7));
        assert_eq!(c.get_index(58), None);
    }

    #[test]
    fn test_axis() {
        let mut c = Controls::new();
        c.set(Value::TpsActual, 1023);
        c.set(Value::Rpm8bit, 300);
        c.set(Value::FuelAmount, -4);
        assert_eq!(c.axis_10bit(Value::TpsActual), 255);
        assert_eq!(c.axis(Value::Rpm8bit), 255);
        assert_eq!(c.axis_10bit(Value::FuelAmount), 0);
    }

    #[test]
    fn test_run_mode_order() {
        assert!(RunMode::Cranking < RunMode::PidIdle);
        assert!(RunMode::HighLoad > RunMode::LowLoad);
        assert_eq!(RunMode::HighLoad as i32, 4);
    }

    #[test]
    fn test_stable_indices() {
        assert_eq!(Value::EngineRpm.index(), 7);
        assert_eq!(Value::RunMode.index(), 24);
        assert_eq!(Value::BoostActuatorClipReason.index(), 51);
        assert_eq!(Value::EngineRpmRaw.index(), Value::COUNT - 1);
    }
}

// vim: ts=4 sw=4 expandtab
