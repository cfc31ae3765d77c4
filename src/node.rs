//! Tunable and observable configuration parameters.

use crate::{controls::Value, units::ValueType};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum NodeProperty {
    /// Not shown by the UI.
    Hidden = 0,
    Editable = 1,
    /// Read only for the UI. Written by the control loop.
    Locked = 2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ConfigNode {
    /// Persistent record key.
    pub file_id: u16,
    pub value: i16,
    pub min: i16,
    pub max: i16,
    pub step: i16,
    /// Raw live value shown next to the node.
    pub raw: Value,
    /// Converted live value shown next to the node.
    pub actual: Value,
    pub property: NodeProperty,
    pub value_type: ValueType,
}

impl ConfigNode {
    pub fn clamp(&self, v: i32) -> i16 {
        v.clamp(self.min as i32, self.max as i32) as i16
    }

    pub fn is_locked(&self) -> bool {
        self.property == NodeProperty::Locked
    }
}

macro_rules! define_nodes {
    ($(
        $name:ident = $fid:literal,
            $def:expr, [$min:expr, $max:expr], $step:expr,
            $raw:ident, $actual:ident, $prop:ident, $ty:ident,
            $desc:literal;
    )*) => {
        /// Index into the node table.
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        #[repr(u8)]
        pub enum NodeId {
            $($name,)*
        }

        impl NodeId {
            pub const ALL: &'static [NodeId] = &[$(NodeId::$name,)*];
            pub const COUNT: usize = Self::ALL.len();

            pub const fn index(self) -> usize {
                self as usize
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(NodeId::$name => stringify!($name),)*
                }
            }

            pub const fn description(self) -> &'static str {
                match self {
                    $(NodeId::$name => $desc,)*
                }
            }
        }

        /// Compiled in node defaults, in [NodeId] order.
        pub const DEFAULT_NODES: [ConfigNode; NodeId::COUNT] = [
            $(ConfigNode {
                file_id: $fid,
                value: $def,
                min: $min,
                max: $max,
                step: $step,
                raw: Value::$raw,
                actual: Value::$actual,
                property: NodeProperty::$prop,
                value_type: ValueType::$ty,
            },)*
        ];
    };
}

define_nodes! {
    SoftwareVersion = 0x0000, 0x0103, [0x0103, 9999], 1,
        EngineRpmMin, EngineRpmMax, Locked, Hex,
        "Software version. Shows the lowest and highest RPM seen.";
    EngineRpm = 0x1001, 0, [0, 10000], 1,
        EngineRpmFiltered, EngineRpmJitter, Locked, Int,
        "Engine speed.";
    EngineTiming = 0x1002, 0, [-1000, 1000], 1,
        EngineTimingDiff, EngineTimingActual, Locked, InjectionTiming,
        "Measured injection timing.";
    TempEngine = 0x1003, 151, [0, 255], 1,
        TempEngineInput, TempEngine, Editable, Celsius,
        "Coolant temperature used when the sensor fails.";
    TempFuel = 0x1004, 109, [0, 255], 1,
        TempFuelInput, TempFuel, Editable, Celsius,
        "Fuel temperature used when the sensor fails.";
    TempAir = 0x1005, 109, [0, 255], 1,
        TempAirInput, TempAir, Editable, Celsius,
        "Intake air temperature used when the sensor fails.";
    Pressure = 0x1006, 0, [0, 1000], 1,
        MapRaw, BoostPressure, Locked, Kpa,
        "Manifold pressure.";
    HeartBeat = 0x1007, 0, [0, 3], 1,
        EngineRpmRaw, None, Locked, Int,
        "Control loop heart beat.";
    InjThresholdVoltage = 0x1008, 0, [0, 1023], 1,
        InjectionThresholdVoltage, None, Locked, Voltage,
        "Needle lift sensor threshold voltage.";
    BatteryVoltage = 0x1009, 0, [0, 1023], 1,
        BatteryVoltage, None, Locked, BatteryVoltage,
        "Battery voltage.";
    RunMode = 0x100A, 0, [0, 4], 1,
        None, RunMode, Locked, Int,
        "Engine run mode. 0 stopped, 1 cranking, 2 idle, 3 low load, 4 high load.";
    FuelTrim = 0x100B, 0, [0, 1], 1,
        None, FuelTrim, Editable, Boolean,
        "Trim the fuel amount by fuel and air temperature.";
    FuelMapSmoothness = 0x100C, 0, [0, 100], 5,
        FuelBaseAmount, FuelAmount, Editable, Percentage,
        "Smoothing of the fuel amount. 0 is off.";
    InitialInjectionQuantity = 0x100D, 120, [0, 1000], 5,
        None, FuelAmount, Editable, Int,
        "Minimum fuel amount while cranking.";
    QaSync = 0x100E, 0, [0, 1], 1,
        None, None, Editable, Boolean,
        "Sample the QA feedback synchronous to the crank at idle and low load.";
    Free4 = 0x100F, 0, [0, 0], 1,
        None, None, Hidden, Int,
        "Reserved.";
    TpsMin = 0x1010, 201, [25, 1000], 1,
        TpsRaw, TpsActual, Editable, Voltage,
        "Throttle sensor value at idle position.";
    TpsMax = 0x1011, 885, [25, 1000], 1,
        TpsRaw, TpsActual, Editable, Voltage,
        "Throttle sensor value at full throttle.";
    TpsSafetyBits = 0x1012, 0, [0, 255], 1,
        None, None, Editable, Hex,
        "Throttle safety switch configuration.";
    FuelCutAtStall = 0x1013, 1, [0, 1], 1,
        None, None, Editable, Boolean,
        "Cut the fuel when the engine is not turning.";
    TimingMethod = 0x1014, 0, [0, 2], 1,
        None, TimingPidAmount, Editable, Int,
        "Timing control. 0 off, 1 open loop, 2 closed loop.";
    QaInjectorBalance = 0x1015, 0, [0, 1], 1,
        None, None, Editable, Boolean,
        "Publish the per cylinder deviation.";
    ProbeSignalOutput = 0x1016, 0, [0, 10], 1,
        None, None, Editable, Int,
        "Signal routed to the probe output.";
    FreqConvRatio = 0x1017, 100, [1, 1000], 1,
        None, None, Editable, Int,
        "Tachometer output ratio in percent.";
    IdleAdjusting = 0x1018, 0, [0, 1], 1,
        None, IdlePidCorrection, Editable, Boolean,
        "Closed loop idle speed control.";
    IdleSpeedTarget = 0x1019, 830, [350, 1600], 10,
        EngineRpmFiltered, None, Editable, Int,
        "Idle speed target.";
    IdleKp = 0x101A, 9, [0, 300], 1,
        None, None, Editable, Int,
        "Idle PID proportional gain.";
    IdleKi = 0x101B, 1, [0, 300], 1,
        None, None, Editable, Int,
        "Idle PID integral gain.";
    RpmDsp = 0x101C, 0, [0, 3], 1,
        EngineRpmRaw, EngineRpmFiltered, Editable, Int,
        "RPM filter. 0 direct, 1 average, 2 last two teeth.";
    QaFeedbackMin = 0x101D, 205, [1, 1022], 1,
        QaFeedbackActual, QaFeedbackRaw, Editable, Voltage,
        "QA feedback value at the minimum position.";
    QaFeedbackMax = 0x101E, 881, [1, 1023], 1,
        QaFeedbackActual, QaFeedbackRaw, Editable, Voltage,
        "QA feedback value at the maximum position.";
    QaReferenceEnabled = 0x101F, 0, [0, 1], 1,
        None, None, Editable, Boolean,
        "Drive the QA to the generic debug value.";
    QaSetPoint = 0x1020, 0, [0, 1023], 1,
        QaFeedbackSetpoint, QaFeedbackRaw, Locked, Int,
        "QA position setpoint.";
    QaMinPwm = 0x1021, 100, [1, 700], 1,
        QaPwmActual, None, Editable, Int,
        "Lowest QA PWM value.";
    QaMaxPwm = 0x1022, 650, [1, 800], 1,
        QaPwmActual, None, Editable, Int,
        "Highest QA PWM value.";
    MapMin = 0x1023, 135, [0, 1000], 5,
        MapRaw, MapActual, Editable, Voltage,
        "Pressure sensor value at 0 kPa.";
    MapMax = 0x1024, 935, [0, 1000], 5,
        MapRaw, MapActual, Editable, Voltage,
        "Pressure sensor value at full scale.";
    MapKpa = 0x1025, 300, [100, 1000], 5,
        MapActual, BoostPressure, Editable, Kpa,
        "Pressure sensor full scale.";
    ControlMapScaleRpm = 0x1026, 5000, [100, 10000], 100,
        EngineRpm, Rpm8bit, Editable, Int,
        "RPM at the end of the map axes.";
    GenericDebugValue = 0x1027, 0, [0, 1023], 16,
        None, None, Editable, Int,
        "Generic value for tests.";
    QaDebugJitter = 0x1028, 0, [0, 1023], 1,
        None, QaJitter, Locked, Int,
        "QA position jitter.";
    QaPidKp = 0x1029, 52, [0, 1000], 1,
        QaPidP, None, Editable, Int,
        "QA PID proportional gain.";
    QaPidKi = 0x102A, 9, [0, 1000], 1,
        QaPidI, None, Editable, Int,
        "QA PID integral gain.";
    QaPidKd = 0x102B, 0, [0, 1000], 1,
        QaPidD, None, Editable, Int,
        "QA PID derivative gain.";
    QaPidSpeed = 0x102C, 25, [1, 128], 1,
        None, None, Editable, Int,
        "QA setpoint ramp speed.";
    QaPidBias = 0x102D, 55, [1, 200], 5,
        None, None, Editable, Percentage,
        "QA PID gain on negative error, in percent.";
    BoostAdjusting = 0x102E, 0, [0, 2], 1,
        BoostValveDutyCycle, BoostActuatorClipReason, Editable, Int,
        "Boost control. 0 off, 1 open loop, 2 closed loop.";
    BoostSpeed = 0x102F, 5, [1, 200], 10,
        None, None, Editable, Int,
        "Boost setpoint ramp speed.";
    BoostKp = 0x1030, 5, [1, 2000], 1,
        None, BoostPidCorrection, Editable, Int,
        "Boost PID proportional gain.";
    BoostKi = 0x1031, 5, [1, 2000], 1,
        None, BoostPidCorrection, Editable, Int,
        "Boost PID integral gain.";
    IdleKd = 0x1032, 13, [0, 300], 1,
        None, None, Editable, Int,
        "Idle PID derivative gain.";
    IdleMaxFuel = 0x1033, 520, [0, 1024], 5,
        None, IdlePidCorrection, Editable, Int,
        "Highest fuel amount of the idle controller.";
    IdleMinFuel = 0x1034, 140, [0, 1024], 5,
        None, IdlePidCorrection, Editable, Int,
        "Lowest fuel amount of the idle controller.";
    IdlePidSpeed = 0x1035, 15, [1, 140], 1,
        None, None, Editable, Int,
        "Idle setpoint ramp speed.";
    IdlePidBias = 0x1036, 33, [1, 200], 1,
        None, None, Editable, Percentage,
        "Idle PID gain on negative error, in percent.";
    BoostKd = 0x1037, 0, [0, 2000], 1,
        None, BoostPidCorrection, Editable, Int,
        "Boost PID derivative gain.";
    BoostBias = 0x1038, 100, [1, 200], 1,
        None, None, Editable, Percentage,
        "Boost PID gain on negative error, in percent.";
    BoostPidRange = 0x1039, 20, [1, 200], 1,
        None, BoostPidCorrection, Editable, Percentage,
        "Largest boost PID correction, in percent of the full duty.";
    TimingKp = 0x103A, 10, [1, 200], 1,
        None, TimingPidAmount, Editable, Int,
        "Timing PID proportional gain.";
    TimingKi = 0x103B, 2, [1, 200], 1,
        None, TimingPidAmount, Editable, Int,
        "Timing PID integral gain.";
    BoostActual = 0x103C, 0, [0, 1000], 1,
        MapRaw, BoostPressure, Locked, Kpa,
        "Measured boost pressure.";
    BoostTarget = 0x103D, 0, [0, 1000], 1,
        None, BoostTarget, Locked, Kpa,
        "Boost pressure target.";
}

impl NodeId {
    pub fn from_file_id(file_id: u16) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| DEFAULT_NODES[id.index()].file_id == file_id)
    }

    pub const fn defaults(self) -> ConfigNode {
        DEFAULT_NODES[self.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_file_ids() {
        for (i, a) in DEFAULT_NODES.iter().enumerate() {
            for b in &DEFAULT_NODES[i + 1..] {
                assert_ne!(a.file_id, b.file_id);
            }
        }
    }

    #[test]
    fn test_defaults_in_bounds() {
        for id in NodeId::ALL {
            let node = id.defaults();
            assert!(node.min <= node.max, "{}", id.name());
            assert!(node.step > 0, "{}", id.name());
            assert_eq!(node.clamp(node.value as i32), node.value, "{}", id.name());
            assert!(!id.description().is_empty());
        }
    }

    #[test]
    fn test_lookup_by_file_id() {
        assert_eq!(NodeId::from_file_id(0x1037), Some(NodeId::BoostKd));
        assert_eq!(NodeId::from_file_id(0x0000), Some(NodeId::SoftwareVersion));
        assert_eq!(NodeId::from_file_id(0x10FF), None);
        assert_eq!(NodeId::ALL[NodeId::COUNT - 1], NodeId::BoostTarget);
        assert_eq!(NodeId::SoftwareVersion.defaults().value, 0x0103);
    }
}

// vim: ts=4 sw=4 expandtab
