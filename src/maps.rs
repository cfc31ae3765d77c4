//! Shipped calibration maps.

use crate::{
    map::{CalibrationMap, MapAxes},
    units::AxisUnit::{self, *},
};

macro_rules! define_maps {
    ($(
        $name:ident = $fid:literal, $x:literal x $y:literal,
            ($ax:ident, $ay:ident, $ar:ident), $desc:literal,
            [$($cell:literal),* $(,)?];
    )*) => {
        #[derive(Clone, Copy, PartialEq, Eq, Debug)]
        #[repr(u8)]
        pub enum MapId {
            $($name,)*
        }

        impl MapId {
            pub const ALL: &'static [MapId] = &[$(MapId::$name,)*];
            pub const COUNT: usize = Self::ALL.len();

            pub const fn index(self) -> usize {
                self as usize
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(MapId::$name => $desc,)*
                }
            }
        }

        /// Compiled in map defaults, in [MapId] order.
        pub const DEFAULT_MAPS: [CalibrationMap; MapId::COUNT] = [
            $(CalibrationMap::new(
                $fid,
                $x,
                $y,
                true,
                MapAxes::new($ax, $ay, $ar),
                &[$($cell),*],
            ),)*
        ];
    };
}

#[rustfmt::skip]
define_maps! {
    Fuel = 0xF0F0, 8 x 6, (Rpm, Tps, InjectedFuel), "Basic injection map", [
        100, 70, 35, 0, 0, 0, 0, 0,
        100, 100, 78, 37, 0, 0, 0, 0,
        100, 100, 80, 75, 37, 10, 0, 0,
        100, 100, 100, 100, 60, 77, 10, 0,
        100, 100, 100, 100, 100, 100, 77, 0,
        100, 100, 100, 100, 100, 100, 100, 0,
    ];
    BoostFuel = 0xF0F1, 8 x 6, (Rpm, Kpa, InjectedFuel), "Additive injection map (boost)", [
        0, 0, 0, 0, 0, 0, 0, 0,
        31, 31, 31, 31, 31, 31, 31, 0,
        53, 47, 65, 65, 75, 75, 75, 0,
        30, 30, 78, 78, 85, 85, 85, 0,
        0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0,
    ];
    Idle = 0xF0F2, 8 x 4, (IdleRpm, Celsius, InjectedFuel), "Injection quantity when starting and idling", [
        255, 255, 255, 114, 80, 60, 60, 50,
        190, 130, 90, 80, 70, 60, 50, 40,
        190, 120, 90, 80, 70, 60, 50, 40,
        190, 110, 90, 80, 70, 60, 50, 40,
    ];
    FuelTrimFuelTemp = 0xF0F3, 8 x 1, (Celsius, None, FuelTrimAmount), "Fuel trim amount vs. fuel temperature", [
        128, 128, 128, 128, 128, 128, 128, 128,
    ];
    FuelTrimAirTemp = 0xF0F4, 8 x 1, (Celsius, None, FuelTrimAmount), "Fuel trim amount vs. air temperature", [
        128, 128, 128, 128, 128, 128, 128, 128,
    ];
    OpenLoopAdvance = 0xF0E0, 6 x 6, (Rpm, InjectedFuel, DutyCycle), "Open loop advance", [
        255, 255, 255, 255, 255, 255,
        255, 255, 255, 255, 255, 210,
        255, 255, 255, 255, 180, 180,
        255, 255, 255, 190, 140, 0,
        255, 255, 255, 100, 80, 0,
        100, 100, 100, 50, 50, 0,
    ];
    ClosedLoopAdvance = 0xF0E1, 6 x 6, (Rpm, InjectedFuel, InjectionTiming), "Closed loop advance", [
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0,
    ];
    TurboControl = 0xF0D0, 6 x 6, (Rpm, InjectedFuel, DutyCycle), "Turbo actuator duty cycle base map", [
        201, 227, 210, 201, 171, 158,
        201, 227, 208, 192, 169, 158,
        201, 182, 198, 180, 162, 158,
        201, 201, 195, 166, 153, 140,
        201, 182, 118, 151, 151, 28,
        201, 182, 156, 103, 59, 28,
    ];
    TurboTargetPressure = 0xF0D1, 6 x 4, (Rpm, Tps, Kpa), "Turbo actuator target pressure", [
        0, 0, 0, 0, 0, 0,
        0, 0, 0, 10, 20, 100,
        0, 0, 10, 30, 100, 128,
        100, 100, 100, 100, 100, 100,
    ];
    ActuatorTension = 0xF0D2, 8 x 1, (Raw, None, Raw), "Turbo actuator operating curve", [
        255, 215, 192, 143, 90, 55, 23, 0,
    ];
    GlowPeriod = 0xF0C0, 6 x 1, (Celsius, None, Seconds), "Glow period (seconds)", [
        30, 30, 20, 10, 0, 0,
    ];
    EngineTempSensor = 0xF0B0, 6 x 1, (Voltage, None, Celsius), "Engine temperature sensor calibration", [
        30, 20, 9, 0, 0, 0,
    ];
    FuelTempSensor = 0xF0B1, 6 x 1, (Voltage, None, Celsius), "Fuel temperature sensor calibration", [
        30, 30, 20, 10, 0, 0,
    ];
    AirTempSensor = 0xF0B2, 6 x 1, (Voltage, None, Celsius), "Intake air temperature sensor calibration", [
        30, 30, 20, 10, 0, 0,
    ];
    EcuTempSensor = 0xF0B3, 6 x 1, (Voltage, None, Celsius), "ECU temperature sensor calibration", [
        30, 30, 20, 10, 0, 0,
    ];
    IdlePidP = 0xF070, 10 x 1, (IdleRpm, None, Raw), "Idle PID P parameter during idle", [
        12, 12, 10, 6, 4, 2, 2, 2, 5, 10,
    ];
}

impl MapId {
    pub fn from_file_id(file_id: u16) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| DEFAULT_MAPS[id.index()].id() == file_id)
    }

    pub fn defaults(self) -> CalibrationMap {
        DEFAULT_MAPS[self.index()].clone()
    }

    pub fn result_unit(self) -> AxisUnit {
        DEFAULT_MAPS[self.index()].axes().result
    }
}


// vim: ts=4 sw=4 expandtab
