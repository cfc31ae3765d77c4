// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Main control loop.
//!
//! [System::run] is called from the firmware main loop. It reads the sensors,
//! computes the fuel amount and runs all actuator loops. Detected faults are
//! recorded as DTCs and the loop continues with substitute values.

use crate::{
    analog::{ANALOG_INPUT_HIGH_STATE_LIMIT, AdcChannel, AdcSmoother, AnalogInput},
    boost::BoostControl,
    controls::{Controls, RunMode, Value},
    crank::{CYLINDERS, CrankSnapshot, CrankTiming, RpmSensorKind},
    debounce::Debounce,
    debug::Debug,
    dtc::{Dtc, DtcCode},
    eeprom::Eeprom,
    fixpt::{Fixpt, fixpt},
    hal::{Actuators, Relay},
    idle::IdleControl,
    maps::MapId,
    node::NodeId,
    persist::{self, ConfigError, LoadStats},
    qa::{CallGuard, QuantityAdjuster, read_feedback},
    registry::Registry,
    timer::{RelTimestamp, Timestamp},
    timing::TimingControl,
    units::{idle_rpm_to_axis, rpm_to_axis, scale_range, to_kpa, to_temperature},
};
use curveipo::Curve;

/// Number of consecutive implausible samples until a sensor is failed.
pub const SENSOR_FAIL_COUNT: u16 = 300;
type SensorCheck = Debounce<1, SENSOR_FAIL_COUNT, true>;

/// Full scale of the fuel amount and of the scaled pedal and MAP inputs.
pub const FUEL_MAX: i32 = 1023;

/// Filtered RPM modes only apply above this speed.
const RPM_AVERAGING_MIN: i32 = 600;
/// Below this speed the engine is cranking.
const CRANKING_RPM_MAX: i32 = 400;
/// Pedal position below which the pedal counts as released.
const IDLE_TPS_MAX: i32 = 30;
/// Idle control stays active up to this far above the idle target.
const IDLE_RPM_WINDOW: i32 = 300;
/// Fuel amount separating low and high load.
const HIGH_LOAD_FUEL: i32 = 512;
/// Substitute pedal axis value of a failed throttle sensor.
const TPS_LIMP_MODE_AMOUNT: i32 = 68;
/// Fuel trim map value without correction.
const FUEL_TRIM_NEUTRAL: i32 = 128;
const FUEL_SMOOTHNESS_MAX: i32 = 95;
const FAN_ON_CELSIUS: i32 = 95;
const FAN_OFF_CELSIUS: i32 = 90;

const RPM_FUEL_LIMIT: Curve<Fixpt, (Fixpt, Fixpt), 3> = Curve::new([
    // (rpm, maximum fuel amount)
    (fixpt!(0), fixpt!(1023)),
    (fixpt!(4500), fixpt!(1023)),
    (fixpt!(5000), fixpt!(0)),
]);

/// Analog inputs with an unconnected sensor detection.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum Input {
    Tps,
    Map,
    Qa,
    EngineTemp,
    FuelTemp,
    AirTemp,
}

impl Input {
    const ALL: [Input; 6] = [
        Input::Tps,
        Input::Map,
        Input::Qa,
        Input::EngineTemp,
        Input::FuelTemp,
        Input::AirTemp,
    ];
    const COUNT: usize = Self::ALL.len();

    const fn channel(self) -> AdcChannel {
        match self {
            Self::Tps => AdcChannel::TpsPos,
            Self::Map => AdcChannel::Map,
            Self::Qa => AdcChannel::QaPos,
            Self::EngineTemp => AdcChannel::TempCoolant,
            Self::FuelTemp => AdcChannel::TempFuel,
            Self::AirTemp => AdcChannel::TempIntake,
        }
    }

    const fn dtc(self) -> DtcCode {
        match self {
            Self::Tps => DtcCode::TpsUnconnected,
            Self::Map => DtcCode::MapUnconnected,
            Self::Qa => DtcCode::QuantityAdjusterUnconnected,
            Self::EngineTemp => DtcCode::EngineTempUnconnected,
            Self::FuelTemp => DtcCode::FuelTempUnconnected,
            Self::AirTemp => DtcCode::AirTempUnconnected,
        }
    }
}

struct TempSensor {
    input: Input,
    calibration: MapId,
    raw: Value,
    actual: Value,
    /// Substitute value of a failed sensor.
    fallback: NodeId,
}

const TEMP_SENSORS: [TempSensor; 3] = [
    TempSensor {
        input: Input::EngineTemp,
        calibration: MapId::EngineTempSensor,
        raw: Value::TempEngineInput,
        actual: Value::TempEngine,
        fallback: NodeId::TempEngine,
    },
    TempSensor {
        input: Input::FuelTemp,
        calibration: MapId::FuelTempSensor,
        raw: Value::TempFuelInput,
        actual: Value::TempFuel,
        fallback: NodeId::TempFuel,
    },
    TempSensor {
        input: Input::AirTemp,
        calibration: MapId::AirTempSensor,
        raw: Value::TempAirInput,
        actual: Value::TempAir,
        fallback: NodeId::TempAir,
    },
];

pub struct System {
    sensor: RpmSensorKind,
    reg: Registry,
    controls: Controls,
    dtc: Dtc,
    smoother: AdcSmoother,
    qa: QuantityAdjuster,
    qa_guard: CallGuard,
    boost: BoostControl,
    idle: IdleControl,
    timing: TimingControl,
    checks: [SensorCheck; Input::COUNT],
    rpm_min: i32,
    rpm_max: i32,
    fuel: i32,
    fan: bool,
    /// The glow period has elapsed once. Stays set until reset.
    glow_done: bool,
    heartbeat: u8,
    start: Option<Timestamp>,
}

impl System {
    pub fn new(sensor: RpmSensorKind) -> Self {
        Self {
            sensor,
            reg: Registry::new(),
            controls: Controls::new(),
            dtc: Dtc::new(),
            smoother: AdcSmoother::new(),
            qa: QuantityAdjuster::new(),
            qa_guard: CallGuard::new(),
            boost: BoostControl::new(),
            idle: IdleControl::new(),
            timing: TimingControl::new(),
            checks: [const { SensorCheck::new() }; Input::COUNT],
            rpm_min: 0,
            rpm_max: 0,
            fuel: 0,
            fan: false,
            glow_done: false,
            heartbeat: 0,
            start: None,
        }
    }

    /// Restore the DTC store and the configuration.
    ///
    /// Without a stored configuration the defaults stay active.
    pub fn init(&mut self, ee: &mut impl Eeprom) -> Result<LoadStats, ConfigError> {
        if self.dtc.load(ee).is_err() {
            self.dtc.set_error(DtcCode::InternalError);
        }
        self.load_config(&*ee)
    }

    pub fn save_config(&self, ee: &mut impl Eeprom) -> Result<usize, ConfigError> {
        persist::save(&self.reg, ee)
    }

    pub fn load_config(&mut self, ee: &impl Eeprom) -> Result<LoadStats, ConfigError> {
        persist::load(&mut self.reg, ee, &mut self.dtc)
    }

    pub fn sensor(&self) -> RpmSensorKind {
        self.sensor
    }

    pub fn registry(&self) -> &Registry {
        &self.reg
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.reg
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn dtc(&self) -> &Dtc {
        &self.dtc
    }

    pub fn dtc_mut(&mut self) -> &mut Dtc {
        &mut self.dtc
    }

    fn input_ok(&self, input: Input) -> bool {
        self.checks[input as usize].is_ok()
    }

    fn check_inputs(&mut self, adc: &impl AnalogInput) {
        for input in Input::ALL {
            let failed = adc.read_value(input.channel()) > ANALOG_INPUT_HIGH_STATE_LIMIT;
            if self.checks[input as usize].check(failed) {
                self.dtc.set_error(input.dtc());
            }
        }
    }

    fn read_sensors(&mut self, adc: &impl AnalogInput) {
        let tps_raw = self.smoother.read_value_averaged(adc, AdcChannel::TpsPos) as i32;
        let tps = if self.input_ok(Input::Tps) {
            scale_range(
                tps_raw,
                self.reg.value(NodeId::TpsMin),
                self.reg.value(NodeId::TpsMax),
                FUEL_MAX,
            )
        } else {
            TPS_LIMP_MODE_AMOUNT << 2
        };
        self.controls.set(Value::TpsRaw, tps_raw);
        self.controls.set(Value::TpsActual, tps);

        let map_raw = self.smoother.read_value_averaged(adc, AdcChannel::Map) as i32;
        let map = if self.input_ok(Input::Map) {
            scale_range(
                map_raw,
                self.reg.value(NodeId::MapMin),
                self.reg.value(NodeId::MapMax),
                FUEL_MAX,
            )
        } else {
            0
        };
        self.controls.set(Value::MapRaw, map_raw);
        self.controls.set(Value::MapActual, map);
        self.controls.set(
            Value::BoostPressure,
            to_kpa(self.reg.value(NodeId::MapKpa), map >> 2),
        );

        let battery = self
            .smoother
            .read_value_averaged(adc, AdcChannel::BatteryVoltage);
        self.controls.set(Value::BatteryVoltage, battery as i32);

        for sensor in &TEMP_SENSORS {
            let raw8 = (self
                .smoother
                .read_value_averaged(adc, sensor.input.channel())
                >> 2) as u8;
            let temp = if self.input_ok(sensor.input) {
                self.reg.map_lookup(sensor.calibration, raw8, 0) as i32
            } else {
                self.reg.value(sensor.fallback)
            };
            self.controls.set(sensor.raw, raw8 as i32);
            self.controls.set(sensor.actual, temp);
        }
    }

    fn update_rpm(&mut self, snap: &CrankSnapshot) -> i32 {
        let raw = snap.latest_measure(&self.sensor) as i32;
        let rpm = if snap.is_stalled() {
            0
        } else if raw <= RPM_AVERAGING_MIN {
            raw
        } else {
            match self.reg.value(NodeId::RpmDsp) {
                1 | 3 => snap.latest_measure_filtered(&self.sensor) as i32,
                2 => snap.latest_measure_two_teeth(&self.sensor) as i32,
                _ => raw,
            }
        };

        if rpm > 0 {
            self.rpm_min = if self.rpm_min == 0 {
                rpm
            } else {
                self.rpm_min.min(rpm)
            };
            self.rpm_max = self.rpm_max.max(rpm);
        }

        let jitter = (1..CYLINDERS)
            .map(|cyl| snap.deviation_for_cylinder(cyl).unsigned_abs() as i32)
            .max()
            .unwrap_or(0);

        let c = &mut self.controls;
        c.set(Value::EngineRpmRaw, raw);
        c.set(Value::EngineRpm, rpm);
        c.set(Value::EngineRpmFiltered, rpm);
        c.set(
            Value::Rpm8bit,
            rpm_to_axis(self.reg.value(NodeId::ControlMapScaleRpm), rpm) as i32,
        );
        c.set(
            Value::EngineRpmDurationBetweenTeeth,
            snap.latest_raw_value() as i32,
        );
        c.set(Value::CurrentTeeth, snap.current_slot() as i32);
        c.set(Value::EngineRpmJitter, jitter);
        c.set(Value::EngineRpmMin, self.rpm_min);
        c.set(Value::EngineRpmMax, self.rpm_max);
        rpm
    }

    fn run_mode(&self, rpm: i32) -> RunMode {
        let tps = self.controls.get(Value::TpsActual);
        if rpm == 0 {
            RunMode::Stopped
        } else if rpm < CRANKING_RPM_MAX {
            RunMode::Cranking
        } else if tps < IDLE_TPS_MAX
            && rpm < self.reg.value(NodeId::IdleSpeedTarget) + IDLE_RPM_WINDOW
        {
            RunMode::PidIdle
        } else if self.fuel < HIGH_LOAD_FUEL {
            RunMode::LowLoad
        } else {
            RunMode::HighLoad
        }
    }

    fn fuel_amount(&mut self, mode: RunMode, rpm: i32) -> i32 {
        let rpm8 = self.controls.axis(Value::Rpm8bit);
        let tps8 = self.controls.axis_10bit(Value::TpsActual);
        let map8 = self.controls.axis_10bit(Value::MapActual);
        let temp8 = self.controls.axis(Value::TempEngine);
        let idle_rpm8 = idle_rpm_to_axis(rpm);

        let base = self.reg.map_lookup_10bit(MapId::Fuel, rpm8, tps8) as i32;
        let enrichment = self.reg.map_lookup_10bit(MapId::BoostFuel, rpm8, map8) as i32;
        let idle_pid = self
            .idle
            .update(mode, rpm, &mut self.reg, &mut self.controls);

        let mut fuel = match mode {
            RunMode::Stopped | RunMode::Cranking => {
                let idle = self.reg.map_lookup_10bit(MapId::Idle, idle_rpm8, temp8) as i32;
                idle.max(self.reg.value(NodeId::InitialInjectionQuantity))
            }
            RunMode::PidIdle => match idle_pid {
                Some(fuel) => fuel,
                None => self.reg.map_lookup_10bit(MapId::Idle, idle_rpm8, temp8) as i32,
            },
            RunMode::LowLoad | RunMode::HighLoad => base + enrichment,
        };

        let mut trim = 0;
        if self.reg.flag(NodeId::FuelTrim) {
            let fuel_temp = self.controls.axis(Value::TempFuel);
            let air_temp = self.controls.axis(Value::TempAir);
            let tf = self.reg.map_lookup(MapId::FuelTrimFuelTemp, fuel_temp, 0) as i32;
            let ta = self.reg.map_lookup(MapId::FuelTrimAirTemp, air_temp, 0) as i32;
            fuel = fuel * tf / FUEL_TRIM_NEUTRAL * ta / FUEL_TRIM_NEUTRAL;
            trim = tf + ta - 2 * FUEL_TRIM_NEUTRAL;
        }

        let limit = RPM_FUEL_LIMIT.lin_inter(Fixpt::from_int(rpm)).to_int();
        fuel = fuel.min(limit);
        if rpm == 0 && self.reg.flag(NodeId::FuelCutAtStall) {
            fuel = 0;
        }
        fuel = fuel.clamp(0, FUEL_MAX);

        // Fuel cut is never delayed.
        if fuel != 0 {
            let weight = 100 - self.reg.value(NodeId::FuelMapSmoothness).min(FUEL_SMOOTHNESS_MAX);
            fuel = self.fuel + (fuel - self.fuel) * weight / 100;
        }
        self.fuel = fuel;

        let c = &mut self.controls;
        c.set(Value::FuelBaseAmount, base);
        c.set(Value::FuelEnrichmentAmount, enrichment);
        c.set(Value::FuelLimitAmount, limit);
        c.set(Value::FuelTrim, trim);
        c.set(Value::FuelAmount, fuel);
        c.set(Value::FuelAmount8bit, fuel >> 2);
        fuel
    }

    fn update_qa(
        &mut self,
        mode: RunMode,
        fuel: i32,
        adc: &impl AnalogInput,
        out: &mut impl Actuators,
    ) {
        let target = if self.reg.flag(NodeId::QaReferenceEnabled) {
            self.reg.value(NodeId::GenericDebugValue)
        } else {
            fuel
        };
        self.qa.set_position(target);
        let raw = read_feedback(mode, self.reg.flag(NodeId::QaSync), adc, &mut self.smoother);
        self.qa.update(
            &self.qa_guard,
            raw,
            &mut self.reg,
            &mut self.controls,
            out,
            &mut self.dtc,
        );
    }

    fn update_relays(&mut self, uptime: RelTimestamp, out: &mut impl Actuators) {
        let temp8 = self.controls.axis(Value::TempEngine);

        let glow_secs = self.reg.map_lookup(MapId::GlowPeriod, temp8, 0) as i32;
        if uptime >= RelTimestamp::from_secs(glow_secs) {
            self.glow_done = true;
        }
        let glow = !self.glow_done;

        let celsius = to_temperature(temp8 as i32);
        if celsius > FAN_ON_CELSIUS {
            self.fan = true;
        } else if celsius < FAN_OFF_CELSIUS {
            self.fan = false;
        }

        out.set_relay(Relay::Glow, glow);
        out.set_relay(Relay::Fan, self.fan);
        self.controls.set(Value::OutputGlow, glow as i32);
        self.controls.set(Value::OutputFan, self.fan as i32);
    }

    fn publish(&mut self, mode: RunMode, rpm: i32) {
        self.heartbeat = (self.heartbeat + 1) & 3;
        self.controls.set(Value::RunMode, mode as i32);

        let reg = &mut self.reg;
        reg.publish(NodeId::EngineRpm, rpm);
        reg.publish(NodeId::RunMode, mode as i32);
        reg.publish(NodeId::Pressure, self.controls.get(Value::BoostPressure));
        reg.publish(
            NodeId::BatteryVoltage,
            self.controls.get(Value::BatteryVoltage),
        );
        reg.publish(NodeId::HeartBeat, self.heartbeat as i32);
    }

    fn log_debug(&self) {
        let c = &self.controls;
        Debug::Rpm.log_i32(c.get(Value::EngineRpm));
        Debug::QaSetpoint.log_i32(c.get(Value::QaFeedbackSetpoint));
        Debug::QaPosition.log_i32(c.get(Value::QaFeedbackRaw));
        Debug::QaDuty.log_i32(c.get(Value::QaPwmActual));
        Debug::BoostTarget.log_i32(c.get(Value::BoostTarget));
        Debug::BoostDuty.log_i32(c.get(Value::BoostValveDutyCycle));
        Debug::LastDtc.log_u8(self.dtc.last_code().map_or(0, |code| code.code()));
    }

    /// One main loop iteration.
    pub fn run(
        &mut self,
        adc: &impl AnalogInput,
        crank: &CrankTiming,
        out: &mut impl Actuators,
        ee: &mut impl Eeprom,
        now: Timestamp,
    ) {
        let start = *self.start.get_or_insert(now);

        self.check_inputs(adc);
        self.read_sensors(adc);

        let snap = crank.snapshot();
        let rpm = self.update_rpm(&snap);
        if crank.get_error() != 0 {
            self.dtc.set_error(DtcCode::RpmUnplausible);
        }

        let mode = self.run_mode(rpm);
        let fuel = self.fuel_amount(mode, rpm);
        self.update_qa(mode, fuel, adc, out);
        self.boost.update(&mut self.reg, &mut self.controls, out);
        self.timing
            .update(&mut self.reg, &mut self.controls, &snap, &self.sensor, out);
        self.update_relays(now - start, out);

        if self.dtc.save(ee, now).is_err() {
            self.dtc.set_error(DtcCode::InternalError);
        }

        self.publish(mode, rpm);
        self.log_debug();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analog::mock::MockAdc,
        crank::DefaultCps,
        eeprom::RamEeprom,
        hal::mock::MockActuators,
        units::temperature_to_axis,
    };

    struct Bench {
        sys: System,
        adc: MockAdc,
        crank: CrankTiming,
        out: MockActuators,
        ee: RamEeprom,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                sys: System::new(RpmSensorKind::Default(DefaultCps)),
                adc: MockAdc::new(),
                crank: CrankTiming::new(DefaultCps::MIN_DURATION),
                out: MockActuators::default(),
                ee: RamEeprom::new(),
            }
        }

        fn run_at(&mut self, ms: u32) {
            self.sys.run(
                &self.adc,
                &self.crank,
                &mut self.out,
                &mut self.ee,
                Timestamp::from_millis(ms),
            );
        }

        fn run(&mut self) {
            self.run_at(0);
        }

        /// Spin the engine with a constant tooth duration.
        fn spin(&mut self, ticks: u16) {
            critical_section::with(|cs| {
                self.crank.on_edge(cs, 0, || false);
                for _ in 0..10 {
                    self.crank.on_edge(cs, ticks, || false);
                }
            });
        }

        fn set_engine_temp(&mut self, celsius: i32) {
            for x in 0..6 {
                self.sys
                    .registry_mut()
                    .set_map_cell(MapId::EngineTempSensor, x, 0, temperature_to_axis(celsius))
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_stalled() {
        let mut b = Bench::new();
        b.run();
        let c = b.sys.controls();
        assert_eq!(c.get(Value::EngineRpm), 0);
        assert_eq!(c.get(Value::RunMode), RunMode::Stopped as i32);
        assert_eq!(c.get(Value::FuelAmount), 0);
        assert_eq!(b.out.qa, Some(0));
        assert_eq!(b.sys.registry().value(NodeId::HeartBeat), 1);
    }

    #[test]
    fn test_cranking_without_fuel_cut() {
        let mut b = Bench::new();
        b.sys.registry_mut().set_node_value(NodeId::FuelCutAtStall, 0);
        b.run();
        // Stopped engine gets at least the initial quantity.
        assert!(b.sys.controls().get(Value::FuelAmount) >= 120);
    }

    #[test]
    fn test_idle() {
        let mut b = Bench::new();
        b.spin(3000);
        b.run();
        let c = b.sys.controls();
        assert_eq!(c.get(Value::EngineRpm), 1000);
        assert_eq!(c.get(Value::Rpm8bit), 51);
        assert_eq!(c.get(Value::EngineRpmMin), 1000);
        assert_eq!(c.get(Value::RunMode), RunMode::PidIdle as i32);
        let fuel = c.get(Value::FuelAmount);
        assert!(fuel > 0);
        assert_eq!(c.get(Value::FuelAmount8bit), fuel >> 2);
        assert_eq!(b.sys.qa.target(), fuel);
        assert_eq!(b.sys.registry().value(NodeId::EngineRpm), 1000);

        // Engine stops.
        critical_section::with(|cs| b.crank.on_stall(cs));
        b.run();
        assert_eq!(b.sys.controls().get(Value::EngineRpm), 0);
        assert_eq!(b.sys.controls().get(Value::FuelAmount), 0);
        assert_eq!(b.sys.controls().get(Value::EngineRpmMax), 1000);
    }

    #[test]
    fn test_load_modes() {
        let mut b = Bench::new();
        b.spin(3000);
        b.adc.set(AdcChannel::TpsPos, 885);
        b.run();
        let c = b.sys.controls();
        assert_eq!(c.get(Value::TpsActual), FUEL_MAX);
        assert_eq!(c.get(Value::RunMode), RunMode::LowLoad as i32);
        let fuel = c.get(Value::FuelAmount);
        assert!(fuel > 0 && fuel < HIGH_LOAD_FUEL, "{fuel}");
        assert_eq!(c.get(Value::FuelBaseAmount), fuel);

        for x in 1..=2 {
            b.sys
                .registry_mut()
                .set_map_cell(MapId::Fuel, x, 5, 200)
                .unwrap();
        }
        b.run();
        assert!(b.sys.controls().get(Value::FuelAmount) >= HIGH_LOAD_FUEL);
        b.run();
        assert_eq!(
            b.sys.controls().get(Value::RunMode),
            RunMode::HighLoad as i32
        );
    }

    #[test]
    fn test_unconnected_tps() {
        let mut b = Bench::new();
        b.adc.set(AdcChannel::TpsPos, 1000);
        for _ in 0..SENSOR_FAIL_COUNT - 1 {
            b.run();
        }
        assert!(!b.sys.dtc().is_error_active(DtcCode::TpsUnconnected));
        b.run();
        assert!(b.sys.dtc().is_error_active(DtcCode::TpsUnconnected));
        assert_eq!(b.sys.dtc().last_code(), Some(DtcCode::TpsUnconnected));
        assert_eq!(
            b.sys.controls().get(Value::TpsActual),
            TPS_LIMP_MODE_AMOUNT << 2
        );

        // Sticky until power cycle.
        b.adc.set(AdcChannel::TpsPos, 500);
        b.run();
        assert_eq!(
            b.sys.controls().get(Value::TpsActual),
            TPS_LIMP_MODE_AMOUNT << 2
        );
    }

    #[test]
    fn test_temperature_fallback() {
        let mut b = Bench::new();
        b.sys.registry_mut().set_node_value(NodeId::TempAir, 77);
        b.adc.set(AdcChannel::TempIntake, 1023);
        for _ in 0..SENSOR_FAIL_COUNT {
            b.run();
        }
        assert!(b.sys.dtc().is_error_active(DtcCode::AirTempUnconnected));
        assert_eq!(b.sys.controls().get(Value::TempAir), 77);
        assert_eq!(b.sys.controls().get(Value::TempAirInput), 255);
    }

    #[test]
    fn test_fan_hysteresis() {
        let mut b = Bench::new();
        b.set_engine_temp(100);
        b.run();
        assert!(b.out.fan);
        b.set_engine_temp(92);
        b.run();
        assert!(b.out.fan);
        b.set_engine_temp(88);
        b.run();
        assert!(!b.out.fan);
        assert_eq!(b.sys.controls().get(Value::OutputFan), 0);
    }

    #[test]
    fn test_glow_period() {
        let mut b = Bench::new();
        b.set_engine_temp(-20);
        b.run_at(1000);
        assert!(b.out.glow);
        b.run_at(20_000);
        assert!(b.out.glow);
        b.run_at(31_000);
        assert!(!b.out.glow);

        // The uptime difference wraps after 2^31 ms.
        b.run_at(1000 + (1 << 31) + 5000);
        assert!(!b.out.glow);
        b.run_at(u32::MAX);
        assert!(!b.out.glow);
    }

    #[test]
    fn test_rpm_limiter() {
        let mut b = Bench::new();
        // 6000 rpm.
        b.spin(500);
        b.adc.set(AdcChannel::TpsPos, 885);
        b.run();
        assert_eq!(b.sys.controls().get(Value::EngineRpm), 6000);
        assert_eq!(b.sys.controls().get(Value::FuelLimitAmount), 0);
        assert_eq!(b.sys.controls().get(Value::FuelAmount), 0);
    }

    #[test]
    fn test_qa_reference() {
        let mut b = Bench::new();
        b.sys.registry_mut().set_node_value(NodeId::QaReferenceEnabled, 1);
        b.sys.registry_mut().set_node_value(NodeId::GenericDebugValue, 512);
        b.run();
        assert_eq!(b.sys.qa.target(), 512);
    }

    #[test]
    fn test_init_and_persist() {
        let mut b = Bench::new();
        assert_eq!(b.sys.init(&mut b.ee), Err(ConfigError::BadMagic));
        assert!(b.sys.dtc().is_error_active(DtcCode::StorageMismatch));
        assert!(b.sys.dtc().is_error_active(DtcCode::ConfigurationError));

        b.sys.registry_mut().set_node_value(NodeId::IdleSpeedTarget, 900);
        b.sys.save_config(&mut b.ee).unwrap();

        let mut sys = System::new(RpmSensorKind::Default(DefaultCps));
        let stats = sys.init(&mut b.ee).unwrap();
        assert_eq!(stats.mismatches, 0);
        assert_eq!(sys.registry().value(NodeId::IdleSpeedTarget), 900);
    }

    #[test]
    fn test_dtc_flush() {
        let mut b = Bench::new();
        b.sys.dtc_mut().set_error(DtcCode::Trap2);
        b.run_at(1000);
        assert_ne!(b.ee.as_bytes()[crate::dtc::DTC_EEPROM_OFFSET], b'D');
        b.run_at(6000);
        assert_eq!(b.ee.as_bytes()[crate::dtc::DTC_EEPROM_OFFSET], b'D');
    }
}

// vim: ts=4 sw=4 expandtab
