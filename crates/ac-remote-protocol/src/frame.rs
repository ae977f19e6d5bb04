//! `RTCarInfo` physics update (328 bytes, little-endian).
//!
//! Layout after the 8-byte header (identifier + size, not decoded):
//!
//! | Offset | Fields |
//! |-------:|--------|
//! | 8      | speed km/h, mph, m/s (`f32` x3) |
//! | 20     | ABS enabled/active, TC active/enabled, in pit, limiter (`i8` x6) |
//! | 26     | padding (2 bytes) |
//! | 28     | acc G vertical, horizontal, frontal (`f32` x3) |
//! | 40     | lap time, last lap, best lap, lap count (`i32` x4) |
//! | 56     | gas, brake, clutch, engine RPM, steer (`f32` x5) |
//! | 76     | gear (`i32`) |
//! | 80     | CG height (`f32`) |
//! | 84     | 14 per-wheel groups (`f32` x4 each) |
//! | 308    | normalized car position, car slope (`f32` x2) |
//! | 316    | world coordinates x, y, z (`f32` x3) |

use crate::DecodeError;
use crate::reader::PacketReader;
use std::fmt;

/// `RTCarInfo` datagram size.
pub const TELEMETRY_FRAME_SIZE: usize = 328;

/// Number of decoded channels per frame.
pub const CHANNEL_COUNT: usize = 84;

/// One value per wheel.
///
/// The protocol does not label the wheels. The order front-left, front-right,
/// rear-left, rear-right is the usual convention for AC shared data and is
/// assumed, not confirmed.
pub type WheelQuad = [f32; 4];

/// Channel names in wire order, as written to the parsed log header.
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = [
    "speedKmh",
    "speedMph",
    "speedMs",
    "isAbsEnabled",
    "isAbsInAction",
    "isTcInAction",
    "isTcEnabled",
    "isInPit",
    "isEngineLimiterOn",
    "accGVertical",
    "accGHorizontal",
    "accGFrontal",
    "lapTime",
    "lastLap",
    "bestLap",
    "lapCount",
    "gas",
    "brake",
    "clutch",
    "engineRPM",
    "steer",
    "gear",
    "cgHeight",
    "wheelAngularSpeed1",
    "wheelAngularSpeed2",
    "wheelAngularSpeed3",
    "wheelAngularSpeed4",
    "slipAngle1",
    "slipAngle2",
    "slipAngle3",
    "slipAngle4",
    "slipAngleContactPatch1",
    "slipAngleContactPatch2",
    "slipAngleContactPatch3",
    "slipAngleContactPatch4",
    "slipRatio1",
    "slipRatio2",
    "slipRatio3",
    "slipRatio4",
    "tyreSlip1",
    "tyreSlip2",
    "tyreSlip3",
    "tyreSlip4",
    "ndSlip1",
    "ndSlip2",
    "ndSlip3",
    "ndSlip4",
    "load1",
    "load2",
    "load3",
    "load4",
    "Dy1",
    "Dy2",
    "Dy3",
    "Dy4",
    "Mz1",
    "Mz2",
    "Mz3",
    "Mz4",
    "tyreDirtyLevel1",
    "tyreDirtyLevel2",
    "tyreDirtyLevel3",
    "tyreDirtyLevel4",
    "camberRAD1",
    "camberRAD2",
    "camberRAD3",
    "camberRAD4",
    "tyreRadius1",
    "tyreRadius2",
    "tyreRadius3",
    "tyreRadius4",
    "tyreLoadedRadius1",
    "tyreLoadedRadius2",
    "tyreLoadedRadius3",
    "tyreLoadedRadius4",
    "suspensionHeight1",
    "suspensionHeight2",
    "suspensionHeight3",
    "suspensionHeight4",
    "carPositionNormalized",
    "carSlope",
    "carCoordinatesX",
    "carCoordinatesY",
    "carCoordinatesZ",
];

/// A single channel value. Flags and lap timing are integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Int(i32),
    Float(f32),
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelValue::Int(v) => write!(f, "{v}"),
            ChannelValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Decoded `RTCarInfo` update.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub speed_kmh: f32,
    pub speed_mph: f32,
    pub speed_ms: f32,

    pub is_abs_enabled: i8,
    pub is_abs_in_action: i8,
    pub is_tc_in_action: i8,
    pub is_tc_enabled: i8,
    pub is_in_pit: i8,
    pub is_engine_limiter_on: i8,

    pub acc_g_vertical: f32,
    pub acc_g_horizontal: f32,
    pub acc_g_frontal: f32,

    /// Current lap time in milliseconds.
    pub lap_time: i32,
    pub last_lap: i32,
    pub best_lap: i32,
    pub lap_count: i32,

    pub gas: f32,
    pub brake: f32,
    pub clutch: f32,
    pub engine_rpm: f32,
    pub steer: f32,
    /// AC encoding: 0 = reverse, 1 = neutral, 2 = first gear.
    pub gear: i32,
    pub cg_height: f32,

    pub wheel_angular_speed: WheelQuad,
    pub slip_angle: WheelQuad,
    pub slip_angle_contact_patch: WheelQuad,
    pub slip_ratio: WheelQuad,
    pub tyre_slip: WheelQuad,
    pub nd_slip: WheelQuad,
    pub load: WheelQuad,
    pub dy: WheelQuad,
    pub mz: WheelQuad,
    pub tyre_dirty_level: WheelQuad,
    pub camber_rad: WheelQuad,
    pub tyre_radius: WheelQuad,
    pub tyre_loaded_radius: WheelQuad,
    pub suspension_height: WheelQuad,

    pub car_position_normalized: f32,
    pub car_slope: f32,
    /// World position x, y, z.
    pub car_coordinates: [f32; 3],
}

impl TelemetryFrame {
    /// Per-wheel groups in wire order.
    fn wheel_groups(&self) -> [&WheelQuad; 14] {
        [
            &self.wheel_angular_speed,
            &self.slip_angle,
            &self.slip_angle_contact_patch,
            &self.slip_ratio,
            &self.tyre_slip,
            &self.nd_slip,
            &self.load,
            &self.dy,
            &self.mz,
            &self.tyre_dirty_level,
            &self.camber_rad,
            &self.tyre_radius,
            &self.tyre_loaded_radius,
            &self.suspension_height,
        ]
    }

    /// All channels in [`CHANNEL_NAMES`] order.
    pub fn channels(&self) -> Vec<ChannelValue> {
        use ChannelValue::{Float, Int};

        let mut out = Vec::with_capacity(CHANNEL_COUNT);
        out.extend([Float(self.speed_kmh), Float(self.speed_mph), Float(self.speed_ms)]);
        out.extend(
            [
                self.is_abs_enabled,
                self.is_abs_in_action,
                self.is_tc_in_action,
                self.is_tc_enabled,
                self.is_in_pit,
                self.is_engine_limiter_on,
            ]
            .map(|flag| Int(i32::from(flag))),
        );
        out.extend([
            Float(self.acc_g_vertical),
            Float(self.acc_g_horizontal),
            Float(self.acc_g_frontal),
        ]);
        out.extend([
            Int(self.lap_time),
            Int(self.last_lap),
            Int(self.best_lap),
            Int(self.lap_count),
        ]);
        out.extend([
            Float(self.gas),
            Float(self.brake),
            Float(self.clutch),
            Float(self.engine_rpm),
            Float(self.steer),
        ]);
        out.push(Int(self.gear));
        out.push(Float(self.cg_height));
        for group in self.wheel_groups() {
            out.extend(group.iter().copied().map(Float));
        }
        out.extend([Float(self.car_position_normalized), Float(self.car_slope)]);
        out.extend(self.car_coordinates.iter().copied().map(Float));
        out
    }

    /// Channels joined with commas, in header order.
    pub fn to_csv_fields(&self) -> String {
        self.channels()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Decode a 328-byte `RTCarInfo` datagram.
///
/// # Errors
///
/// Returns [`DecodeError::UnexpectedLength`] for any other size.
pub fn decode_frame(data: &[u8]) -> Result<TelemetryFrame, DecodeError> {
    if data.len() != TELEMETRY_FRAME_SIZE {
        return Err(DecodeError::UnexpectedLength { len: data.len() });
    }

    let mut r = PacketReader::new(data);
    r.skip(8)?;

    let speed_kmh = r.read_f32_le()?;
    let speed_mph = r.read_f32_le()?;
    let speed_ms = r.read_f32_le()?;

    let is_abs_enabled = r.read_i8()?;
    let is_abs_in_action = r.read_i8()?;
    let is_tc_in_action = r.read_i8()?;
    let is_tc_enabled = r.read_i8()?;
    let is_in_pit = r.read_i8()?;
    let is_engine_limiter_on = r.read_i8()?;
    r.skip(2)?;

    let acc_g_vertical = r.read_f32_le()?;
    let acc_g_horizontal = r.read_f32_le()?;
    let acc_g_frontal = r.read_f32_le()?;

    let lap_time = r.read_i32_le()?;
    let last_lap = r.read_i32_le()?;
    let best_lap = r.read_i32_le()?;
    let lap_count = r.read_i32_le()?;

    let gas = r.read_f32_le()?;
    let brake = r.read_f32_le()?;
    let clutch = r.read_f32_le()?;
    let engine_rpm = r.read_f32_le()?;
    let steer = r.read_f32_le()?;
    let gear = r.read_i32_le()?;
    let cg_height = r.read_f32_le()?;

    let wheel_angular_speed = r.read_f32x4_le()?;
    let slip_angle = r.read_f32x4_le()?;
    let slip_angle_contact_patch = r.read_f32x4_le()?;
    let slip_ratio = r.read_f32x4_le()?;
    let tyre_slip = r.read_f32x4_le()?;
    let nd_slip = r.read_f32x4_le()?;
    let load = r.read_f32x4_le()?;
    let dy = r.read_f32x4_le()?;
    let mz = r.read_f32x4_le()?;
    let tyre_dirty_level = r.read_f32x4_le()?;
    let camber_rad = r.read_f32x4_le()?;
    let tyre_radius = r.read_f32x4_le()?;
    let tyre_loaded_radius = r.read_f32x4_le()?;
    let suspension_height = r.read_f32x4_le()?;

    let car_position_normalized = r.read_f32_le()?;
    let car_slope = r.read_f32_le()?;
    let car_coordinates = [r.read_f32_le()?, r.read_f32_le()?, r.read_f32_le()?];

    debug_assert_eq!(r.offset(), TELEMETRY_FRAME_SIZE);

    Ok(TelemetryFrame {
        speed_kmh,
        speed_mph,
        speed_ms,
        is_abs_enabled,
        is_abs_in_action,
        is_tc_in_action,
        is_tc_enabled,
        is_in_pit,
        is_engine_limiter_on,
        acc_g_vertical,
        acc_g_horizontal,
        acc_g_frontal,
        lap_time,
        last_lap,
        best_lap,
        lap_count,
        gas,
        brake,
        clutch,
        engine_rpm,
        steer,
        gear,
        cg_height,
        wheel_angular_speed,
        slip_angle,
        slip_angle_contact_patch,
        slip_ratio,
        tyre_slip,
        nd_slip,
        load,
        dy,
        mz,
        tyre_dirty_level,
        camber_rad,
        tyre_radius,
        tyre_loaded_radius,
        suspension_height,
        car_position_normalized,
        car_slope,
        car_coordinates,
    })
}
