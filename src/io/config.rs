use std::fs;
use std::path::Path;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::warn;

use crate::control::fuel::{FuelState, Thruster};
use crate::control::momentum::{Cmg, ReactionWheel};
use crate::docking::DockingReference;

// ---------------------------------------------------------------------------
// Safe fallbacks for configuration defects
// ---------------------------------------------------------------------------

pub const DEFAULT_THRUST: f64 = 50.0; // N
pub const DEFAULT_ISP: f64 = 300.0; // s

/// Errors that can occur while loading a session file. Runtime physical
/// limits are never errors; only I/O and parse failures are.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse session JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Shape adapters: normalize duck-typed config into canonical forms
// ---------------------------------------------------------------------------

/// A 3-vector written either as `[x, y, z]` or `{"x": .., "y": .., "z": ..}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Vec3Config {
    Array([f64; 3]),
    Map {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        z: f64,
    },
}

impl Vec3Config {
    pub fn to_vector(self) -> Vector3<f64> {
        match self {
            Vec3Config::Array([x, y, z]) => Vector3::new(x, y, z),
            Vec3Config::Map { x, y, z } => Vector3::new(x, y, z),
        }
    }
}

impl Default for Vec3Config {
    fn default() -> Self {
        Vec3Config::Array([0.0, 0.0, 0.0])
    }
}

/// Accept a numeric field of any JSON type: non-numbers become `None` and
/// are substituted downstream rather than failing the load.
fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(value.as_f64())
}

/// The CMG list is accepted both as a flat list and as a legacy single
/// object; both normalize to a list here, never downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CmgListConfig {
    List(Vec<CmgConfig>),
    Single(CmgConfig),
}

impl CmgListConfig {
    pub fn normalize(self) -> Vec<CmgConfig> {
        match self {
            CmgListConfig::List(list) => list,
            CmgListConfig::Single(one) => vec![one],
        }
    }
}

impl Default for CmgListConfig {
    fn default() -> Self {
        CmgListConfig::List(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Declarative records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ThrusterConfig {
    #[serde(default)]
    pub name: String,
    pub position: Vec3Config,
    pub direction: Vec3Config,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub thrust: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", alias = "specificImpulse")]
    pub isp: Option<f64>,
    #[serde(default = "default_true", alias = "autoBind")]
    pub auto_bind: bool,
    #[serde(default)]
    pub keybind: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl ThrusterConfig {
    /// Build the runtime thruster, sanitizing thrust/ISP to safe positive
    /// fallbacks and shifting the position by the center-of-mass offset.
    pub fn to_thruster(&self, com_offset: &Vector3<f64>) -> Thruster {
        let thrust = sanitize_positive(self.thrust, DEFAULT_THRUST, "thrust", &self.name);
        let isp = sanitize_positive(self.isp, DEFAULT_ISP, "isp", &self.name);
        let mut t = Thruster::new(
            self.name.clone(),
            self.position.to_vector() - com_offset,
            self.direction.to_vector(),
            thrust,
            isp,
        );
        t.auto_bind = self.auto_bind;
        t.keybinds = self.keybind.clone();
        t
    }
}

fn sanitize_positive(value: Option<f64>, fallback: f64, field: &str, name: &str) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            warn!(
                thruster = name,
                field,
                fallback,
                "non-positive or non-numeric value; substituting safe default"
            );
            fallback
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionWheelConfig {
    #[serde(default)]
    pub name: String,
    pub orientation: Vec3Config,
    #[serde(default)]
    pub position: Vec3Config,
    #[serde(alias = "maxAngularMomentum")]
    pub max_angular_momentum: f64,
    #[serde(alias = "maxTorque")]
    pub max_torque: f64,
}

impl ReactionWheelConfig {
    pub fn to_wheel(&self) -> ReactionWheel {
        ReactionWheel::new(
            self.name.clone(),
            self.orientation.to_vector(),
            self.position.to_vector(),
            self.max_angular_momentum,
            self.max_torque,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmgConfig {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "maxAngularMomentum")]
    pub max_angular_momentum: f64,
    #[serde(alias = "maxTorque")]
    pub max_torque: f64,
}

impl CmgConfig {
    pub fn to_cmg(&self) -> Cmg {
        Cmg::new(self.name.clone(), self.max_angular_momentum, self.max_torque)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    #[serde(alias = "dryMass")]
    pub dry_mass: f64,
    #[serde(alias = "fuelMass")]
    pub fuel_mass: f64,
    #[serde(alias = "maxFuelMass")]
    pub max_fuel_mass: f64,
    pub inertia: Vec3Config,
    #[serde(default, alias = "centerOfMass")]
    pub center_of_mass: Option<Vec3Config>,
    /// Torque request magnitude per rotation channel in wheel/CMG mode.
    #[serde(default = "default_control_torque", alias = "controlTorque")]
    pub control_torque: f64,
}

fn default_control_torque() -> f64 {
    5.0
}

impl VehicleConfig {
    pub fn fuel_state(&self) -> FuelState {
        FuelState::new(self.dry_mass, self.fuel_mass, self.max_fuel_mass)
    }

    pub fn com_offset(&self) -> Vector3<f64> {
        self.center_of_mass
            .map(Vec3Config::to_vector)
            .unwrap_or_else(Vector3::zeros)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DockingConfig {
    #[serde(default)]
    pub position: Vec3Config,
    /// Reference attitude as XYZ Euler angles, degrees.
    #[serde(default, alias = "orientationDeg")]
    pub orientation_deg: Vec3Config,
    #[serde(default, alias = "boxHalfSize")]
    pub box_half_size: Option<Vec3Config>,
    #[serde(default, alias = "angleLimitDeg")]
    pub angle_limit_deg: Option<f64>,
    #[serde(default, alias = "lateralSpeedLimit")]
    pub lateral_speed_limit: Option<f64>,
    #[serde(default, alias = "axialSpeedLimit")]
    pub axial_speed_limit: Option<f64>,
    #[serde(default, alias = "angularSpeedLimit")]
    pub angular_speed_limit: Option<f64>,
}

impl DockingConfig {
    pub fn to_reference(&self) -> DockingReference {
        let defaults = DockingReference::default();
        let e = self.orientation_deg.to_vector();
        DockingReference {
            position: self.position.to_vector(),
            orientation: UnitQuaternion::from_euler_angles(
                e.x.to_radians(),
                e.y.to_radians(),
                e.z.to_radians(),
            ),
            box_half_size: self
                .box_half_size
                .map(Vec3Config::to_vector)
                .unwrap_or(defaults.box_half_size),
            angle_limit_deg: self.angle_limit_deg.unwrap_or(defaults.angle_limit_deg),
            lateral_speed_limit: self
                .lateral_speed_limit
                .unwrap_or(defaults.lateral_speed_limit),
            axial_speed_limit: self.axial_speed_limit.unwrap_or(defaults.axial_speed_limit),
            angular_speed_limit: self
                .angular_speed_limit
                .unwrap_or(defaults.angular_speed_limit),
        }
    }
}

/// Complete declarative session description, loaded once at session start
/// or supplied by the operator as an upload. Missing actuator sections are
/// zero actuators, not errors.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub thrusters: Vec<ThrusterConfig>,
    #[serde(default, alias = "reactionWheels")]
    pub reaction_wheels: Vec<ReactionWheelConfig>,
    #[serde(default)]
    pub cmgs: CmgListConfig,
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub docking: DockingConfig,
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn thrusters(&self) -> Vec<Thruster> {
        let com = self.vehicle.com_offset();
        self.thrusters.iter().map(|t| t.to_thruster(&com)).collect()
    }

    pub fn wheels(&self) -> Vec<ReactionWheel> {
        self.reaction_wheels
            .iter()
            .map(ReactionWheelConfig::to_wheel)
            .collect()
    }

    pub fn cmg_units(&self) -> Vec<Cmg> {
        self.cmgs
            .clone()
            .normalize()
            .iter()
            .map(CmgConfig::to_cmg)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
