use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Standard gravity used by the rocket-equation mass flow model (m/s^2).
pub const G0: f64 = 9.81;

// ---------------------------------------------------------------------------
// Vehicle state: pose, velocity, attitude, angular rate, mass properties
// ---------------------------------------------------------------------------

/// Rigid-body state of the free-flying vehicle.
///
/// `mass` and `inertia` are deliberately independent properties: fuel debits
/// update the mass scalar, while the inertia diagonal is configured once and
/// never rederived from mass.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub time: f64,
    pub pos: Vector3<f64>,         // m, world frame
    pub vel: Vector3<f64>,         // m/s, world frame
    pub quat: UnitQuaternion<f64>, // body→world rotation
    pub omega: Vector3<f64>,       // rad/s, body frame angular velocity
    pub mass: f64,                 // kg, dry + remaining fuel
    pub inertia: Vector3<f64>,     // [Ixx, Iyy, Izz] principal moments, kg·m^2
}

impl VehicleState {
    pub fn new(mass: f64, inertia: Vector3<f64>) -> Self {
        Self {
            time: 0.0,
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            quat: UnitQuaternion::identity(),
            omega: Vector3::zeros(),
            mass,
            inertia,
        }
    }

    /// Rotate a body-frame vector into the world frame.
    pub fn body_to_world(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.quat * v
    }

    /// Rotate a world-frame vector into the body frame.
    pub fn world_to_body(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.quat.inverse() * v
    }

    pub fn angular_speed(&self) -> f64 {
        self.omega.norm()
    }

    /// Zero linear and angular velocity (used on dock capture).
    pub fn arrest_motion(&mut self) {
        self.vel = Vector3::zeros();
        self.omega = Vector3::zeros();
    }
}
