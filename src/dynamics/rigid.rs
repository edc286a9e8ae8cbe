use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use super::state::VehicleState;

// ---------------------------------------------------------------------------
// Per-step force/torque accumulator
// ---------------------------------------------------------------------------

/// Forces and torques accumulated over one control step before integration.
///
/// Thrusters contribute body-frame forces applied at a body-frame point
/// (producing both net force and net torque); momentum actuators contribute
/// world-frame pure torques.
#[derive(Debug, Clone, Default)]
pub struct BodyLoads {
    pub force_body: Vector3<f64>,
    pub torque_body: Vector3<f64>,
    pub torque_world: Vector3<f64>,
}

impl BodyLoads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.force_body = Vector3::zeros();
        self.torque_body = Vector3::zeros();
        self.torque_world = Vector3::zeros();
    }

    pub fn is_zero(&self) -> bool {
        self.force_body == Vector3::zeros()
            && self.torque_body == Vector3::zeros()
            && self.torque_world == Vector3::zeros()
    }

    /// Apply a body-frame force at a body-frame point (torque = r × F).
    pub fn add_local_force_at(&mut self, force: Vector3<f64>, point: Vector3<f64>) {
        self.force_body += force;
        self.torque_body += point.cross(&force);
    }

    /// Apply a world-frame pure torque (no net force).
    pub fn add_world_torque(&mut self, torque: Vector3<f64>) {
        self.torque_world += torque;
    }

    pub fn merge(&mut self, other: &BodyLoads) {
        self.force_body += other.force_body;
        self.torque_body += other.torque_body;
        self.torque_world += other.torque_world;
    }
}

// ---------------------------------------------------------------------------
// Fixed-substep rigid-body integration
// ---------------------------------------------------------------------------

/// Advance the vehicle state by one fixed substep under the accumulated loads.
///
/// Semi-implicit: velocities are updated first, then pose. Attitude follows
/// quaternion kinematics dq/dt = 0.5 * q * omega_quat, renormalized each step.
pub fn integrate(state: &mut VehicleState, loads: &BodyLoads, dt: f64) {
    if state.mass <= 0.0 || dt <= 0.0 {
        return;
    }

    // --- Translation ---
    let force_world = state.quat * loads.force_body;
    state.vel += force_world / state.mass * dt;
    state.pos += state.vel * dt;

    // --- Rotation: Euler's equation with diagonal inertia ---
    let torque_body = loads.torque_body + state.quat.inverse() * loads.torque_world;
    let i = state.inertia;
    let i_omega = Vector3::new(
        i.x * state.omega.x,
        i.y * state.omega.y,
        i.z * state.omega.z,
    );
    let domega = Vector3::new(
        (torque_body.x - (state.omega.y * i_omega.z - state.omega.z * i_omega.y)) / i.x,
        (torque_body.y - (state.omega.z * i_omega.x - state.omega.x * i_omega.z)) / i.y,
        (torque_body.z - (state.omega.x * i_omega.y - state.omega.y * i_omega.x)) / i.z,
    );
    state.omega += domega * dt;

    // --- Quaternion kinematics ---
    let omega_quat = Quaternion::new(0.0, state.omega.x, state.omega.y, state.omega.z);
    let q_raw = state.quat.quaternion() + state.quat.quaternion() * omega_quat * 0.5 * dt;
    state.quat = UnitQuaternion::new_normalize(q_raw);

    state.time += dt;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
