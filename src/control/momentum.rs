use nalgebra::Vector3;
use tracing::debug;

use crate::dynamics::rigid::BodyLoads;
use crate::dynamics::state::VehicleState;

// ---------------------------------------------------------------------------
// Momentum actuators: reaction wheels and CMGs
// ---------------------------------------------------------------------------

/// Fixed timestep for momentum bookkeeping, independent of the outer
/// physics substep rate. All headroom and integration math in this module
/// uses this nominal dt.
pub const MOMENTUM_DT: f64 = 1.0 / 60.0;

/// A reaction wheel storing signed scalar momentum along its spin axis.
/// `position` is carried for layout/display; wheels apply pure torque.
#[derive(Debug, Clone)]
pub struct ReactionWheel {
    pub name: String,
    pub orientation: Vector3<f64>, // unit spin axis, body frame
    pub position: Vector3<f64>,
    pub max_momentum: f64, // N·m·s
    pub max_torque: f64,   // N·m, rate limit
    pub momentum: f64,     // signed, along orientation, in [-max, +max]
}

impl ReactionWheel {
    pub fn new(
        name: impl Into<String>,
        orientation: Vector3<f64>,
        position: Vector3<f64>,
        max_momentum: f64,
        max_torque: f64,
    ) -> Self {
        Self {
            name: name.into(),
            orientation: orientation.normalize(),
            position,
            max_momentum,
            max_torque,
            momentum: 0.0,
        }
    }

    pub fn momentum_vector(&self) -> Vector3<f64> {
        self.orientation * self.momentum
    }

    /// |momentum| as a fraction of capacity.
    pub fn saturation(&self) -> f64 {
        if self.max_momentum > 0.0 {
            self.momentum.abs() / self.max_momentum
        } else {
            0.0
        }
    }
}

/// A gimbaled momentum actuator storing a full momentum vector bounded by
/// magnitude.
#[derive(Debug, Clone)]
pub struct Cmg {
    pub name: String,
    pub max_momentum: f64,
    pub max_torque: f64,
    pub momentum: Vector3<f64>,
}

impl Cmg {
    pub fn new(name: impl Into<String>, max_momentum: f64, max_torque: f64) -> Self {
        Self {
            name: name.into(),
            max_momentum,
            max_torque,
            momentum: Vector3::zeros(),
        }
    }

    pub fn saturation(&self) -> f64 {
        if self.max_momentum > 0.0 {
            self.momentum.norm() / self.max_momentum
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Control mode
// ---------------------------------------------------------------------------

/// Which actuator bank services rotation inputs. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Thrusters,
    ReactionWheels,
    Cmgs,
}

impl ControlMode {
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Thrusters => "thrusters",
            ControlMode::ReactionWheels => "reaction wheels",
            ControlMode::Cmgs => "CMGs",
        }
    }
}

// ---------------------------------------------------------------------------
// Momentum bank: mode cycling + torque arbitration
// ---------------------------------------------------------------------------

/// Owns the wheel and CMG banks and arbitrates requested body torques
/// against per-unit momentum-capacity and torque-rate limits.
#[derive(Debug, Clone)]
pub struct MomentumBank {
    pub wheels: Vec<ReactionWheel>,
    pub cmgs: Vec<Cmg>,
    mode: ControlMode,
}

impl MomentumBank {
    pub fn new(wheels: Vec<ReactionWheel>, cmgs: Vec<Cmg>) -> Self {
        Self {
            wheels,
            cmgs,
            mode: ControlMode::Thrusters,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Cycle THRUSTERS → REACTION_WHEELS → CMGS → THRUSTERS. The CMG mode
    /// is only reachable when CMGs are configured; with no momentum
    /// actuators at all the mode is pinned to THRUSTERS.
    pub fn toggle_mode(&mut self) -> ControlMode {
        if self.wheels.is_empty() && self.cmgs.is_empty() {
            self.mode = ControlMode::Thrusters;
            return self.mode;
        }
        self.mode = match self.mode {
            ControlMode::Thrusters => ControlMode::ReactionWheels,
            ControlMode::ReactionWheels => {
                if self.cmgs.is_empty() {
                    ControlMode::Thrusters
                } else {
                    ControlMode::Cmgs
                }
            }
            ControlMode::Cmgs => ControlMode::Thrusters,
        };
        debug!(mode = self.mode.label(), "control mode toggled");
        self.mode
    }

    /// Dispatch a requested body-frame torque to the active momentum bank.
    /// In thruster mode this is a no-op (rotation inputs fire thrusters
    /// directly instead).
    pub fn apply_control_torque(
        &mut self,
        requested: Vector3<f64>,
        state: &VehicleState,
        loads: &mut BodyLoads,
    ) {
        match self.mode {
            ControlMode::Thrusters => {}
            ControlMode::ReactionWheels => self.apply_wheel_torque(requested, state, loads),
            ControlMode::Cmgs => self.apply_cmg_torque(requested, state, loads),
        }
    }

    /// Per-wheel axis projection with a momentum-headroom torque cap.
    ///
    /// The cap (`headroom / dt`) rolls torque off smoothly near saturation
    /// instead of cutting it hard. The reaction delivered to the body is
    /// the negative of the torque applied to the wheel, rotated to the
    /// world frame.
    fn apply_wheel_torque(
        &mut self,
        requested: Vector3<f64>,
        state: &VehicleState,
        loads: &mut BodyLoads,
    ) {
        let mut reaction_body = Vector3::zeros();
        for wheel in &mut self.wheels {
            let along_axis = requested.dot(&wheel.orientation);
            if along_axis == 0.0 {
                continue;
            }
            let headroom = if along_axis > 0.0 {
                wheel.max_momentum - wheel.momentum
            } else {
                wheel.momentum + wheel.max_momentum
            };
            let max_possible = (headroom / MOMENTUM_DT).max(0.0);
            let magnitude = along_axis.abs().min(wheel.max_torque).min(max_possible);
            let applied = along_axis.signum() * magnitude;

            wheel.momentum = (wheel.momentum + applied * MOMENTUM_DT)
                .clamp(-wheel.max_momentum, wheel.max_momentum);
            reaction_body -= wheel.orientation * applied;
        }
        loads.add_world_torque(state.quat * reaction_body);
    }

    /// CMG arbitration: the requested torque is split across units, each
    /// share clamped to `max_torque` by magnitude and scaled down when it
    /// would push stored momentum past capacity (momentum grows only when
    /// the prospective delta points with the current momentum). Stored
    /// momentum integrates the negative of the applied torque, mirroring
    /// the wheel convention.
    fn apply_cmg_torque(
        &mut self,
        requested: Vector3<f64>,
        state: &VehicleState,
        loads: &mut BodyLoads,
    ) {
        if self.cmgs.is_empty() {
            return;
        }
        let share = requested / self.cmgs.len() as f64;
        let mut applied_total = Vector3::zeros();
        for cmg in &mut self.cmgs {
            let mut torque = share;
            let norm = torque.norm();
            if norm > cmg.max_torque {
                torque *= cmg.max_torque / norm;
            }

            let delta = -torque * MOMENTUM_DT;
            if delta.norm() > 0.0 && cmg.momentum.dot(&delta) > 0.0 {
                let prospective = (cmg.momentum + delta).norm();
                if prospective > cmg.max_momentum {
                    let headroom = (cmg.max_momentum - cmg.momentum.norm()).max(0.0);
                    torque *= (headroom / delta.norm()).clamp(0.0, 1.0);
                }
            }

            cmg.momentum += -torque * MOMENTUM_DT;
            applied_total += torque;
        }
        loads.add_world_torque(state.quat * applied_total);
    }

    pub fn total_wheel_momentum(&self) -> Vector3<f64> {
        self.wheels
            .iter()
            .map(ReactionWheel::momentum_vector)
            .sum()
    }

    pub fn total_cmg_momentum(&self) -> Vector3<f64> {
        self.cmgs.iter().map(|c| c.momentum).sum()
    }

    pub fn peak_wheel_momentum(&self) -> f64 {
        self.wheels
            .iter()
            .map(|w| w.momentum.abs())
            .fold(0.0, f64::max)
    }

    /// Zero all stored momentum (simulation reset).
    pub fn reset(&mut self) {
        for w in &mut self.wheels {
            w.momentum = 0.0;
        }
        for c in &mut self.cmgs {
            c.momentum = Vector3::zeros();
        }
        self.mode = ControlMode::Thrusters;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wheel_bank() -> MomentumBank {
        let mut bank = MomentumBank::new(
            vec![ReactionWheel::new(
                "x-wheel",
                Vector3::x(),
                Vector3::zeros(),
                10.0,
                2.0,
            )],
            vec![],
        );
        bank.toggle_mode();
        assert_eq!(bank.mode(), ControlMode::ReactionWheels);
        bank
    }

    fn cmg_bank() -> MomentumBank {
        let mut bank = MomentumBank::new(vec![], vec![Cmg::new("cmg", 20.0, 5.0)]);
        bank.toggle_mode(); // → wheels (empty)
        bank.toggle_mode(); // → cmgs
        assert_eq!(bank.mode(), ControlMode::Cmgs);
        bank
    }

    fn state() -> VehicleState {
        VehicleState::new(1000.0, Vector3::new(500.0, 500.0, 500.0))
    }

    #[test]
    fn mode_pinned_without_actuators() {
        let mut bank = MomentumBank::new(vec![], vec![]);
        assert_eq!(bank.toggle_mode(), ControlMode::Thrusters);
        assert_eq!(bank.toggle_mode(), ControlMode::Thrusters);
    }

    #[test]
    fn mode_cycle_skips_cmgs_when_none_configured() {
        let mut bank = MomentumBank::new(
            vec![ReactionWheel::new("w", Vector3::x(), Vector3::zeros(), 1.0, 1.0)],
            vec![],
        );
        assert_eq!(bank.toggle_mode(), ControlMode::ReactionWheels);
        assert_eq!(bank.toggle_mode(), ControlMode::Thrusters);
    }

    #[test]
    fn mode_cycle_includes_cmgs_when_configured() {
        let mut bank = MomentumBank::new(
            vec![ReactionWheel::new("w", Vector3::x(), Vector3::zeros(), 1.0, 1.0)],
            vec![Cmg::new("c", 1.0, 1.0)],
        );
        assert_eq!(bank.toggle_mode(), ControlMode::ReactionWheels);
        assert_eq!(bank.toggle_mode(), ControlMode::Cmgs);
        assert_eq!(bank.toggle_mode(), ControlMode::Thrusters);
    }

    #[test]
    fn wheel_momentum_saturates_asymptotically() {
        let mut bank = wheel_bank();
        let s = state();
        let mut loads = BodyLoads::new();
        let mut prev = 0.0;
        for _ in 0..20_000 {
            bank.apply_control_torque(Vector3::new(100.0, 0.0, 0.0), &s, &mut loads);
            let h = bank.wheels[0].momentum;
            assert!(h <= 10.0, "momentum must never exceed capacity, got {}", h);
            assert!(h >= prev, "momentum must grow monotonically toward capacity");
            prev = h;
        }
        assert_relative_eq!(prev, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn wheel_reaction_is_negative_of_wheel_torque() {
        let mut bank = wheel_bank();
        let s = state(); // identity attitude: world == body
        let mut loads = BodyLoads::new();
        bank.apply_control_torque(Vector3::new(1.5, 0.0, 0.0), &s, &mut loads);
        let wheel_torque = bank.wheels[0].momentum / MOMENTUM_DT;
        assert_relative_eq!(loads.torque_world.x, -wheel_torque, epsilon = 1e-12);
        assert_relative_eq!(wheel_torque, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn wheel_torque_rate_limited() {
        let mut bank = wheel_bank();
        let s = state();
        let mut loads = BodyLoads::new();
        bank.apply_control_torque(Vector3::new(100.0, 0.0, 0.0), &s, &mut loads);
        // max_torque = 2.0 caps the first step well below the request
        assert_relative_eq!(bank.wheels[0].momentum, 2.0 * MOMENTUM_DT, epsilon = 1e-12);
    }

    #[test]
    fn off_axis_request_leaves_wheel_untouched() {
        let mut bank = wheel_bank();
        let s = state();
        let mut loads = BodyLoads::new();
        bank.apply_control_torque(Vector3::new(0.0, 3.0, 0.0), &s, &mut loads);
        assert_eq!(bank.wheels[0].momentum, 0.0);
        assert!(loads.torque_world.norm() < 1e-12);
    }

    #[test]
    fn cmg_torque_magnitude_clamped() {
        let mut bank = cmg_bank();
        let s = state();
        let mut loads = BodyLoads::new();
        bank.apply_control_torque(Vector3::new(50.0, 0.0, 0.0), &s, &mut loads);
        assert_relative_eq!(loads.torque_world.norm(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn cmg_momentum_magnitude_never_exceeds_capacity() {
        let mut bank = cmg_bank();
        let s = state();
        for _ in 0..100_000 {
            let mut loads = BodyLoads::new();
            bank.apply_control_torque(Vector3::new(50.0, 0.0, 0.0), &s, &mut loads);
            let h = bank.cmgs[0].momentum.norm();
            assert!(h <= 20.0 + 1e-9, "CMG momentum exceeded capacity: {}", h);
        }
        assert_relative_eq!(bank.cmgs[0].momentum.norm(), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn cmg_momentum_integrates_negative_torque() {
        let mut bank = cmg_bank();
        let s = state();
        let mut loads = BodyLoads::new();
        bank.apply_control_torque(Vector3::new(1.0, 0.0, 0.0), &s, &mut loads);
        assert_relative_eq!(bank.cmgs[0].momentum.x, -1.0 * MOMENTUM_DT, epsilon = 1e-12);
        assert_relative_eq!(loads.torque_world.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn reset_zeroes_momentum_and_mode() {
        let mut bank = wheel_bank();
        bank.wheels[0].momentum = 7.0;
        bank.reset();
        assert_eq!(bank.wheels[0].momentum, 0.0);
        assert_eq!(bank.mode(), ControlMode::Thrusters);
    }
}
