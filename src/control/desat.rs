use nalgebra::Vector3;
use tracing::debug;

use super::fuel::Propulsion;
use super::momentum::{ControlMode, MomentumBank, MOMENTUM_DT};
use crate::dynamics::rigid::BodyLoads;

// ---------------------------------------------------------------------------
// Desaturation: bleed stored momentum back toward zero with thrusters
// ---------------------------------------------------------------------------

// Reaction-wheel bank thresholds and throttle.
const WHEEL_TRIGGER_MOMENTUM: f64 = 0.1; // total |H| to start
const WHEEL_COMPLETE_MOMENTUM: f64 = 0.5; // peak per-wheel |h| to stop
const WHEEL_THROTTLE: f64 = 0.5;

// CMG bank thresholds, throttle, and fixed bleed increment per firing.
const CMG_TRIGGER_MOMENTUM: f64 = 10.0;
const CMG_COMPLETE_MOMENTUM: f64 = 5.0;
const CMG_THROTTLE: f64 = 0.3;
const CMG_BLEED_INCREMENT: f64 = 0.02;

/// Minimum alignment between a thruster's torque direction and the
/// momentum-opposing direction for it to participate.
const ALIGNMENT_THRESHOLD: f64 = 0.5;

/// Heuristic proportional momentum offload with hysteresis.
///
/// Not an exact allocator: each participating thruster bleeds momentum off
/// every actuator in a distributed approximation. Convergence toward the
/// completion threshold under sustained firing is the contract; optimality
/// is not.
#[derive(Debug, Clone, Default)]
pub struct DesaturationController {
    active: bool,
}

impl DesaturationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Operator request: arms the controller if the active bank holds more
    /// momentum than its trigger threshold.
    pub fn request(&mut self, bank: &MomentumBank) {
        let armed = match bank.mode() {
            ControlMode::Thrusters => false,
            ControlMode::ReactionWheels => {
                bank.total_wheel_momentum().norm() > WHEEL_TRIGGER_MOMENTUM
            }
            ControlMode::Cmgs => bank.total_cmg_momentum().norm() > CMG_TRIGGER_MOMENTUM,
        };
        if armed && !self.active {
            debug!(mode = bank.mode().label(), "desaturation armed");
        }
        self.active = armed;
    }

    /// Re-invoked every step while active; fires opposing thrusters and
    /// bleeds stored momentum until the completion threshold is reached.
    pub fn step(
        &mut self,
        bank: &mut MomentumBank,
        propulsion: &mut Propulsion,
        dt: f64,
        loads: &mut BodyLoads,
    ) {
        if !self.active {
            return;
        }
        match bank.mode() {
            ControlMode::Thrusters => self.active = false,
            ControlMode::ReactionWheels => self.step_wheels(bank, propulsion, dt, loads),
            ControlMode::Cmgs => self.step_cmgs(bank, propulsion, dt, loads),
        }
    }

    fn step_wheels(
        &mut self,
        bank: &mut MomentumBank,
        propulsion: &mut Propulsion,
        dt: f64,
        loads: &mut BodyLoads,
    ) {
        if bank.peak_wheel_momentum() < WHEEL_COMPLETE_MOMENTUM {
            self.active = false;
            debug!("reaction wheel desaturation complete");
            return;
        }
        let total = bank.total_wheel_momentum();
        if total.norm() <= WHEEL_TRIGGER_MOMENTUM {
            return;
        }
        let opposing = -total.normalize();

        for index in 0..propulsion.thrusters.len() {
            let arm = propulsion.thrusters[index].torque_arm();
            if arm.norm() < 1e-9 {
                continue;
            }
            if arm.normalize().dot(&opposing) <= ALIGNMENT_THRESHOLD {
                continue;
            }
            if !propulsion.fire(index, dt, WHEEL_THROTTLE, loads) {
                continue;
            }
            // Distributed bleed: each wheel sheds the projection of this
            // thruster's (throttled) torque onto its axis, clamped so the
            // stored momentum never crosses zero.
            let torque = arm * (propulsion.thrusters[index].thrust * WHEEL_THROTTLE);
            for wheel in &mut bank.wheels {
                let bleed = torque.dot(&wheel.orientation).abs() * MOMENTUM_DT;
                let step = bleed.min(wheel.momentum.abs());
                wheel.momentum -= wheel.momentum.signum() * step;
            }
        }
    }

    fn step_cmgs(
        &mut self,
        bank: &mut MomentumBank,
        propulsion: &mut Propulsion,
        dt: f64,
        loads: &mut BodyLoads,
    ) {
        let total = bank.total_cmg_momentum();
        if total.norm() < CMG_COMPLETE_MOMENTUM {
            self.active = false;
            debug!("CMG desaturation complete");
            return;
        }
        let opposing = -total.normalize();

        for index in 0..propulsion.thrusters.len() {
            let arm = propulsion.thrusters[index].torque_arm();
            if arm.norm() < 1e-9 {
                continue;
            }
            if arm.normalize().dot(&opposing) <= ALIGNMENT_THRESHOLD {
                continue;
            }
            if !propulsion.fire(index, dt, CMG_THROTTLE, loads) {
                continue;
            }
            // Fixed bleed increment along the opposing direction, per CMG.
            for cmg in &mut bank.cmgs {
                cmg.momentum += opposing * CMG_BLEED_INCREMENT;
            }
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
