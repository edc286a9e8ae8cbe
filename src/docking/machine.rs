use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use super::clock::MissionClock;
use crate::dynamics::state::VehicleState;

// ---------------------------------------------------------------------------
// Docking reference and per-step status
// ---------------------------------------------------------------------------

/// Fixed target pose and the capture envelope around it.
#[derive(Debug, Clone)]
pub struct DockingReference {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub box_half_size: Vector3<f64>, // per-axis position tolerance, m
    pub angle_limit_deg: f64,
    pub lateral_speed_limit: f64, // m/s
    pub axial_speed_limit: f64,   // m/s, upper bound on signed +Z closing speed
    pub angular_speed_limit: f64, // rad/s
}

impl Default for DockingReference {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            box_half_size: Vector3::new(1.0, 1.0, 1.0),
            angle_limit_deg: 10.0,
            lateral_speed_limit: 0.5,
            axial_speed_limit: 0.5,
            angular_speed_limit: 0.1,
        }
    }
}

/// Derived each step from the current vehicle pose; never stored.
#[derive(Debug, Clone, Copy)]
pub struct DockingStatus {
    pub position_error: Vector3<f64>,
    pub angle_error_deg: f64,
    pub lateral_speed: f64,
    pub axial_speed: f64,
    pub angular_speed: f64,
    pub in_box: bool,
    pub in_angle: bool,
    pub within_speed_limits: bool,
    pub within_angular_speed_limit: bool,
}

impl DockingStatus {
    pub fn all_criteria_met(&self) -> bool {
        self.in_box && self.in_angle && self.within_speed_limits && self.within_angular_speed_limit
    }
}

// ---------------------------------------------------------------------------
// Docking state machine
// ---------------------------------------------------------------------------

/// Current docking phase. `Eligible` is `Undocked` plus the one-shot
/// "has left the docking box at least once" latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockPhase {
    Docked,
    Undocked,
    Eligible,
}

/// Evaluates positional, angular, and rate criteria against the reference
/// pose and owns the pause-aware mission clock.
///
/// Initial state: docked, clock latched at zero. Undocking is a manual
/// operator command and requires the simulation to be paused while docked.
/// Re-docking requires leaving the box at least once since the last undock
/// and all four criteria holding simultaneously; capture zeroes the
/// vehicle's velocities and freezes the clock.
#[derive(Debug, Clone)]
pub struct DockingStateMachine {
    pub reference: DockingReference,
    phase: DockPhase,
    clock: MissionClock,
}

impl DockingStateMachine {
    pub fn new(reference: DockingReference) -> Self {
        Self {
            reference,
            phase: DockPhase::Docked,
            clock: MissionClock::new_docked(),
        }
    }

    pub fn phase(&self) -> DockPhase {
        self.phase
    }

    pub fn is_docked(&self) -> bool {
        self.phase == DockPhase::Docked
    }

    pub fn clock(&self) -> &MissionClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut MissionClock {
        &mut self.clock
    }

    /// Recompute the derived docking status from the current vehicle state.
    pub fn status(&self, state: &VehicleState) -> DockingStatus {
        let r = &self.reference;
        let position_error = state.pos - r.position;
        let angle_error_deg = state.quat.angle_to(&r.orientation).to_degrees();

        // Source convention, preserved exactly: lateral speed from the X/Z
        // velocity components, axial criterion an upper bound on the signed
        // Z speed only (no lower bound).
        let lateral_speed = (state.vel.x * state.vel.x + state.vel.z * state.vel.z).sqrt();
        let axial_speed = state.vel.z;
        let angular_speed = state.angular_speed();

        let in_box = position_error.x.abs() <= r.box_half_size.x
            && position_error.y.abs() <= r.box_half_size.y
            && position_error.z.abs() <= r.box_half_size.z;

        DockingStatus {
            position_error,
            angle_error_deg,
            lateral_speed,
            axial_speed,
            angular_speed,
            in_box,
            in_angle: angle_error_deg <= r.angle_limit_deg,
            within_speed_limits: lateral_speed <= r.lateral_speed_limit
                && axial_speed <= r.axial_speed_limit,
            within_angular_speed_limit: angular_speed <= r.angular_speed_limit,
        }
    }

    /// Advance the machine one step. `now` is the session's monotone wall
    /// clock, used only when latching the mission clock at capture.
    pub fn evaluate(&mut self, state: &mut VehicleState, now: f64) -> DockingStatus {
        let status = self.status(state);
        match self.phase {
            DockPhase::Docked => {}
            DockPhase::Undocked => {
                if !status.in_box {
                    self.phase = DockPhase::Eligible;
                    debug!("vehicle left the docking box; re-docking eligible");
                }
            }
            DockPhase::Eligible => {
                if status.all_criteria_met() {
                    self.phase = DockPhase::Docked;
                    state.arrest_motion();
                    self.clock.freeze(now);
                    debug!(
                        elapsed = self.clock.elapsed(now),
                        "docking criteria met; captured"
                    );
                }
            }
        }
        status
    }

    /// Manual undock. Only legal while docked and paused; clears the
    /// left-the-box latch and restarts the mission clock.
    pub fn try_undock(&mut self, paused: bool, now: f64) -> bool {
        if self.phase != DockPhase::Docked || !paused {
            return false;
        }
        self.phase = DockPhase::Undocked;
        self.clock.undock(now);
        debug!("undocked");
        true
    }

    /// Full reset: back to docked with the clock latched at zero.
    pub fn reset(&mut self) {
        self.phase = DockPhase::Docked;
        self.clock = MissionClock::new_docked();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_at(pos: Vector3<f64>) -> VehicleState {
        let mut s = VehicleState::new(1000.0, Vector3::new(500.0, 500.0, 500.0));
        s.pos = pos;
        s
    }

    fn machine() -> DockingStateMachine {
        DockingStateMachine::new(DockingReference::default())
    }

    #[test]
    fn undock_requires_paused_and_docked() {
        let mut m = machine();
        assert!(!m.try_undock(false, 0.0), "undock while unpaused must be refused");
        assert!(m.try_undock(true, 0.0));
        assert_eq!(m.phase(), DockPhase::Undocked);
        assert!(!m.try_undock(true, 1.0), "already undocked");
    }

    #[test]
    fn docking_round_trip_zeroes_velocity() {
        let mut m = machine();
        assert!(m.try_undock(true, 0.0));

        // Drift outside the box → eligible.
        let mut state = vehicle_at(Vector3::new(0.0, 0.0, 5.0));
        m.evaluate(&mut state, 1.0);
        assert_eq!(m.phase(), DockPhase::Eligible);

        // Return within all criteria → docked, motion arrested, clock latched.
        state.pos = Vector3::new(0.2, -0.1, 0.3);
        state.vel = Vector3::new(0.1, 0.0, -0.2);
        state.omega = Vector3::new(0.0, 0.05, 0.0);
        m.evaluate(&mut state, 9.0);
        assert_eq!(m.phase(), DockPhase::Docked);
        assert_eq!(state.vel, Vector3::zeros());
        assert_eq!(state.omega, Vector3::zeros());
        assert_eq!(m.clock().elapsed(50.0), 9.0);
    }

    #[test]
    fn cannot_dock_without_leaving_box_first() {
        let mut m = machine();
        assert!(m.try_undock(true, 0.0));
        let mut state = vehicle_at(Vector3::new(0.1, 0.0, 0.0));
        for _ in 0..10 {
            m.evaluate(&mut state, 1.0);
        }
        assert_eq!(m.phase(), DockPhase::Undocked, "latch not set → no re-dock");
    }

    #[test]
    fn axial_speed_bound_is_asymmetric() {
        let m = machine();
        // Fast retreat (-Z) is within limits; fast closing (+Z) is not.
        let mut s = vehicle_at(Vector3::zeros());
        s.vel = Vector3::new(0.0, 0.0, -0.4);
        assert!(m.status(&s).within_speed_limits);
        s.vel = Vector3::new(0.0, 0.0, 0.6);
        assert!(!m.status(&s).within_speed_limits);
    }

    #[test]
    fn angle_criterion_uses_shortest_rotation() {
        let m = machine();
        let mut s = vehicle_at(Vector3::zeros());
        s.quat = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.05);
        let st = m.status(&s);
        assert!(st.in_angle, "2.9° error is inside the 10° limit");
        s.quat = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5);
        assert!(!m.status(&s).in_angle, "28.6° error is outside the limit");
    }

    #[test]
    fn excess_spin_blocks_capture() {
        let mut m = machine();
        assert!(m.try_undock(true, 0.0));
        let mut state = vehicle_at(Vector3::new(0.0, 0.0, 5.0));
        m.evaluate(&mut state, 1.0);
        state.pos = Vector3::zeros();
        state.omega = Vector3::new(0.0, 0.0, 0.5);
        m.evaluate(&mut state, 2.0);
        assert_eq!(m.phase(), DockPhase::Eligible, "angular rate above limit");
    }

    #[test]
    fn reset_returns_to_docked_zero_clock() {
        let mut m = machine();
        assert!(m.try_undock(true, 0.0));
        m.reset();
        assert!(m.is_docked());
        assert_eq!(m.clock().elapsed(99.0), 0.0);
    }
}
