use nalgebra::Vector3;

use crate::control::binding::bind_thruster_channels;
use crate::control::channels::{ChannelBindings, ControlChannel, CHANNEL_COUNT};
use crate::control::desat::DesaturationController;
use crate::control::fuel::{FuelState, FuelStatus, Propulsion};
use crate::control::momentum::{ControlMode, MomentumBank};
use crate::docking::{DockingStateMachine, DockingStatus};
use crate::dynamics::rigid::{integrate, BodyLoads};
use crate::dynamics::state::VehicleState;
use crate::io::config::{ConfigError, SessionConfig};

// ---------------------------------------------------------------------------
// Timed channel firings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TimedFiring {
    channel: ControlChannel,
    remaining: f64,
}

// ---------------------------------------------------------------------------
// Simulation session
// ---------------------------------------------------------------------------

/// One in-memory simulation session owning the vehicle and every control
/// subsystem. No process-wide state: collaborators hold a reference to the
/// session and drive it through the operations below.
///
/// The per-step phase order is fixed: resolve timed-firing expirations,
/// apply channel/desaturation forces and torques, integrate the rigid body,
/// evaluate docking, clear transient activation. While paused the force and
/// integration phases are skipped entirely but docking evaluation and the
/// transient clear still run.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: VehicleState,
    pub propulsion: Propulsion,
    pub bank: MomentumBank,
    pub desat: DesaturationController,
    pub docking: DockingStateMachine,
    pub bindings: ChannelBindings,
    control_torque: f64,
    paused: bool,
    wall_time: f64,
    held: [bool; CHANNEL_COUNT],
    timed: Vec<TimedFiring>,
    pending: BodyLoads,
    initial_state: VehicleState,
    initial_fuel: FuelState,
}

impl Session {
    /// Assemble a session from already-built parts. Starts docked and
    /// paused with the mission clock latched at zero.
    pub fn new(
        state: VehicleState,
        propulsion: Propulsion,
        bank: MomentumBank,
        docking: DockingStateMachine,
        control_torque: f64,
    ) -> Self {
        let bindings = bind_thruster_channels(&propulsion.thrusters);
        let initial_state = state.clone();
        let initial_fuel = propulsion.fuel.clone();
        Self {
            state,
            propulsion,
            bank,
            desat: DesaturationController::new(),
            docking,
            bindings,
            control_torque,
            paused: true,
            wall_time: 0.0,
            held: [false; CHANNEL_COUNT],
            timed: Vec::new(),
            pending: BodyLoads::new(),
            initial_state,
            initial_fuel,
        }
    }

    /// Build a session from a declarative configuration. The vehicle spawns
    /// at the docking reference pose (docked).
    pub fn from_config(cfg: &SessionConfig) -> Self {
        let fuel = cfg.vehicle.fuel_state();
        let mut state = VehicleState::new(fuel.total_mass(), cfg.vehicle.inertia.to_vector());
        let reference = cfg.docking.to_reference();
        state.pos = reference.position;
        state.quat = reference.orientation;

        let propulsion = Propulsion::new(cfg.thrusters(), fuel);
        let bank = MomentumBank::new(cfg.wheels(), cfg.cmg_units());
        let docking = DockingStateMachine::new(reference);
        Self::new(state, propulsion, bank, docking, cfg.vehicle.control_torque)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_config(&SessionConfig::from_json_str(json)?))
    }

    // -- exposed operations -------------------------------------------------

    /// Recompute the static channel map from current thruster geometry.
    pub fn bind_thruster_channels(&mut self) {
        self.bindings = bind_thruster_channels(&self.propulsion.thrusters);
    }

    /// Direct thruster firing (collaborator input path); the resulting
    /// loads are consumed by the next unpaused step. Refused while paused:
    /// fuel is only debited for an impulse the body will actually see.
    pub fn fire_thruster(&mut self, index: usize, dt: f64) -> bool {
        if self.paused {
            return false;
        }
        let mut loads = std::mem::take(&mut self.pending);
        let fired = self.propulsion.fire(index, dt, 1.0, &mut loads);
        self.pending = loads;
        fired
    }

    /// Direct torque request routed to the active momentum bank. Ignored
    /// while paused: the wheels must never absorb momentum without the
    /// body receiving the matching reaction.
    pub fn apply_control_torque(&mut self, torque: Vector3<f64>) {
        if self.paused {
            return;
        }
        let mut loads = std::mem::take(&mut self.pending);
        self.bank.apply_control_torque(torque, &self.state, &mut loads);
        self.pending = loads;
    }

    pub fn toggle_mode(&mut self) -> ControlMode {
        self.bank.toggle_mode()
    }

    /// Operator desaturation request; keeps re-arming itself every step
    /// until the active bank is back under its completion threshold.
    pub fn desaturate(&mut self) {
        self.desat.request(&self.bank);
    }

    /// Read-only docking criteria against the current pose.
    pub fn evaluate_docking(&self) -> DockingStatus {
        self.docking.status(&self.state)
    }

    pub fn fuel_status(&self) -> FuelStatus {
        self.propulsion.status()
    }

    pub fn actuator_status(&self) -> ActuatorStatus {
        ActuatorStatus {
            mode: self.bank.mode(),
            wheel_saturations: self.bank.wheels.iter().map(|w| w.saturation()).collect(),
            peak_wheel_momentum: self.bank.peak_wheel_momentum(),
            total_cmg_momentum: self.bank.total_cmg_momentum().norm(),
            desaturation_active: self.desat.is_active(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Global pause gate; also freezes/unfreezes the mission clock.
    pub fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.docking.clock_mut().pause(self.wall_time);
        } else {
            self.docking.clock_mut().resume(self.wall_time);
        }
    }

    /// Manual undock; legal only while docked and paused. The restarted
    /// mission clock immediately re-enters the paused state so elapsed time
    /// starts counting at the first resume.
    pub fn undock(&mut self) -> bool {
        let undocked = self.docking.try_undock(self.paused, self.wall_time);
        if undocked && self.paused {
            self.docking.clock_mut().pause(self.wall_time);
        }
        undocked
    }

    /// Elapsed unpaused seconds since the last undock.
    pub fn elapsed(&self) -> f64 {
        self.docking.clock().elapsed(self.wall_time)
    }

    /// Momentary channel activation; lasts for the next step only and must
    /// be re-asserted each frame.
    pub fn set_channel(&mut self, channel: ControlChannel) {
        self.held[channel.index()] = true;
    }

    /// Hold a channel active for a fixed duration; dropped from the active
    /// set once its time elapses.
    pub fn pulse_channel(&mut self, channel: ControlChannel, seconds: f64) {
        if seconds > 0.0 {
            self.timed.push(TimedFiring {
                channel,
                remaining: seconds,
            });
        }
    }

    /// Full reset: initial pose, full initial fuel, zero stored momentum,
    /// docked and paused with the clock latched at zero.
    pub fn reset_all(&mut self) {
        self.state = self.initial_state.clone();
        self.propulsion.fuel = self.initial_fuel.clone();
        self.propulsion.clear_active_flags();
        self.bank.reset();
        self.desat.reset();
        self.docking.reset();
        self.paused = true;
        self.held = [false; CHANNEL_COUNT];
        self.timed.clear();
        self.pending.clear();
    }

    // -- step loop ----------------------------------------------------------

    /// Advance the session one fixed step.
    pub fn step(&mut self, dt: f64) {
        self.wall_time += dt;

        // (1) Resolve timed-firing expirations. Timers burn down in
        // simulated time only, so a pulse queued before a pause keeps its
        // remaining duration until the resume.
        self.timed.retain(|t| t.remaining > 0.0);
        let mut active = self.held;
        for firing in &mut self.timed {
            active[firing.channel.index()] = true;
            if !self.paused {
                firing.remaining -= dt;
            }
        }

        if !self.paused {
            let mut loads = std::mem::take(&mut self.pending);
            self.propulsion.clear_active_flags();

            // (2) Channel-driven forces and torques. Translation channels
            // always fire thrusters; rotation channels fire thrusters only
            // in thruster mode and otherwise request torque from the active
            // momentum bank. Wheel arbitration delivers the negative
            // reaction to the body, so wheel-mode requests are sign-flipped
            // to honor the operator's intent.
            let mut requested = Vector3::zeros();
            for channel in ControlChannel::ALL {
                if !active[channel.index()] {
                    continue;
                }
                if channel.is_translation() || self.bank.mode() == ControlMode::Thrusters {
                    let bound = self.bindings.thrusters_for(channel).to_vec();
                    for index in bound {
                        self.propulsion.fire(index, dt, 1.0, &mut loads);
                    }
                } else if let Some(axis) = channel.torque_axis() {
                    let sign = match self.bank.mode() {
                        ControlMode::ReactionWheels => -1.0,
                        _ => 1.0,
                    };
                    requested += axis * (sign * self.control_torque);
                }
            }
            if requested != Vector3::zeros() {
                self.bank
                    .apply_control_torque(requested, &self.state, &mut loads);
            }

            // Desaturation may independently inject thruster firings.
            self.desat
                .step(&mut self.bank, &mut self.propulsion, dt, &mut loads);

            // Fuel debits change the mass scalar only; inertia stays as
            // configured.
            self.propulsion.sync_mass(&mut self.state);

            // (3) Rigid-body substep.
            integrate(&mut self.state, &loads, dt);
        }
        // While paused, phases (2)-(3) are skipped entirely; pending loads
        // already paid for with fuel are held for the next unpaused step.

        // (5) Docking evaluation runs even while paused so UI state stays
        // consistent. (Presentation sync, phase 4, is out of scope.)
        self.docking.evaluate(&mut self.state, self.wall_time);

        // (6) Clear transient per-frame activation.
        self.held = [false; CHANNEL_COUNT];
    }
}

/// Actuator bank snapshot for the presentation layer.
#[derive(Debug, Clone)]
pub struct ActuatorStatus {
    pub mode: ControlMode,
    pub wheel_saturations: Vec<f64>,
    pub peak_wheel_momentum: f64,
    pub total_cmg_momentum: f64,
    pub desaturation_active: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::fuel::Thruster;
    use crate::control::momentum::ReactionWheel;
    use crate::docking::{DockPhase, DockingReference, DockingStateMachine};
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    /// Light vehicle with an opposed fore/aft thruster pair through the
    /// CoM and one reaction wheel.
    fn session() -> Session {
        let fuel = FuelState::new(90.0, 10.0, 10.0);
        let state = VehicleState::new(fuel.total_mass(), Vector3::new(50.0, 50.0, 50.0));
        let propulsion = Propulsion::new(
            vec![
                Thruster::new("fore", Vector3::zeros(), Vector3::z(), 200.0, 300.0),
                Thruster::new("aft", Vector3::zeros(), -Vector3::z(), 200.0, 300.0),
            ],
            fuel,
        );
        let bank = MomentumBank::new(
            vec![ReactionWheel::new("x", Vector3::x(), Vector3::zeros(), 10.0, 2.0)],
            vec![],
        );
        let docking = DockingStateMachine::new(DockingReference::default());
        Session::new(state, propulsion, bank, docking, 5.0)
    }

    #[test]
    fn starts_docked_and_paused() {
        let s = session();
        assert!(s.is_paused());
        assert!(s.docking.is_docked());
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn paused_steps_do_not_move_or_burn() {
        let mut s = session();
        s.set_channel(ControlChannel::Forward);
        let fuel_before = s.fuel_status().fuel_mass;
        for _ in 0..10 {
            s.step(DT);
        }
        assert_eq!(s.state.pos, Vector3::zeros());
        assert_eq!(s.fuel_status().fuel_mass, fuel_before);
    }

    #[test]
    fn held_channel_fires_bound_thrusters() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        let fuel_before = s.fuel_status().fuel_mass;
        for _ in 0..60 {
            s.set_channel(ControlChannel::Forward);
            s.step(DT);
        }
        assert!(s.state.vel.z > 0.0, "forward channel should accelerate +Z");
        assert!(s.fuel_status().fuel_mass < fuel_before, "firing burns fuel");
        assert_relative_eq!(s.state.mass, s.fuel_status().total_mass, epsilon = 1e-12);
    }

    #[test]
    fn channel_activation_is_transient() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        s.set_channel(ControlChannel::Forward);
        s.step(DT);
        let v = s.state.vel.z;
        s.step(DT); // not re-asserted → no further thrust
        assert_relative_eq!(s.state.vel.z, v, epsilon = 1e-12);
    }

    #[test]
    fn pulse_expires_after_its_duration() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        s.pulse_channel(ControlChannel::Forward, 3.0 * DT);
        for _ in 0..10 {
            s.step(DT);
        }
        let fuel_after_pulse = s.fuel_status().fuel_mass;
        for _ in 0..10 {
            s.step(DT);
        }
        assert_eq!(s.fuel_status().fuel_mass, fuel_after_pulse, "expired pulse stops burning");
        assert!(s.state.vel.z > 0.0);
    }

    #[test]
    fn rotation_channel_in_wheel_mode_spins_vehicle_as_commanded() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        assert_eq!(s.toggle_mode(), ControlMode::ReactionWheels);
        for _ in 0..30 {
            s.set_channel(ControlChannel::PitchDown); // desired body torque +X
            s.step(DT);
        }
        assert!(
            s.state.omega.x > 0.0,
            "pitch-down command should produce +X body rate, got {:?}",
            s.state.omega
        );
        assert!(s.bank.wheels[0].momentum != 0.0, "wheel absorbed momentum");
    }

    #[test]
    fn docking_round_trip_through_session() {
        let mut s = session();
        assert!(s.undock());
        assert_eq!(s.docking.phase(), DockPhase::Undocked);
        s.set_paused(false);

        // Burn aft-ward until outside the 1 m docking box.
        while s.evaluate_docking().in_box {
            s.set_channel(ControlChannel::Backward);
            s.step(DT);
        }
        s.step(DT);
        assert_eq!(s.docking.phase(), DockPhase::Eligible);

        // Park the vehicle back inside every criterion and step once.
        s.state.pos = Vector3::new(0.1, 0.0, 0.2);
        s.state.vel = Vector3::new(0.0, 0.0, 0.1);
        s.state.omega = Vector3::zeros();
        s.step(DT);
        assert_eq!(s.docking.phase(), DockPhase::Docked);
        assert_eq!(s.state.vel, Vector3::zeros(), "capture arrests motion");
        let latched = s.elapsed();
        s.step(DT);
        assert_eq!(s.elapsed(), latched, "clock frozen while docked");
    }

    #[test]
    fn undock_refused_while_unpaused() {
        let mut s = session();
        s.set_paused(false);
        assert!(!s.undock());
    }

    #[test]
    fn reset_all_restores_initial_session() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        for _ in 0..120 {
            s.set_channel(ControlChannel::Forward);
            s.step(DT);
        }
        assert!(s.fuel_status().fuel_mass < 10.0);

        s.reset_all();
        assert!(s.is_paused());
        assert!(s.docking.is_docked());
        assert_eq!(s.fuel_status().fuel_mass, 10.0);
        assert_eq!(s.state.pos, Vector3::zeros());
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn empty_config_degrades_to_idle_session() {
        let mut s = Session::from_json_str(
            r#"{ "vehicle": { "dry_mass": 100.0, "fuel_mass": 0.0, "max_fuel_mass": 0.0,
                               "inertia": [10.0, 10.0, 10.0] } }"#,
        )
        .unwrap();
        assert!(s.undock());
        s.set_paused(false);
        for channel in ControlChannel::ALL {
            s.set_channel(channel);
        }
        s.step(DT);
        assert_eq!(s.state.vel, Vector3::zeros(), "no actuators → safe no-op idle");
        assert_eq!(s.toggle_mode(), ControlMode::Thrusters, "mode pinned without actuators");
    }

    #[test]
    fn paused_direct_inputs_are_refused_without_side_effects() {
        let mut s = session();
        assert!(s.undock());
        assert!(s.is_paused());
        assert_eq!(s.toggle_mode(), ControlMode::ReactionWheels);

        let fuel_before = s.fuel_status().fuel_mass;
        assert!(!s.fire_thruster(0, DT), "firing while paused is refused");
        s.apply_control_torque(Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(s.fuel_status().fuel_mass, fuel_before, "no fuel debit while paused");
        assert_eq!(s.bank.wheels[0].momentum, 0.0, "wheels untouched while paused");

        s.step(DT);
        s.set_paused(false);
        s.step(DT);
        assert_eq!(s.state.vel, Vector3::zeros(), "refused inputs leave no impulse behind");
        assert_eq!(s.state.omega, Vector3::zeros());
    }

    #[test]
    fn pending_loads_survive_a_pause() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        assert!(s.fire_thruster(0, DT));
        let fuel_after_fire = s.fuel_status().fuel_mass;

        s.set_paused(true);
        s.step(DT);
        assert_eq!(s.state.vel, Vector3::zeros(), "paused step applies no physics");

        s.set_paused(false);
        s.step(DT);
        assert!(s.state.vel.z > 0.0, "impulse paid for with fuel reaches the body on resume");
        assert_eq!(s.fuel_status().fuel_mass, fuel_after_fire, "no second debit");
    }

    #[test]
    fn pulse_timer_freezes_while_paused() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        s.pulse_channel(ControlChannel::Forward, 3.0 * DT);
        s.step(DT);
        let v = s.state.vel.z;
        assert!(v > 0.0);

        s.set_paused(true);
        for _ in 0..10 {
            s.step(DT);
        }
        assert_relative_eq!(s.state.vel.z, v, epsilon = 1e-12);

        s.set_paused(false);
        for _ in 0..5 {
            s.step(DT);
        }
        assert!(
            s.state.vel.z > v,
            "remaining pulse duration still fires after the resume"
        );
    }

    #[test]
    fn direct_fire_applies_on_next_step() {
        let mut s = session();
        assert!(s.undock());
        s.set_paused(false);
        assert!(s.fire_thruster(0, DT));
        s.step(DT);
        assert!(s.state.vel.z > 0.0);
        assert!(!s.fire_thruster(99, DT), "out-of-range index is a no-op");
    }
}
