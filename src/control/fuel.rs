use nalgebra::Vector3;
use tracing::warn;

use crate::dynamics::rigid::BodyLoads;
use crate::dynamics::state::{VehicleState, G0};

// ---------------------------------------------------------------------------
// Thruster
// ---------------------------------------------------------------------------

/// One discrete thruster unit.
///
/// `position` is vehicle-local and already adjusted by the configured
/// center-of-mass offset; `direction` is the unit fire direction in the
/// vehicle frame. `active` is a presentation flag with no physical effect.
#[derive(Debug, Clone)]
pub struct Thruster {
    pub name: String,
    pub position: Vector3<f64>,
    pub direction: Vector3<f64>,
    pub thrust: f64, // N
    pub isp: f64,    // s
    pub auto_bind: bool,
    pub keybinds: Vec<String>,
    pub active: bool,
}

impl Thruster {
    pub fn new(
        name: impl Into<String>,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        thrust: f64,
        isp: f64,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            direction,
            thrust,
            isp,
            auto_bind: true,
            keybinds: Vec::new(),
            active: false,
        }
    }

    pub fn with_keybinds(mut self, keybinds: Vec<String>) -> Self {
        self.auto_bind = false;
        self.keybinds = keybinds;
        self
    }

    /// Torque lever direction: position × direction (unnormalized).
    pub fn torque_arm(&self) -> Vector3<f64> {
        self.position.cross(&self.direction)
    }

    /// Propellant mass flow at full throttle, kg/s.
    pub fn mass_flow(&self) -> f64 {
        self.thrust / (self.isp * G0)
    }

    fn is_valid(&self) -> bool {
        self.thrust.is_finite() && self.thrust > 0.0 && self.isp.is_finite() && self.isp > 0.0
    }
}

// ---------------------------------------------------------------------------
// Fuel state
// ---------------------------------------------------------------------------

/// Finite propellant budget. `fuel_mass` is monotonically non-increasing
/// except on explicit reset; vehicle total mass is `dry_mass + fuel_mass`.
#[derive(Debug, Clone)]
pub struct FuelState {
    pub dry_mass: f64,
    pub fuel_mass: f64,
    pub max_fuel_mass: f64,
}

impl FuelState {
    pub fn new(dry_mass: f64, fuel_mass: f64, max_fuel_mass: f64) -> Self {
        Self {
            dry_mass,
            fuel_mass: fuel_mass.clamp(0.0, max_fuel_mass),
            max_fuel_mass,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.fuel_mass
    }

    pub fn fraction(&self) -> f64 {
        if self.max_fuel_mass > 0.0 {
            self.fuel_mass / self.max_fuel_mass
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fuel_mass <= 0.0
    }
}

/// Fuel and mass snapshot for the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct FuelStatus {
    pub fuel_mass: f64,
    pub max_fuel_mass: f64,
    pub fraction: f64,
    pub total_mass: f64,
}

// ---------------------------------------------------------------------------
// Propulsion: thruster bank + fuel budget
// ---------------------------------------------------------------------------

/// Owns the thruster bank and the propellant budget; converts firing
/// requests into body loads and fuel debits.
#[derive(Debug, Clone)]
pub struct Propulsion {
    pub thrusters: Vec<Thruster>,
    pub fuel: FuelState,
}

impl Propulsion {
    pub fn new(thrusters: Vec<Thruster>, fuel: FuelState) -> Self {
        Self { thrusters, fuel }
    }

    /// Fire one thruster for `dt` seconds at the given throttle fraction.
    ///
    /// Returns whether thrust was applied. Fuel exhaustion and invalid
    /// thrust/ISP are handled by skip-and-deactivate, never an error. A
    /// firing that exhausts the last of the fuel is still applied for this
    /// step; the thruster is marked inactive immediately afterward.
    pub fn fire(&mut self, index: usize, dt: f64, throttle: f64, loads: &mut BodyLoads) -> bool {
        let Some(thruster) = self.thrusters.get_mut(index) else {
            return false;
        };
        if self.fuel.is_empty() {
            thruster.active = false;
            return false;
        }
        // Defensive re-check at fire time, independent of load-time
        // sanitization.
        if !thruster.is_valid() {
            warn!(
                thruster = %thruster.name,
                thrust = thruster.thrust,
                isp = thruster.isp,
                "skipping thruster with invalid thrust/ISP"
            );
            thruster.active = false;
            return false;
        }

        let thrust = thruster.thrust * throttle.clamp(0.0, 1.0);
        let mass_flow = thrust / (thruster.isp * G0);
        self.fuel.fuel_mass = (self.fuel.fuel_mass - mass_flow * dt).max(0.0);

        loads.add_local_force_at(thruster.direction * thrust, thruster.position);
        thruster.active = !self.fuel.is_empty();
        true
    }

    /// Keep the rigid body's mass scalar consistent with `dry + fuel`.
    /// The inertia diagonal is configured explicitly and never touched here.
    pub fn sync_mass(&self, state: &mut VehicleState) {
        state.mass = self.fuel.total_mass();
    }

    /// Clear per-frame presentation flags.
    pub fn clear_active_flags(&mut self) {
        for t in &mut self.thrusters {
            t.active = false;
        }
    }

    pub fn status(&self) -> FuelStatus {
        FuelStatus {
            fuel_mass: self.fuel.fuel_mass,
            max_fuel_mass: self.fuel.max_fuel_mass,
            fraction: self.fuel.fraction(),
            total_mass: self.fuel.total_mass(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_thruster(fuel: f64) -> Propulsion {
        Propulsion::new(
            vec![Thruster::new(
                "main",
                Vector3::zeros(),
                Vector3::z(),
                50.0,
                300.0,
            )],
            FuelState::new(900.0, fuel, 100.0),
        )
    }

    #[test]
    fn mass_flow_matches_rocket_equation() {
        let p = single_thruster(100.0);
        assert_relative_eq!(p.thrusters[0].mass_flow(), 50.0 / (300.0 * G0), epsilon = 1e-12);
    }

    #[test]
    fn fuel_is_monotone_and_never_negative() {
        let mut p = single_thruster(0.001);
        let mut loads = BodyLoads::new();
        let mut prev = p.fuel.fuel_mass;
        for _ in 0..200 {
            p.fire(0, 1.0, 1.0, &mut loads);
            assert!(p.fuel.fuel_mass <= prev, "fuel must be non-increasing");
            assert!(p.fuel.fuel_mass >= 0.0, "fuel must never go negative");
            prev = p.fuel.fuel_mass;
        }
        assert_eq!(p.fuel.fuel_mass, 0.0);
    }

    #[test]
    fn exhausting_firing_still_applies_then_deactivates() {
        let mut p = single_thruster(1e-9);
        let mut loads = BodyLoads::new();
        assert!(p.fire(0, 1.0, 1.0, &mut loads), "last firing should apply");
        assert!(loads.force_body.z > 0.0);
        assert!(!p.thrusters[0].active, "thruster deactivates once fuel is gone");
        loads.clear();
        assert!(!p.fire(0, 1.0, 1.0, &mut loads), "no firing on empty tank");
        assert!(loads.is_zero());
    }

    #[test]
    fn invalid_thruster_is_skipped_and_deactivated() {
        let mut p = single_thruster(100.0);
        p.thrusters[0].thrust = f64::NAN;
        p.thrusters[0].active = true;
        let mut loads = BodyLoads::new();
        assert!(!p.fire(0, 1.0, 1.0, &mut loads));
        assert!(loads.is_zero());
        assert!(!p.thrusters[0].active);
        assert_eq!(p.fuel.fuel_mass, 100.0, "no debit for a skipped firing");
    }

    #[test]
    fn throttle_scales_force_and_debit() {
        let mut full = single_thruster(100.0);
        let mut half = single_thruster(100.0);
        let mut lf = BodyLoads::new();
        let mut lh = BodyLoads::new();
        full.fire(0, 1.0, 1.0, &mut lf);
        half.fire(0, 1.0, 0.5, &mut lh);
        assert_relative_eq!(lh.force_body.z, lf.force_body.z * 0.5, epsilon = 1e-12);
        let burned_full = 100.0 - full.fuel.fuel_mass;
        let burned_half = 100.0 - half.fuel.fuel_mass;
        assert_relative_eq!(burned_half, burned_full * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn sync_mass_updates_scalar_not_inertia() {
        let mut p = single_thruster(100.0);
        let inertia = Vector3::new(400.0, 400.0, 200.0);
        let mut state = VehicleState::new(p.fuel.total_mass(), inertia);
        let mut loads = BodyLoads::new();
        p.fire(0, 10.0, 1.0, &mut loads);
        p.sync_mass(&mut state);
        assert!(state.mass < 1000.0);
        assert_relative_eq!(state.mass, p.fuel.total_mass(), epsilon = 1e-12);
        assert_eq!(state.inertia, inertia, "inertia must not be rederived from mass");
    }
}
