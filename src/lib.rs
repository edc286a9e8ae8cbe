pub mod control;
pub mod docking;
pub mod dynamics;
pub mod io;
pub mod sim;

// Common public surface
pub mod types {
    pub use crate::control::binding::bind_thruster_channels;
    pub use crate::control::channels::{ChannelBindings, ControlChannel};
    pub use crate::control::desat::DesaturationController;
    pub use crate::control::fuel::{FuelState, FuelStatus, Propulsion, Thruster};
    pub use crate::control::momentum::{Cmg, ControlMode, MomentumBank, ReactionWheel};
    pub use crate::docking::{DockPhase, DockingReference, DockingStateMachine, DockingStatus};
    pub use crate::dynamics::state::{VehicleState, G0};
    pub use crate::io::config::{ConfigError, SessionConfig};
    pub use crate::sim::session::{ActuatorStatus, Session};
}
