pub mod binding;
pub mod channels;
pub mod desat;
pub mod fuel;
pub mod momentum;

pub use binding::bind_thruster_channels;
pub use channels::{ChannelBindings, ControlChannel};
pub use desat::DesaturationController;
pub use fuel::{FuelState, FuelStatus, Propulsion, Thruster};
pub use momentum::{Cmg, ControlMode, MomentumBank, ReactionWheel};
