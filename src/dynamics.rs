pub mod rigid;
pub mod state;

pub use rigid::{integrate, BodyLoads};
pub use state::{VehicleState, G0};
