pub mod session;

pub use session::{ActuatorStatus, Session};
