pub mod clock;
pub mod machine;

pub use clock::MissionClock;
pub use machine::{DockPhase, DockingReference, DockingStateMachine, DockingStatus};
