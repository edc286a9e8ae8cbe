use super::channels::{ChannelBindings, ControlChannel};
use super::fuel::Thruster;

// ---------------------------------------------------------------------------
// Automatic / manual thruster-to-channel classification
// ---------------------------------------------------------------------------

/// Cosine of 65° — a thruster direction within 25° of a principal axis
/// counts as translating along that axis.
pub const AXIS_TOLERANCE: f64 = 0.422_618_261_740_699_4;

/// Minimum |torque component| for a thruster to count as a rotation
/// effector about that axis.
pub const TORQUE_DEADBAND: f64 = 0.025;

/// Classify every thruster into translation/rotation channels.
///
/// Pure function of the thruster geometry and keybind configuration, so the
/// result is identical on every invocation. Computed once at configuration
/// load; assumes well-formed geometry (validated upstream).
///
/// Auto mode projects the fire direction onto the principal axes for
/// translation and uses the `position × direction` torque components for
/// rotation. A geometrically off-axis thruster may legitimately receive
/// both a translation and several rotation bindings. Manual mode binds the
/// listed channel labels verbatim; an empty list leaves the thruster
/// unbound.
pub fn bind_thruster_channels(thrusters: &[Thruster]) -> ChannelBindings {
    let mut bindings = ChannelBindings::new();

    for (index, thruster) in thrusters.iter().enumerate() {
        if !thruster.auto_bind {
            for label in &thruster.keybinds {
                if let Some(channel) = ControlChannel::parse(label) {
                    bindings.bind(channel, index);
                }
            }
            continue;
        }

        // Translation: labeled by the local axis sign of the fire direction.
        let d = thruster.direction;
        if d.x.abs() > AXIS_TOLERANCE {
            let c = if d.x > 0.0 { ControlChannel::Right } else { ControlChannel::Left };
            bindings.bind(c, index);
        }
        if d.y.abs() > AXIS_TOLERANCE {
            let c = if d.y > 0.0 { ControlChannel::Up } else { ControlChannel::Down };
            bindings.bind(c, index);
        }
        if d.z.abs() > AXIS_TOLERANCE {
            let c = if d.z > 0.0 { ControlChannel::Forward } else { ControlChannel::Backward };
            bindings.bind(c, index);
        }

        // Rotation: sign of the lever-arm torque component per axis.
        let torque = thruster.torque_arm();
        if torque.x.abs() > TORQUE_DEADBAND {
            let c = if torque.x > 0.0 { ControlChannel::PitchDown } else { ControlChannel::PitchUp };
            bindings.bind(c, index);
        }
        if torque.y.abs() > TORQUE_DEADBAND {
            let c = if torque.y > 0.0 { ControlChannel::YawRight } else { ControlChannel::YawLeft };
            bindings.bind(c, index);
        }
        if torque.z.abs() > TORQUE_DEADBAND {
            let c = if torque.z > 0.0 { ControlChannel::RollLeft } else { ControlChannel::RollRight };
            bindings.bind(c, index);
        }
    }

    bindings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
