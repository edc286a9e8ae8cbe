use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Control channels: 6 translation + 6 rotation inputs
// ---------------------------------------------------------------------------

/// One of the 12 discrete control inputs a thruster can be bound to.
///
/// Body frame convention (documented once, applied uniformly): right-handed,
/// +Z forward, +Y up, +X starboard. Translation channels are labeled by the
/// local axis sign of a bound thruster's fire direction: a thruster firing
/// along +Z binds `Forward`. Rotation channels take the sign of the
/// `position × direction` torque component: +X torque pitches the nose
/// toward -Y (`PitchDown`), +Y torque yaws the nose toward +X (`YawRight`),
/// +Z torque rolls +X toward +Y (`RollLeft`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChannel {
    Forward,   // translate +Z
    Backward,  // translate -Z
    Up,        // translate +Y
    Down,      // translate -Y
    Right,     // translate +X
    Left,      // translate -X
    PitchUp,   // torque -X
    PitchDown, // torque +X
    YawRight,  // torque +Y
    YawLeft,   // torque -Y
    RollLeft,  // torque +Z
    RollRight, // torque -Z
}

pub const CHANNEL_COUNT: usize = 12;

impl ControlChannel {
    pub const ALL: [ControlChannel; CHANNEL_COUNT] = [
        ControlChannel::Forward,
        ControlChannel::Backward,
        ControlChannel::Up,
        ControlChannel::Down,
        ControlChannel::Right,
        ControlChannel::Left,
        ControlChannel::PitchUp,
        ControlChannel::PitchDown,
        ControlChannel::YawRight,
        ControlChannel::YawLeft,
        ControlChannel::RollLeft,
        ControlChannel::RollRight,
    ];

    /// Stable index for dense per-channel tables.
    pub fn index(self) -> usize {
        match self {
            ControlChannel::Forward => 0,
            ControlChannel::Backward => 1,
            ControlChannel::Up => 2,
            ControlChannel::Down => 3,
            ControlChannel::Right => 4,
            ControlChannel::Left => 5,
            ControlChannel::PitchUp => 6,
            ControlChannel::PitchDown => 7,
            ControlChannel::YawRight => 8,
            ControlChannel::YawLeft => 9,
            ControlChannel::RollLeft => 10,
            ControlChannel::RollRight => 11,
        }
    }

    pub fn is_translation(self) -> bool {
        self.index() < 6
    }

    pub fn is_rotation(self) -> bool {
        !self.is_translation()
    }

    /// Body-frame torque direction requested by a rotation channel.
    pub fn torque_axis(self) -> Option<Vector3<f64>> {
        match self {
            ControlChannel::PitchUp => Some(-Vector3::x()),
            ControlChannel::PitchDown => Some(Vector3::x()),
            ControlChannel::YawRight => Some(Vector3::y()),
            ControlChannel::YawLeft => Some(-Vector3::y()),
            ControlChannel::RollLeft => Some(Vector3::z()),
            ControlChannel::RollRight => Some(-Vector3::z()),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlChannel::Forward => "forward",
            ControlChannel::Backward => "backward",
            ControlChannel::Up => "up",
            ControlChannel::Down => "down",
            ControlChannel::Right => "right",
            ControlChannel::Left => "left",
            ControlChannel::PitchUp => "pitch_up",
            ControlChannel::PitchDown => "pitch_down",
            ControlChannel::YawRight => "yaw_right",
            ControlChannel::YawLeft => "yaw_left",
            ControlChannel::RollLeft => "roll_left",
            ControlChannel::RollRight => "roll_right",
        }
    }

    /// Parse a configuration label: case-insensitive, trimmed, with the
    /// common +/- spellings accepted.
    pub fn parse(label: &str) -> Option<ControlChannel> {
        let norm = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let channel = match norm.as_str() {
            "forward" | "fwd" | "z+" => ControlChannel::Forward,
            "backward" | "back" | "aft" | "z_" => ControlChannel::Backward,
            "up" | "y+" => ControlChannel::Up,
            "down" | "y_" => ControlChannel::Down,
            "right" | "starboard" | "x+" => ControlChannel::Right,
            "left" | "port" | "x_" => ControlChannel::Left,
            "pitch_up" | "pitchup" | "pitch+" => ControlChannel::PitchUp,
            "pitch_down" | "pitchdown" | "pitch_" => ControlChannel::PitchDown,
            "yaw_right" | "yawright" | "yaw+" => ControlChannel::YawRight,
            "yaw_left" | "yawleft" | "yaw_" => ControlChannel::YawLeft,
            "roll_left" | "rollleft" | "roll+" => ControlChannel::RollLeft,
            "roll_right" | "rollright" | "roll_" => ControlChannel::RollRight,
            _ => return None,
        };
        Some(channel)
    }
}

// ---------------------------------------------------------------------------
// Channel → thruster bindings
// ---------------------------------------------------------------------------

/// Ordered thruster index sets per channel. A thruster may appear in zero,
/// one, or several channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    slots: [Vec<usize>; CHANNEL_COUNT],
}

impl ChannelBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, channel: ControlChannel, thruster: usize) {
        let slot = &mut self.slots[channel.index()];
        if !slot.contains(&thruster) {
            slot.push(thruster);
        }
    }

    pub fn thrusters_for(&self, channel: ControlChannel) -> &[usize] {
        &self.slots[channel.index()]
    }

    pub fn is_bound(&self, thruster: usize) -> bool {
        self.slots.iter().any(|s| s.contains(&thruster))
    }

    pub fn total_bindings(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
