use nalgebra::Vector3;

use dock_sim::types::{ControlChannel, DockPhase, Session};

// ---------------------------------------------------------------------------
// Demo session: a small tug with an RCS quad layout
// ---------------------------------------------------------------------------

const SESSION_JSON: &str = r#"{
    "thrusters": [
        { "name": "fwd-a",  "position": [ 0.0,  0.0, -1.2], "direction": [0, 0,  1], "thrust": 400.0, "isp": 290.0 },
        { "name": "aft-a",  "position": [ 0.0,  0.0,  1.2], "direction": [0, 0, -1], "thrust": 400.0, "isp": 290.0 },
        { "name": "up-a",   "position": [ 0.0, -0.8,  0.0], "direction": [0, 1,  0], "thrust": 400.0, "isp": 290.0 },
        { "name": "dn-a",   "position": [ 0.0,  0.8,  0.0], "direction": [0, -1, 0], "thrust": 400.0, "isp": 290.0 },
        { "name": "stbd-a", "position": [-0.8,  0.0,  0.0], "direction": [1, 0,  0], "thrust": 400.0, "isp": 290.0 },
        { "name": "port-a", "position": [ 0.8,  0.0,  0.0], "direction": [-1, 0, 0], "thrust": 400.0, "isp": 290.0 }
    ],
    "reaction_wheels": [
        { "name": "rw-x", "orientation": {"x": 1, "y": 0, "z": 0}, "maxAngularMomentum": 10.0, "maxTorque": 2.0 },
        { "name": "rw-y", "orientation": {"x": 0, "y": 1, "z": 0}, "maxAngularMomentum": 10.0, "maxTorque": 2.0 },
        { "name": "rw-z", "orientation": {"x": 0, "y": 0, "z": 1}, "maxAngularMomentum": 10.0, "maxTorque": 2.0 }
    ],
    "vehicle": { "dry_mass": 800.0, "fuel_mass": 200.0, "max_fuel_mass": 200.0,
                 "inertia": [450.0, 450.0, 300.0] },
    "docking": { "position": [0, 0, 0], "box_half_size": [1.0, 1.0, 1.0],
                 "angle_limit_deg": 10.0, "lateral_speed_limit": 0.5,
                 "axial_speed_limit": 0.5, "angular_speed_limit": 0.1 }
}"#;

const DT: f64 = 1.0 / 60.0;

/// Simple per-axis bang-bang pilot: chase a clamped closing-speed profile
/// toward the reference, then let the docking criteria capture the vehicle.
fn pilot(session: &mut Session, target: Vector3<f64>) {
    let err = target - session.state.pos;
    let vel = session.state.vel;
    for (axis, pos_channel, neg_channel) in [
        (0, ControlChannel::Right, ControlChannel::Left),
        (1, ControlChannel::Up, ControlChannel::Down),
        (2, ControlChannel::Forward, ControlChannel::Backward),
    ] {
        let desired = (0.4 * err[axis]).clamp(-0.4, 0.4);
        let dv = desired - vel[axis];
        if dv > 0.02 {
            session.set_channel(pos_channel);
        } else if dv < -0.02 {
            session.set_channel(neg_channel);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let mut session = Session::from_json_str(SESSION_JSON).expect("embedded session JSON is valid");

    println!();
    println!("====================================================================");
    println!("  RCS DOCKING SIMULATION");
    println!("====================================================================");
    println!();
    println!("  Vehicle");
    println!("  ──────────────────────────────────────────────────────────────────");
    let fuel = session.fuel_status();
    println!(
        "  Total mass:   {:>8.1} kg    Fuel:        {:>8.1} kg",
        fuel.total_mass, fuel.fuel_mass
    );
    println!(
        "  Thrusters:    {:>8}       Bindings:    {:>8}",
        session.propulsion.thrusters.len(),
        session.bindings.total_bindings()
    );
    println!(
        "  Wheels:       {:>8}       Mode:        {:>8}",
        session.bank.wheels.len(),
        session.actuator_status().mode.label()
    );
    println!();

    // -----------------------------------------------------------------------
    // Undock, back away, return, and let the state machine capture
    // -----------------------------------------------------------------------
    assert!(session.undock(), "vehicle starts docked and paused");
    session.set_paused(false);

    // Phase 1: back out well clear of the docking box.
    let standoff = Vector3::new(0.0, 0.0, -8.0);
    let mut left_box_at = None;
    for _ in 0..60 * 120 {
        pilot(&mut session, standoff);
        session.step(DT);
        if left_box_at.is_none() && !session.evaluate_docking().in_box {
            left_box_at = Some(session.elapsed());
        }
        if (session.state.pos - standoff).norm() < 0.5 && session.state.vel.norm() < 0.1 {
            break;
        }
    }
    match left_box_at {
        Some(t) => println!("  t={:>6.1}s  left docking box", t),
        None => println!("  never left the docking box"),
    }
    println!(
        "  t={:>6.1}s  holding at standoff ({:.1} m out)",
        session.elapsed(),
        (session.state.pos - session.docking.reference.position).norm()
    );

    // Phase 2: fly back in and capture.
    let target = session.docking.reference.position;
    let mut docked = false;
    for _ in 0..60 * 300 {
        pilot(&mut session, target);
        session.step(DT);
        if session.docking.phase() == DockPhase::Docked {
            docked = true;
            break;
        }
    }

    // -----------------------------------------------------------------------
    // Report
    // -----------------------------------------------------------------------
    println!();
    println!("  Result");
    println!("  ──────────────────────────────────────────────────────────────────");
    let status = session.evaluate_docking();
    let fuel = session.fuel_status();
    if docked {
        println!("  DOCKED    t={:>6.1}s", session.elapsed());
    } else {
        println!("  NOT DOCKED after {:>6.1}s", session.elapsed());
    }
    println!(
        "  Position error:  {:>7.3} m     Angle error:  {:>6.2}°",
        status.position_error.norm(),
        status.angle_error_deg
    );
    println!(
        "  Fuel remaining:  {:>7.1} kg    ({:>5.1}% of capacity)",
        fuel.fuel_mass,
        fuel.fraction * 100.0
    );
    println!();
}
