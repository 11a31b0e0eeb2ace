use glam::DVec2;
use ik_skeleton2d::ik::{
    Chain, ChainId, ConnectorConfig, ConnectorKind, IterativeSolver, JointLimits, LimbSolver,
    Skeleton, Terminator,
};
use ik_skeleton2d::{Interaction, KinematicsResult, PoseEvent};
use std::f64::consts::{FRAC_PI_2, PI};

fn leg(skeleton: &mut Skeleton, label: &str) -> KinematicsResult<ChainId> {
    Chain::builder(DVec2::ZERO)
        .add_bone(DVec2::new(60.0, 0.0))
        .add_bone(DVec2::new(110.0, 0.0))
        .solver(LimbSolver::default())
        .redraw_on_solve(true)
        .label(label)
        .build(skeleton)
}

fn main() -> KinematicsResult<()> {
    env_logger::init();

    let mut skeleton = Skeleton::new();
    skeleton.subscribe(Box::new(|event: &PoseEvent| {
        if let PoseEvent::Solved { chain, resolved } = event {
            log::info!("{:?} solved, resolved={}", chain, resolved);
        }
    }));

    // pelvis facing up the screen, spine on the mid terminator. With no
    // parent its limits are measured from 0, so they are centred on its own
    // facing.
    let facing = -FRAC_PI_2;
    let pelvis = skeleton.add_connector(
        ConnectorConfig::new(ConnectorKind::Pelvis, 40.0, 30.0)
            .with_limits(JointLimits::new(facing - PI / 6.0, facing + PI / 6.0)),
        DVec2::new(200.0, 300.0),
        facing,
    )?;

    let spine = Chain::builder(DVec2::ZERO)
        .add_bone_with_limits(DVec2::new(30.0, 0.0), JointLimits::symmetric(0.4))
        .add_bone_with_limits(DVec2::new(60.0, 0.0), JointLimits::symmetric(0.4))
        .add_bone_with_limits(DVec2::new(90.0, 0.0), JointLimits::symmetric(0.4))
        .solver(IterativeSolver::default().with_max_cycles(6))
        .label("spine")
        .build(&mut skeleton)?;
    skeleton.link_terminator(pelvis, spine, Terminator::Mid, true)?;

    let left = leg(&mut skeleton, "left leg")?;
    let right = leg(&mut skeleton, "right leg")?;
    skeleton.link_terminator(pelvis, left, Terminator::Left, true)?;
    skeleton.link_terminator(pelvis, right, Terminator::Right, true)?;
    skeleton.drain_events();

    let head = DVec2::new(230.0, 200.0);
    let reached = skeleton.move_end_effector(spine, head, false)?;
    log::info!("spine toward {:?}: reached={}", head, reached);

    for (chain, foot) in [(left, DVec2::new(170.0, 410.0)), (right, DVec2::new(240.0, 400.0))] {
        let reached = skeleton.move_end_effector(chain, foot, false)?;
        let pose = skeleton[chain].last_solve();
        log::info!("{} toward {:?}: reached={} ({:?})", skeleton[chain].label(), foot, reached, pose);
    }

    if !skeleton.offset_orientation(pelvis, PI / 12.0)? {
        log::warn!("pelvis tilt refused by its limits");
    }
    skeleton.move_to(pelvis, DVec2::new(210.0, 290.0))?;
    skeleton.interact(spine, Interaction::Selected)?;

    let events = skeleton.drain_events();
    let renders = events
        .iter()
        .filter(|e| matches!(e, PoseEvent::Render(_)))
        .count();
    log::info!("{} events, {} redraws", events.len(), renders);

    let segments = skeleton.segments();
    let bytes: &[u8] = bytemuck::cast_slice(&segments);
    log::info!("{} segments, {} bytes ready for upload", segments.len(), bytes.len());
    for segment in &segments {
        println!(
            "{:>8.2} {:>8.2} -> {:>8.2} {:>8.2}",
            segment.start[0], segment.start[1], segment.end[0], segment.end[1]
        );
    }
    Ok(())
}
