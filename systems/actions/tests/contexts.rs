use creepline_core::{
    Action, ActionTag, Command, CreepKind, Event, GameInstanceId, PlayerActions, PlayerId, Tick,
    TowerKind,
};
use creepline_system_actions::{drain, ActionContext, ContextError, ContextStack, ContextState};
use creepline_world::{
    apply,
    physics::{AabbPhysics, PhysicsWorld},
    query, World,
};
use glam::Vec3;
use proptest::prelude::*;

struct Rig {
    world: World,
    physics: AabbPhysics,
    contexts: ContextStack,
    events: Vec<Event>,
}

impl Rig {
    fn client() -> Self {
        Self::with_bottom(ActionContext::default_play())
    }

    fn with_bottom(bottom: ActionContext) -> Self {
        Self {
            world: World::new(),
            physics: AabbPhysics::new(),
            contexts: ContextStack::new(bottom),
            events: Vec::new(),
        }
    }

    fn run(&mut self, tag: ActionTag, list: &[Action]) -> usize {
        let mut actions = PlayerActions::new(PlayerId::new(1), GameInstanceId::new(1), Tick::new(0));
        for action in list {
            assert!(actions.push(*action));
        }
        drain(
            tag,
            &mut actions,
            &mut self.contexts,
            &mut self.world,
            &mut self.physics,
            1.0 / 60.0,
            &mut self.events,
        )
        .expect("drain succeeds")
    }

    fn apply(&mut self, command: Command) {
        apply(&mut self.world, &mut self.physics, command, &mut self.events);
    }
}

#[test]
fn placement_round_trip_restores_the_default_context() {
    let mut rig = Rig::client();
    assert_eq!(rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]), 1);
    assert_eq!(rig.contexts.depth(), 2);
    assert_eq!(rig.contexts.front().state(), ContextState::Placement);
    let ghost = rig.contexts.front().ghost().expect("placement owns a ghost");
    assert!(query::ghost(&rig.world, ghost).is_some());

    let _ = rig.run(ActionTag::FrameTime, &[Action::exit_placement()]);
    assert_eq!(rig.contexts.depth(), 1);
    assert_eq!(rig.contexts.front().state(), ContextState::Default);
    assert!(query::ghost(&rig.world, ghost).is_none(), "cancel destroys the preview");
}

#[test]
fn successful_build_pops_placement() {
    let mut rig = Rig::client();
    let _ = rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]);
    let ghost = rig.contexts.front().ghost().expect("ghost");

    let _ = rig.run(
        ActionTag::FixedTime,
        &[Action::build_tower(TowerKind::Arrow, Vec3::new(10.0, 0.0, 18.0))],
    );
    assert_eq!(rig.contexts.depth(), 1);
    let towers = query::towers(&rig.world);
    assert_eq!(towers.len(), 1);
    assert_eq!(towers[0].id, ghost, "the preview becomes the tower");
}

#[test]
fn obstructed_preview_stays_in_placement() {
    let mut rig = Rig::client();
    rig.apply(Command::BuildTower {
        kind: TowerKind::Arrow,
        position: Vec3::new(10.0, 0.0, 18.0),
    });
    let _ = rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]);
    rig.apply(Command::StepPhysics { dt: 0.0 });
    let ghost = rig.contexts.front().ghost().expect("ghost");
    assert!(!query::ghost(&rig.world, ghost).expect("alive").can_build);

    let _ = rig.run(
        ActionTag::FixedTime,
        &[Action::build_tower(TowerKind::Arrow, Vec3::new(10.0, 0.0, 18.0))],
    );
    assert_eq!(rig.contexts.depth(), 2, "a red preview keeps the context");
    assert_eq!(query::towers(&rig.world).len(), 1);
}

#[test]
fn entering_placement_twice_keeps_one_preview() {
    let mut rig = Rig::client();
    let enter = Action::enter_placement(TowerKind::Arrow);
    let _ = rig.run(ActionTag::FrameTime, &[enter, enter]);
    assert_eq!(rig.contexts.depth(), 2);
    assert_eq!(query::ghost_count(&rig.world), 1);
}

#[test]
fn only_matching_tags_drain_and_only_once() {
    let mut rig = Rig::client();
    let mut actions = PlayerActions::new(PlayerId::new(1), GameInstanceId::new(1), Tick::new(4));
    assert!(actions.push(Action::send_wave(CreepKind::Simple)));
    assert!(actions.push(Action::enter_placement(TowerKind::Arrow)));

    let drained = drain(
        ActionTag::FixedTime,
        &mut actions,
        &mut rig.contexts,
        &mut rig.world,
        &mut rig.physics,
        1.0 / 60.0,
        &mut rig.events,
    )
    .expect("drain");
    assert_eq!(drained, 1);
    assert_eq!(query::creeps(&rig.world).len(), 2, "one creep per spawner");
    assert_eq!(rig.contexts.depth(), 1, "frame actions wait for the frame drain");
    assert!(actions.actions()[0].is_processed());
    assert!(!actions.actions()[1].is_processed());

    let again = drain(
        ActionTag::FixedTime,
        &mut actions,
        &mut rig.contexts,
        &mut rig.world,
        &mut rig.physics,
        1.0 / 60.0,
        &mut rig.events,
    )
    .expect("drain");
    assert_eq!(again, 0);
    assert_eq!(query::creeps(&rig.world).len(), 2, "processed actions never re-apply");
    assert_eq!(actions.len(), 2, "history is retained");
}

#[test]
fn server_builds_directly_and_rolls_back_on_overlap() {
    let mut rig = Rig::with_bottom(ActionContext::server());
    let build = Action::build_tower(TowerKind::Arrow, Vec3::new(4.5, 0.0, 4.5));
    let _ = rig.run(ActionTag::FixedTime, &[build, build]);

    assert_eq!(query::towers(&rig.world).len(), 1, "the overlapping build is rolled back");
    assert_eq!(rig.physics.body_count(), 1);
    assert_eq!(rig.contexts.depth(), 1);

    let _ = rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]);
    assert_eq!(rig.contexts.depth(), 1, "servers never preview");
    assert_eq!(query::ghost_count(&rig.world), 0);
}

#[test]
fn move_in_placement_steers_the_view() {
    let mut rig = Rig::client();
    let _ = rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]);
    let before = query::view(&rig.world).position();
    let _ = rig.run(
        ActionTag::FrameTime,
        &[Action::move_view(creepline_core::MoveDirection::Right)],
    );
    assert!(query::view(&rig.world).position().x > before.x);
}

#[test]
fn bottom_context_cannot_be_popped() {
    let mut stack = ContextStack::new(ActionContext::default_play());
    assert_eq!(stack.pop_front(), Err(ContextError::BottomContext));
    assert_eq!(stack.depth(), 1);
}

#[derive(Clone, Copy, Debug)]
enum Step {
    Enter,
    Exit,
    Build,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Enter), Just(Step::Exit), Just(Step::Build)]
}

proptest! {
    #[test]
    fn depth_tracks_placement_transitions(steps in prop::collection::vec(step_strategy(), 1..16)) {
        let mut rig = Rig::client();
        let mut x = 1.0_f32;

        for step in steps {
            let before = rig.contexts.depth();
            let placing = rig.contexts.front().state() == ContextState::Placement;
            match step {
                Step::Enter => {
                    let _ = rig.run(ActionTag::FrameTime, &[Action::enter_placement(TowerKind::Arrow)]);
                    let expected = if placing { before } else { before + 1 };
                    prop_assert_eq!(rig.contexts.depth(), expected);
                }
                Step::Exit => {
                    let _ = rig.run(ActionTag::FrameTime, &[Action::exit_placement()]);
                    let expected = if placing { before - 1 } else { before };
                    prop_assert_eq!(rig.contexts.depth(), expected);
                }
                Step::Build => {
                    if let Some(ghost) = rig.contexts.front().ghost() {
                        // Spread previews out so every commit finds free ground.
                        rig.apply(Command::MoveGhost { ghost, position: Vec3::new(x, 0.0, 1.0) });
                        x += 1.0;
                    }
                    let _ = rig.run(
                        ActionTag::FixedTime,
                        &[Action::build_tower(TowerKind::Arrow, Vec3::ZERO)],
                    );
                    let expected = if placing { before - 1 } else { before };
                    prop_assert_eq!(rig.contexts.depth(), expected);
                }
            }
            prop_assert!(rig.contexts.depth() >= 1);
        }
    }
}
