use creepline_core::{
    Action, ActionKind, ActionPayload, ActionTag, GameInstanceId, MoveDirection, PlayerActions,
    PlayerId, Tick, TowerKind,
};
use creepline_system_actions::{
    drain, follow_pointer, map_input, ActionContext, BindingTable, ButtonState, ContextStack,
    Input, InputSnapshot, Key, MouseButton, PointerRay,
};
use creepline_world::{physics::AabbPhysics, query, World};
use glam::Vec3;

fn frames(first: InputSnapshot, second: InputSnapshot) -> Input {
    let mut input = Input::new();
    input.advance(first);
    input.advance(second);
    input
}

fn pointer_at(x: f32, z: f32) -> PointerRay {
    PointerRay {
        origin: Vec3::new(x, 10.0, z),
        direction: Vec3::NEG_Y,
    }
}

fn evaluate(table: &BindingTable, input: &Input) -> Vec<Action> {
    let physics = AabbPhysics::new();
    let mut out = Vec::new();
    table.evaluate(input, &physics, &mut out);
    out
}

#[test]
fn held_keys_move_every_frame_after_the_first() {
    let table = BindingTable::defaults();
    let held = InputSnapshot::new().with_key(Key::W, ButtonState::Pressed);

    let first = frames(InputSnapshot::new(), held.clone());
    assert!(evaluate(&table, &first).is_empty(), "hold needs a previous press");

    let second = frames(held.clone(), held);
    assert_eq!(
        evaluate(&table, &second),
        vec![Action::move_view(MoveDirection::Front)]
    );
}

#[test]
fn press_once_bindings_fire_on_the_edge() {
    let table = BindingTable::defaults();
    let pressed = InputSnapshot::new().with_key(Key::C, ButtonState::Pressed);

    let edge = frames(
        InputSnapshot::new().with_key(Key::C, ButtonState::Released),
        pressed.clone(),
    );
    let actions = evaluate(&table, &edge);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind(), ActionKind::SendWave);

    let held = frames(pressed.clone(), pressed);
    assert!(evaluate(&table, &held).is_empty(), "holding does not resend");
}

#[test]
fn scroll_moves_the_view_vertically() {
    let table = BindingTable::defaults();
    let up = frames(InputSnapshot::new(), InputSnapshot::new().with_scroll(1.0));
    assert_eq!(evaluate(&table, &up), vec![Action::move_view(MoveDirection::Down)]);
    let down = frames(InputSnapshot::new(), InputSnapshot::new().with_scroll(-2.0));
    assert_eq!(evaluate(&table, &down), vec![Action::move_view(MoveDirection::Up)]);
    assert!(evaluate(&BindingTable::empty(), &up).is_empty());
}

#[test]
fn clicks_build_only_in_placement_and_on_the_map() {
    let click = |pointer: PointerRay| {
        frames(
            InputSnapshot::new(),
            InputSnapshot::new()
                .with_button(MouseButton::Left, ButtonState::Pressed)
                .with_pointer(pointer),
        )
    };

    assert!(evaluate(&BindingTable::defaults(), &click(pointer_at(4.0, 4.0))).is_empty());

    let placement = BindingTable::placement_defaults();
    let actions = evaluate(&placement, &click(pointer_at(4.0, 6.0)));
    assert_eq!(actions.len(), 1);
    assert_eq!(
        *actions[0].payload(),
        ActionPayload::BuildTower {
            tower: TowerKind::Arrow,
            position: Vec3::new(4.0, 0.0, 6.0),
        },
        "builds are stamped with the ground hit"
    );

    assert!(
        evaluate(&placement, &click(pointer_at(-3.0, 6.0))).is_empty(),
        "off-map clicks are dropped"
    );
}

#[test]
fn mapped_actions_land_in_the_current_list() {
    let physics = AabbPhysics::new();
    let contexts = ContextStack::new(ActionContext::default_play());
    let mut actions = PlayerActions::new(PlayerId::new(2), GameInstanceId::new(1), Tick::new(9));
    let input = frames(
        InputSnapshot::new(),
        InputSnapshot::new()
            .with_key(Key::B, ButtonState::Pressed)
            .with_key(Key::C, ButtonState::Pressed),
    );

    assert_eq!(map_input(&input, &contexts, &physics, &mut actions), 2);
    let kinds: Vec<_> = actions.actions().iter().map(Action::kind).collect();
    assert_eq!(kinds, vec![ActionKind::EnterPlacement, ActionKind::SendWave]);
}

#[test]
fn previews_follow_the_pointer() {
    let mut world = World::new();
    let mut physics = AabbPhysics::new();
    let mut contexts = ContextStack::new(ActionContext::default_play());
    let mut events = Vec::new();
    let mut actions = PlayerActions::new(PlayerId::new(2), GameInstanceId::new(1), Tick::new(0));
    assert!(actions.push(Action::enter_placement(TowerKind::Arrow)));
    let _ = drain(
        ActionTag::FrameTime,
        &mut actions,
        &mut contexts,
        &mut world,
        &mut physics,
        1.0 / 60.0,
        &mut events,
    )
    .expect("drain");
    let ghost = contexts.front().ghost().expect("ghost");

    let input = frames(
        InputSnapshot::new(),
        InputSnapshot::new().with_pointer(pointer_at(7.0, 3.0)),
    );
    follow_pointer(&input, &contexts, &mut world, &mut physics, &mut events);
    let preview = query::ghost(&world, ghost).expect("alive");
    assert_eq!(preview.position.x, 7.0);
    assert_eq!(preview.position.z, 3.0);
}
