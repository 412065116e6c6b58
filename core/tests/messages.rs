use creepline_archive::{from_bytes, to_bytes, ArchiveError};
use creepline_core::{
    Action, BodyRecord, BodyType, CreepKind, EntityId, EntityKind, EntityRecord, GameInstanceId,
    Health, MoveDirection, NewGameRequest, NewGameResponse, PlayerActions, PlayerId, Request,
    Response, Snapshot, StateSync, Tick, TowerKind, Transform, BUILD_COORDINATE_LIMIT, MAX_TICK,
};
use glam::{Quat, Vec3};

fn busy_tick() -> PlayerActions {
    let mut actions = PlayerActions::new(PlayerId::new(7), GameInstanceId::new(u64::MAX), Tick::new(MAX_TICK));
    assert!(actions.push(Action::send_wave(CreepKind::Simple)));
    assert!(actions.push(Action::build_tower(
        TowerKind::Arrow,
        Vec3::new(0.0, BUILD_COORDINATE_LIMIT, 12.5)
    )));
    assert!(actions.push(Action::move_view(MoveDirection::Down)));
    assert!(actions.push(Action::enter_placement(TowerKind::Arrow)));
    assert!(actions.push(Action::exit_placement()));
    actions
}

#[test]
fn requests_round_trip_at_field_extremes() {
    let requests = [
        Request::NewGame(NewGameRequest {
            player: PlayerId::new(u32::MAX),
        }),
        Request::PlayerActions(busy_tick()),
        Request::PlayerActions(PlayerActions::default()),
    ];

    for request in requests {
        let bytes = to_bytes(&request);
        assert_eq!(from_bytes::<Request>(&bytes), Ok(request.clone()), "{request:?}");
    }
}

#[test]
fn responses_round_trip() {
    let responses = [
        Response::Connected {
            player: PlayerId::new(3),
        },
        Response::NewGame(NewGameResponse {
            game: GameInstanceId::new(42),
        }),
        Response::StateSync(StateSync {
            game: GameInstanceId::new(1),
            tick: Tick::new(0),
            snapshot: Vec::new(),
        }),
        Response::StateSync(StateSync {
            game: GameInstanceId::new(1),
            tick: Tick::new(900),
            snapshot: vec![1, 2, 3, 4],
        }),
    ];

    for response in responses {
        let bytes = to_bytes(&response);
        assert_eq!(from_bytes::<Response>(&bytes), Ok(response.clone()), "{response:?}");
    }
}

#[test]
fn truncated_player_actions_never_decode() {
    let bytes = to_bytes(&Request::PlayerActions(busy_tick()));
    for cut in 0..bytes.len() {
        let result = from_bytes::<Request>(&bytes[..cut]);
        assert!(
            matches!(result, Err(ArchiveError::Truncated { .. })),
            "cut at {cut} produced {result:?}"
        );
    }
}

#[test]
fn unknown_request_discriminant_is_rejected() {
    assert_eq!(
        from_bytes::<Request>(&[9]),
        Err(ArchiveError::InvalidDiscriminant {
            type_name: "Request",
            value: 9
        })
    );
}

#[test]
fn tick_past_the_limit_is_rejected() {
    let bytes = to_bytes(&Tick::new(MAX_TICK + 1));
    assert_eq!(
        from_bytes::<Tick>(&bytes),
        Err(ArchiveError::OutOfRange { field: "tick" })
    );
}

#[test]
fn snapshot_records_keep_every_field() {
    let snapshot = Snapshot {
        tick: Tick::new(120),
        entities: vec![
            EntityRecord {
                entity: EntityId::new(1),
                kind: EntityKind::Creep(CreepKind::Simple),
                transform: Transform {
                    position: Vec3::new(2.0, 0.35, 2.5),
                    orientation: Quat::from_rotation_y(0.5),
                    scale: Vec3::splat(0.5),
                },
                body: Some(BodyRecord {
                    body_type: BodyType::Kinematic,
                    position: Vec3::new(2.0, 0.35, 2.5),
                    velocity: Vec3::new(1.5, 0.0, 0.0),
                }),
                health: Some(Health::new(0)),
            },
            EntityRecord {
                entity: EntityId::new(2),
                kind: EntityKind::Tower(TowerKind::Arrow),
                transform: Transform::from_position(Vec3::new(5.0, 0.65, 5.0)),
                body: None,
                health: Some(Health::FULL),
            },
        ],
    };

    let bytes = to_bytes(&snapshot);
    assert_eq!(from_bytes::<Snapshot>(&bytes), Ok(snapshot));
}

#[test]
fn empty_snapshot_round_trips() {
    let snapshot = Snapshot::default();
    assert_eq!(from_bytes::<Snapshot>(&to_bytes(&snapshot)), Ok(snapshot));
}
