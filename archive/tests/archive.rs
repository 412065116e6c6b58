use creepline_archive::{
    from_bytes, to_bytes, Archive, ArchiveError, InputArchive, OutputArchive,
};
use glam::{Quat, Vec3};
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Probe {
    tick: u32,
    scale: f32,
    weights: Vec<u16>,
    anchor: Option<Vec3>,
    armed: bool,
}

impl Archive for Probe {
    fn serialize(&self, output: &mut OutputArchive) {
        output.put(&self.tick);
        output.put(&self.scale);
        output.write_sequence(&self.weights);
        output.put(&self.anchor);
        output.put(&self.armed);
    }

    fn deserialize(input: &mut InputArchive<'_>) -> Result<Self, ArchiveError> {
        Ok(Self {
            tick: input.read_bounded("tick", 0, 30_000_000)?,
            scale: input.take()?,
            weights: input.read_sequence(8)?,
            anchor: input.take()?,
            armed: input.take()?,
        })
    }
}

fn probe() -> impl Strategy<Value = Probe> {
    (
        0_u32..=30_000_000,
        -1.0e6_f32..1.0e6,
        prop::collection::vec(any::<u16>(), 0..=8),
        prop::option::of((-50.0_f32..50.0, -50.0_f32..50.0, -50.0_f32..50.0)),
        any::<bool>(),
    )
        .prop_map(|(tick, scale, weights, anchor, armed)| Probe {
            tick,
            scale,
            weights,
            anchor: anchor.map(|(x, y, z)| Vec3::new(x, y, z)),
            armed,
        })
}

proptest! {
    #[test]
    fn probe_survives_round_trip(value in probe()) {
        let bytes = to_bytes(&value);
        prop_assert_eq!(from_bytes::<Probe>(&bytes), Ok(value));
    }

    #[test]
    fn every_truncation_is_rejected(value in probe()) {
        let bytes = to_bytes(&value);
        for cut in 0..bytes.len() {
            let result = from_bytes::<Probe>(&bytes[..cut]);
            prop_assert!(
                matches!(result, Err(ArchiveError::Truncated { .. })),
                "truncation at {} of {} decoded as {:?}",
                cut,
                bytes.len(),
                result
            );
        }
    }
}

#[test]
fn bounded_extremes_round_trip() {
    for tick in [0, 30_000_000] {
        let value = Probe {
            tick,
            scale: f32::MAX,
            weights: Vec::new(),
            anchor: None,
            armed: false,
        };
        let bytes = to_bytes(&value);
        assert_eq!(from_bytes::<Probe>(&bytes), Ok(value), "tick {tick} must survive");
    }
}

#[test]
fn bounded_field_rejects_values_past_the_limit() {
    let value = Probe {
        tick: 30_000_001,
        scale: 1.0,
        weights: vec![1],
        anchor: None,
        armed: true,
    };
    let bytes = to_bytes(&value);
    assert_eq!(
        from_bytes::<Probe>(&bytes),
        Err(ArchiveError::OutOfRange { field: "tick" })
    );
}

#[test]
fn oversized_sequence_is_rejected_before_allocation() {
    let mut output = OutputArchive::new();
    output.put(&7_u32);
    output.put(&0.5_f32);
    output.write_len(9);
    let bytes = output.into_bytes();

    assert_eq!(
        from_bytes::<Probe>(&bytes),
        Err(ArchiveError::SequenceTooLong { len: 9, max: 8 })
    );
}

#[test]
fn malformed_bool_and_option_flags_are_rejected() {
    assert_eq!(from_bytes::<bool>(&[2]), Err(ArchiveError::InvalidBool(2)));
    assert_eq!(
        from_bytes::<Option<u8>>(&[5, 0]),
        Err(ArchiveError::InvalidDiscriminant {
            type_name: "Option",
            value: 5
        })
    );
}

#[test]
fn trailing_bytes_are_reported() {
    assert_eq!(
        from_bytes::<u16>(&[1, 0, 9]),
        Err(ArchiveError::TrailingBytes(1))
    );
}

#[test]
fn quaternion_keeps_component_order() {
    let rotation = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
    let bytes = to_bytes(&rotation);
    assert_eq!(bytes.len(), 16, "quaternion encodes four f32 components");
    assert_eq!(from_bytes::<Quat>(&bytes), Ok(rotation));
}

#[test]
fn bulk_read_copies_contiguous_values() {
    let mut output = OutputArchive::with_capacity(12);
    output.write(&[1.5_f32, -2.0, 8.25]);
    let bytes = output.into_bytes();

    let mut input = InputArchive::new(&bytes);
    let mut values = [0.0_f32; 3];
    input.read(&mut values).expect("three floats fit exactly");
    assert_eq!(values, [1.5, -2.0, 8.25]);
    assert_eq!(input.remaining(), 0);
    assert!(input.finish().is_ok());
}
