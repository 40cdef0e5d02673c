//! Entity binding: stubs for missing data, re-registration and
//! mode-conditional behaviours.

use retrace_core::{BehaviourRole, ChannelDescriptor, DataType, EntityId, SimulationMode};
use retrace_replay::{ReplayConfig, ReplaySession, Replayable, ReplayableSpec};
use retrace_test_utils::{car_spec, position_descriptor, yaw_descriptor};

fn session() -> ReplaySession {
    ReplaySession::new(ReplayConfig::default()).unwrap()
}

/// Record `frames` samples of a ramp on the car's position channel only.
fn record_positions_only(s: &mut ReplaySession, car: EntityId, frames: u32) -> String {
    s.record();
    let spec = ReplayableSpec::new().with_channel(position_descriptor());
    let bound = Replayable::attach(s, car, &spec);
    for frame in 0..frames {
        s.write(bound.writer("position").unwrap(), &[frame as f32, 0.0, 0.0]);
        s.advance_frame();
    }
    bound.detach(s);
    s.serialize().unwrap()
}

// ── Missing data ────────────────────────────────────────────────

#[test]
fn missing_channels_fall_back_to_stubs() {
    let mut s = session();
    let car = s.register_static();
    let blob = record_positions_only(&mut s, car, 10);

    s.playback(&blob).unwrap();
    let bound = Replayable::attach(&mut s, car, &car_spec());
    let yaw = bound.reader("yaw").unwrap();
    let fire = bound.event_reader("fire").unwrap();
    assert!(yaw.is_stub());
    assert!(fire.is_stub());
    assert!(!bound.reader("position").unwrap().is_stub());

    for _ in 0..20 {
        assert!(s.read(yaw).is_none());
        assert!(!s.try_read_signal(fire));
        s.advance_frame();
    }
}

#[test]
fn entity_absent_from_recording_gets_stubs() {
    let mut s = session();
    let car = s.register_static();
    let blob = record_positions_only(&mut s, car, 3);

    s.playback(&blob).unwrap();
    let ghost = Replayable::attach(&mut s, EntityId(77), &car_spec());
    assert!(ghost.reader("position").unwrap().is_stub());
    assert!(s.read(ghost.reader("position").unwrap()).is_none());
}

#[test]
fn recorded_descriptor_wins_over_declared() {
    let mut s = session();
    let car = s.register_static();
    let blob = record_positions_only(&mut s, car, 4);

    s.playback(&blob).unwrap();
    s.attach_entity(car);
    let declared = ChannelDescriptor::new("position", DataType::Float32, 3);
    let r = s.open_reader(car, &declared);
    assert_eq!(s.read(&r).unwrap().as_slice(), &[0.0, 0.0, 0.0]);
    assert_eq!(s.read(&r).unwrap().as_slice(), &[1.0, 0.0, 0.0]);
}

#[test]
#[should_panic(expected = "channel 'position' was recorded with a different stride")]
fn declared_stride_must_match_recording() {
    let mut s = session();
    let car = s.register_static();
    let blob = record_positions_only(&mut s, car, 4);

    s.playback(&blob).unwrap();
    s.attach_entity(car);
    let declared = ChannelDescriptor::new("position", DataType::Float32, 2);
    s.open_reader(car, &declared);
}

// ── Re-registration ─────────────────────────────────────────────

#[test]
fn reattaching_within_a_recording_continues_the_channel() {
    let mut s = session();
    let car = s.register_static();
    let spec = ReplayableSpec::new().with_channel(position_descriptor());

    s.record();
    let first = Replayable::attach(&mut s, car, &spec);
    s.write(first.writer("position").unwrap(), &[1.0, 0.0, 0.0]);
    first.detach(&mut s);

    let second = Replayable::attach(&mut s, car, &spec);
    s.write(second.writer("position").unwrap(), &[2.0, 0.0, 0.0]);
    second.detach(&mut s);

    assert_eq!(s.metrics().channel_count, 1);
    let keys = s
        .store()
        .try_get_channel(car, "position")
        .unwrap()
        .keyframes();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[1][0], 2.0);
}

#[test]
#[should_panic(expected = "re-registered channel 'position' with a different descriptor")]
fn reattaching_with_a_different_descriptor_panics() {
    let mut s = session();
    let car = s.register_static();
    s.record();
    let first = Replayable::attach(
        &mut s,
        car,
        &ReplayableSpec::new().with_channel(position_descriptor()),
    );
    first.detach(&mut s);
    let other = ChannelDescriptor::new("position", DataType::Float32, 3);
    Replayable::attach(&mut s, car, &ReplayableSpec::new().with_channel(other));
}

#[test]
#[should_panic(expected = "already attached")]
fn attaching_a_live_entity_twice_panics() {
    let mut s = session();
    let car = s.register_static();
    s.record();
    let _first = Replayable::attach(&mut s, car, &car_spec());
    Replayable::attach(&mut s, car, &car_spec());
}

#[test]
fn static_ids_agree_between_record_and_playback() {
    let mut s = session();
    let a = s.register_static();
    let b = s.register_static();
    assert_eq!((a, b), (EntityId(-1), EntityId(-2)));

    s.record();
    let spec = ReplayableSpec::new().with_channel(yaw_descriptor());
    let ra = Replayable::attach(&mut s, a, &spec);
    let rb = Replayable::attach(&mut s, b, &spec);
    s.write(ra.writer("yaw").unwrap(), &[10.0]);
    s.write(rb.writer("yaw").unwrap(), &[-20.0]);
    let blob = s.serialize().unwrap();

    s.playback(&blob).unwrap();
    let pa = Replayable::attach(&mut s, a, &spec);
    let pb = Replayable::attach(&mut s, b, &spec);
    assert_eq!(s.read(pa.reader("yaw").unwrap()).unwrap()[0], 10.0);
    assert_eq!(s.read(pb.reader("yaw").unwrap()).unwrap()[0], -20.0);
}

// ── Mode-conditional behaviour ──────────────────────────────────

#[derive(Debug, PartialEq)]
enum Behaviour {
    InputCapture,
    TransformOverride,
    Physics,
}

fn behaviours(bound: &Replayable) -> Vec<Behaviour> {
    [
        bound.construct_if(BehaviourRole::RecordOnly, || Behaviour::InputCapture),
        bound.construct_if(BehaviourRole::PlaybackOnly, || Behaviour::TransformOverride),
        bound.construct_if(BehaviourRole::Live, || Behaviour::Physics),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[test]
fn behaviours_follow_the_session_mode() {
    let mut s = session();
    let car = s.register_static();

    let off = Replayable::attach(&mut s, car, &car_spec());
    assert_eq!(off.mode(), SimulationMode::Off);
    assert_eq!(behaviours(&off), vec![Behaviour::Physics]);
    off.detach(&mut s);

    s.record();
    let rec = Replayable::attach(&mut s, car, &car_spec());
    assert!(rec.should_record());
    assert!(rec.drives_simulation());
    assert_eq!(behaviours(&rec), vec![Behaviour::InputCapture, Behaviour::Physics]);
    rec.detach(&mut s);
    let blob = s.serialize().unwrap();

    s.playback(&blob).unwrap();
    let play = Replayable::attach(&mut s, car, &car_spec());
    assert!(play.should_playback());
    assert!(!play.should_record());
    assert!(!play.drives_simulation());
    assert_eq!(behaviours(&play), vec![Behaviour::TransformOverride]);
}
