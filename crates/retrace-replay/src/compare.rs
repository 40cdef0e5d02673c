//! Channel-by-channel comparison of two recordings.
//!
//! Used to check that a replayed run re-recorded the same data as the
//! original, or to locate where two runs first drift apart.

use std::fmt;

use retrace_core::EntityId;

use crate::store::SessionStore;

/// How one channel differs between two recordings.
#[derive(Clone, Debug, PartialEq)]
pub enum DivergenceKind {
    /// The channel exists only in the recorded store.
    MissingInReplay,
    /// The channel exists only in the replayed store.
    MissingInRecording,
    /// Both exist but decode differently.
    DescriptorMismatch,
    /// Keyframe counts differ (values up to the shorter length agree).
    LengthMismatch {
        /// Keyframes in the recorded store.
        recorded: usize,
        /// Keyframes in the replayed store.
        replayed: usize,
    },
    /// First keyframe component differing by more than the tolerance.
    ValueMismatch {
        /// Keyframe index.
        keyframe: usize,
        /// Component within the keyframe.
        component: usize,
        /// The recorded value.
        recorded: f32,
        /// The replayed value.
        replayed: f32,
    },
    /// Event channel bytes differ.
    EventMismatch,
}

/// A single channel-level divergence.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDivergence {
    /// Owning entity.
    pub entity: EntityId,
    /// Channel or event channel name.
    pub channel: String,
    /// What differs.
    pub kind: DivergenceKind,
}

impl fmt::Display for ChannelDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {} '{}': ", self.entity, self.channel)?;
        match &self.kind {
            DivergenceKind::MissingInReplay => write!(f, "missing in replay"),
            DivergenceKind::MissingInRecording => write!(f, "missing in recording"),
            DivergenceKind::DescriptorMismatch => write!(f, "descriptor mismatch"),
            DivergenceKind::LengthMismatch { recorded, replayed } => {
                write!(f, "{recorded} keyframes recorded, {replayed} replayed")
            }
            DivergenceKind::ValueMismatch {
                keyframe,
                component,
                recorded,
                replayed,
            } => write!(
                f,
                "keyframe {keyframe}[{component}]: recorded {recorded}, replayed {replayed}"
            ),
            DivergenceKind::EventMismatch => write!(f, "event records differ"),
        }
    }
}

/// Every divergence found, at most one per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivergenceReport {
    /// Divergences in entity, then channel, order.
    pub divergences: Vec<ChannelDivergence>,
}

impl DivergenceReport {
    /// Whether the recordings agree.
    pub fn is_empty(&self) -> bool {
        self.divergences.is_empty()
    }
}

/// Compare every channel and event channel of two stores.
///
/// Continuous channels are decoded keyframe by keyframe and values
/// compared with `tolerance`; event channels must match byte for byte.
pub fn compare_channels(
    recorded: &SessionStore,
    replayed: &SessionStore,
    tolerance: f32,
) -> DivergenceReport {
    let mut divergences = Vec::new();
    let mut push = |entity, channel: &str, kind| {
        divergences.push(ChannelDivergence {
            entity,
            channel: channel.to_owned(),
            kind,
        })
    };

    for entity in recorded.entity_ids() {
        let Some(rec) = recorded.entity(entity) else {
            continue;
        };
        for channel in rec.channels() {
            let Some(other) = replayed.try_get_channel(entity, channel.name()) else {
                push(entity, channel.name(), DivergenceKind::MissingInReplay);
                continue;
            };
            if !channel.descriptor().is_compatible_with(other.descriptor()) {
                push(entity, channel.name(), DivergenceKind::DescriptorMismatch);
                continue;
            }
            let a = channel.keyframes();
            let b = other.keyframes();
            let value_mismatch = a.iter().zip(&b).enumerate().find_map(|(keyframe, (x, y))| {
                x.iter()
                    .zip(y.iter())
                    .position(|(p, q)| (p - q).abs() > tolerance || p.is_nan() != q.is_nan())
                    .map(|component| DivergenceKind::ValueMismatch {
                        keyframe,
                        component,
                        recorded: x[component],
                        replayed: y[component],
                    })
            });
            if let Some(kind) = value_mismatch {
                push(entity, channel.name(), kind);
            } else if a.len() != b.len() {
                push(
                    entity,
                    channel.name(),
                    DivergenceKind::LengthMismatch {
                        recorded: a.len(),
                        replayed: b.len(),
                    },
                );
            }
        }
        for events in rec.event_channels() {
            match replayed.try_get_event_channel(entity, events.name()) {
                None => push(entity, events.name(), DivergenceKind::MissingInReplay),
                Some(other) if other.data() != events.data() => {
                    push(entity, events.name(), DivergenceKind::EventMismatch)
                }
                Some(_) => {}
            }
        }
    }

    for entity in replayed.entity_ids() {
        let Some(rep) = replayed.entity(entity) else {
            continue;
        };
        for channel in rep.channels() {
            if recorded.try_get_channel(entity, channel.name()).is_none() {
                push(entity, channel.name(), DivergenceKind::MissingInRecording);
            }
        }
        for events in rep.event_channels() {
            if recorded.try_get_event_channel(entity, events.name()).is_none() {
                push(entity, events.name(), DivergenceKind::MissingInRecording);
            }
        }
    }

    DivergenceReport { divergences }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::event::EventChannel;
    use retrace_core::{ChannelDescriptor, DataType, FrameId};

    fn store(values: &[f32], event_frame: u32) -> SessionStore {
        let mut store = SessionStore::new();
        let mut ch = Channel::for_recording(ChannelDescriptor::new("x", DataType::Float32, 1));
        for &v in values {
            ch.write(&[v]);
        }
        store.add_channel(EntityId(-1), ch);
        let mut ev = EventChannel::for_recording("e");
        ev.write(FrameId(event_frame), &());
        store.add_event_channel(EntityId(-1), ev);
        store
    }

    #[test]
    fn identical_stores_agree() {
        let report = compare_channels(&store(&[1.0, 2.0], 3), &store(&[1.0, 2.0], 3), 0.0);
        assert!(report.is_empty());
    }

    #[test]
    fn values_within_tolerance_agree() {
        let report = compare_channels(&store(&[1.0, 2.0], 3), &store(&[1.0, 2.001], 3), 0.01);
        assert!(report.is_empty());
    }

    #[test]
    fn first_value_mismatch_reported() {
        let report = compare_channels(&store(&[1.0, 2.0, 3.0], 3), &store(&[1.0, 5.0, 6.0], 3), 0.01);
        assert_eq!(report.divergences.len(), 1);
        assert_eq!(
            report.divergences[0].kind,
            DivergenceKind::ValueMismatch {
                keyframe: 1,
                component: 0,
                recorded: 2.0,
                replayed: 5.0
            }
        );
        assert_eq!(
            report.divergences[0].to_string(),
            "entity -1 'x': keyframe 1[0]: recorded 2, replayed 5"
        );
    }

    #[test]
    fn length_and_event_mismatch_reported() {
        let report = compare_channels(&store(&[1.0, 2.0], 3), &store(&[1.0], 4), 0.0);
        let kinds: Vec<_> = report.divergences.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                DivergenceKind::LengthMismatch {
                    recorded: 2,
                    replayed: 1
                },
                DivergenceKind::EventMismatch,
            ]
        );
    }

    #[test]
    fn missing_channels_reported_both_ways() {
        let mut extra = store(&[1.0], 3);
        extra.add_event_channel(EntityId(7), EventChannel::for_recording("late"));
        let report = compare_channels(&store(&[1.0], 3), &extra, 0.0);
        assert_eq!(report.divergences.len(), 1);
        assert_eq!(report.divergences[0].entity, EntityId(7));
        assert_eq!(report.divergences[0].kind, DivergenceKind::MissingInRecording);

        let report = compare_channels(&extra, &store(&[1.0], 3), 0.0);
        assert_eq!(report.divergences[0].kind, DivergenceKind::MissingInReplay);
    }
}
