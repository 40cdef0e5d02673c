//! Simulation mode and mode-conditional behaviour roles.

use std::fmt;

/// What the replay session is doing for its whole lifetime.
///
/// The mode is fixed when a session starts; there is no mid-session
/// switch. A new mode means a new session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SimulationMode {
    /// Neither recording nor replaying. Channel handles are not issued.
    #[default]
    Off,
    /// Capturing channel samples and events from the live simulation.
    Record,
    /// Reconstructing a previously recorded session.
    Playback,
}

impl SimulationMode {
    /// Whether the simulation computes its own state this session.
    ///
    /// True for [`Off`](Self::Off) and [`Record`](Self::Record): input,
    /// physics, and gameplay logic run normally. False during
    /// [`Playback`](Self::Playback), where state comes from the recording.
    pub fn drives_simulation(self) -> bool {
        !matches!(self, Self::Playback)
    }

    /// Whether samples and events are being captured.
    pub fn is_recording(self) -> bool {
        matches!(self, Self::Record)
    }

    /// Whether samples and events are being replayed.
    pub fn is_playback(self) -> bool {
        matches!(self, Self::Playback)
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Record => "record",
            Self::Playback => "playback",
        };
        f.write_str(name)
    }
}

/// When an optional per-entity sub-behaviour should exist.
///
/// Entities declare a role for each optional sub-behaviour (input capture,
/// replay-driven transform overrides, and so on) and construct it only if
/// the role is active in the session's [`SimulationMode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviourRole {
    /// Active in every mode.
    Always,
    /// Active whenever the simulation drives itself (Off or Record).
    Live,
    /// Active only while recording.
    RecordOnly,
    /// Active only while replaying.
    PlaybackOnly,
}

impl BehaviourRole {
    /// Whether a behaviour with this role should exist in `mode`.
    pub fn is_active(self, mode: SimulationMode) -> bool {
        match self {
            Self::Always => true,
            Self::Live => mode.drives_simulation(),
            Self::RecordOnly => mode.is_recording(),
            Self::PlaybackOnly => mode.is_playback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_off() {
        assert_eq!(SimulationMode::default(), SimulationMode::Off);
    }

    #[test]
    fn only_playback_stops_driving() {
        assert!(SimulationMode::Off.drives_simulation());
        assert!(SimulationMode::Record.drives_simulation());
        assert!(!SimulationMode::Playback.drives_simulation());
    }

    #[test]
    fn record_and_playback_roles_are_disjoint() {
        for mode in [
            SimulationMode::Off,
            SimulationMode::Record,
            SimulationMode::Playback,
        ] {
            assert!(
                !(BehaviourRole::RecordOnly.is_active(mode)
                    && BehaviourRole::PlaybackOnly.is_active(mode)),
                "both roles active in {mode}"
            );
        }
    }

    #[test]
    fn role_table() {
        use BehaviourRole::*;
        use SimulationMode::*;
        assert!(Always.is_active(Off));
        assert!(Live.is_active(Off));
        assert!(Live.is_active(Record));
        assert!(!Live.is_active(Playback));
        assert!(!RecordOnly.is_active(Off));
        assert!(RecordOnly.is_active(Record));
        assert!(!PlaybackOnly.is_active(Off));
        assert!(PlaybackOnly.is_active(Playback));
    }
}
