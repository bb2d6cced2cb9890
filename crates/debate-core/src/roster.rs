use crate::errors::ValidationError;
use crate::provision::{MAX_PARTICIPANTS, RoomKind, RoomProvisioner, RoomSetupRequest};

/// Number of participant slots a fresh form starts with.
pub const DEFAULT_SLOTS: usize = 3;

/// Editable state of the room setup form.
///
/// The declared participant count and the roster are kept in lockstep:
/// resizing keeps every name at an index that still exists and only adds or
/// drops blank slots at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterForm {
    pub name: String,
    pub room_type: RoomKind,
    participants: Vec<String>,
}

impl RosterForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            room_type: RoomKind::default(),
            participants: vec![String::new(); DEFAULT_SLOTS],
        }
    }

    /// Start from a previously entered roster (e.g. restored settings).
    pub fn with_participants(participants: Vec<String>) -> Self {
        Self {
            participants,
            ..Self::new()
        }
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Grow or shrink to `count` slots, never past [`MAX_PARTICIPANTS`].
    pub fn resize(&mut self, count: usize) {
        self.participants.resize(count.min(MAX_PARTICIPANTS), String::new());
    }

    /// Apply raw text from the count field. Input that is not a number in
    /// `1..=MAX_PARTICIPANTS` leaves the roster untouched and returns `false`.
    pub fn set_count_input(&mut self, input: &str) -> bool {
        match input.trim().parse::<usize>() {
            Ok(count) if (1..=MAX_PARTICIPANTS).contains(&count) => {
                self.resize(count);
                true
            }
            _ => {
                tracing::debug!("ignoring participant count input {input:?}");
                false
            }
        }
    }

    /// Overwrite one slot. Out-of-range indices are ignored.
    pub fn set_participant(&mut self, index: usize, value: impl Into<String>) {
        if let Some(slot) = self.participants.get_mut(index) {
            *slot = value.into();
        }
    }

    pub fn submit(&self) -> Result<RoomSetupRequest, ValidationError> {
        RoomProvisioner::validate(&self.name, self.room_type, &self.participants)
    }
}

impl Default for RosterForm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(names: &[&str]) -> RosterForm {
        RosterForm::with_participants(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn starts_with_three_blank_slots() {
        let form = RosterForm::new();
        assert_eq!(form.count(), 3);
        assert!(form.participants().iter().all(String::is_empty));
    }

    #[test]
    fn growing_keeps_entries_and_appends_blanks() {
        let mut form = filled(&["Bob", "Carol"]);
        form.resize(4);
        assert_eq!(form.participants(), &["Bob", "Carol", "", ""]);
    }

    #[test]
    fn shrinking_drops_trailing_slots() {
        let mut form = filled(&["Bob", "Carol", "Dave"]);
        form.resize(1);
        assert_eq!(form.participants(), &["Bob"]);
        form.resize(3);
        assert_eq!(form.participants(), &["Bob", "", ""]);
    }

    #[test]
    fn count_input_must_be_numeric() {
        let mut form = filled(&["Bob", "Carol"]);
        assert!(!form.set_count_input("two"));
        assert_eq!(form.count(), 2);
        assert!(form.set_count_input(" 5 "));
        assert_eq!(form.count(), 5);
    }

    #[test]
    fn count_input_outside_roster_bounds_is_rejected() {
        let mut form = filled(&["Bob", "Carol"]);
        for input in ["0", "7", "18446744073709551615", "99999999999999999999999"] {
            assert!(!form.set_count_input(input), "accepted {input}");
            assert_eq!(form.participants(), &["Bob", "Carol"]);
        }
        assert!(form.set_count_input("6"));
        assert_eq!(form.count(), 6);
        assert!(form.set_count_input("1"));
        assert_eq!(form.participants(), &["Bob"]);
    }

    #[test]
    fn resize_stops_at_max_participants() {
        let mut form = filled(&["Bob"]);
        form.resize(usize::MAX);
        assert_eq!(form.count(), MAX_PARTICIPANTS);
        assert_eq!(form.participants()[0], "Bob");
    }

    #[test]
    fn set_participant_ignores_missing_slot() {
        let mut form = RosterForm::new();
        form.set_participant(1, "Carol");
        form.set_participant(9, "Nobody");
        assert_eq!(form.participants(), &["", "Carol", ""]);
    }

    #[test]
    fn submit_validates() {
        let mut form = filled(&["Bob", "", "Carol"]);
        assert_eq!(form.submit(), Err(ValidationError::EmptyName));

        form.name = "Alice".to_string();
        form.room_type = RoomKind::Debate;
        let request = form.submit().unwrap();
        assert_eq!(request.participant_names(), &["Bob", "Carol"]);
        assert_eq!(request.room_type(), RoomKind::Debate);
    }
}
