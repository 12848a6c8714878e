//! Workout session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group-workout context the relay publishes metrics for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWorkout {
    /// Group workout ID shared by all participants
    pub workout_id: String,
    /// Display name
    pub name: String,
    /// Scheduled or actual start time
    pub started_at: DateTime<Utc>,
}

impl GroupWorkout {
    /// New group workout with a random ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            workout_id: format!("gw_{}", Uuid::new_v4().simple()),
            name: name.into(),
            started_at: Utc::now(),
        }
    }
}

/// Workout session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Created, not yet started
    NotStarted,
    /// Recording
    Running,
    /// Recording suspended
    Paused,
    /// Finished; terminal
    Ended,
}

impl SessionState {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::NotStarted, SessionState::Running)
                | (SessionState::Running, SessionState::Paused)
                | (SessionState::Paused, SessionState::Running)
                | (SessionState::Running, SessionState::Ended)
                | (SessionState::Paused, SessionState::Ended)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "NotStarted"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Paused => write!(f, "Paused"),
            SessionState::Ended => write!(f, "Ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = GroupWorkout::new("Morning run");
        let b = GroupWorkout::new("Morning run");
        assert_ne!(a.workout_id, b.workout_id);
        assert!(a.workout_id.starts_with("gw_"));
    }

    #[test]
    fn transitions() {
        use SessionState::*;
        assert!(NotStarted.can_transition_to(Running));
        assert!(Running.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Running));
        assert!(Paused.can_transition_to(Ended));
        assert!(!NotStarted.can_transition_to(Paused));
        assert!(!Ended.can_transition_to(Running));
        assert!(!Running.can_transition_to(Running));
    }
}
