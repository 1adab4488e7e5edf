use crate::location::Coordinates;
use crate::model::{SuggestionHistory, UserPreferences};

/// Coarse view of what the session is doing, derived from [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingSuggestion,
    Ready,
    Generating,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_input: String,
    pub placeholder_text: String,
    pub recipe_output: Option<String>,
    pub last_location: Option<Coordinates>,
    pub suggestion_history: SuggestionHistory,
    pub preferences: UserPreferences,
    pub is_generating: bool,
    pub suggestion_in_flight: bool,
    /// Failure of the last generation request, shown to the user.
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        if self.is_generating {
            Phase::Generating
        } else if self.suggestion_in_flight {
            Phase::AwaitingSuggestion
        } else if !self.placeholder_text.is_empty() || self.recipe_output.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    /// The placeholder refresh timer runs only while there is input.
    pub fn refresh_timer_active(&self) -> bool {
        !self.current_input.is_empty()
    }
}
