pub mod controller;
pub mod state;

pub use crate::model::{PreferenceSlot, SuggestionHistory, UserPreferences};
pub use controller::{ControllerSettings, SessionController, UiEvent, DEFAULT_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL};
pub use state::{Phase, SessionState};
