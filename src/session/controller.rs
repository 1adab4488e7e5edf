use chrono::{Local, NaiveDate};
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::state::SessionState;
use crate::model::{PreferenceSlot, SuggestionHistory};
use crate::api_connection::{CompletionError, CompletionService};
use crate::location::{Coordinates, GeolocationAdapter, PlaceDescriptor, PlaceResolver};
use crate::prompt_builder::{
    build_recipe_prompt, build_suggestion_prompt_for, SuggestionKind, CHEF_SYSTEM_ROLE, SUGGESTION_SYSTEM_ROLE,
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Longest refresh period the timer will use. Longer settings are capped.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Input from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    TextChanged(String),
    /// Generate a recipe from the current input.
    Confirm,
    /// Copy the placeholder into an empty input.
    AcceptPlaceholder,
    /// `None` clears the slot.
    PreferenceChanged(PreferenceSlot, Option<String>),
    ClearRecipe,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub refresh_interval: Duration,
    pub suggestion_kind: SuggestionKind,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            suggestion_kind: SuggestionKind::RecipeName,
        }
    }
}

#[derive(Clone)]
struct Services {
    completion: Arc<dyn CompletionService>,
    resolver: Arc<dyn PlaceResolver>,
    geolocation: GeolocationAdapter,
}

struct RefreshJob {
    acquire_location: bool,
    location: Option<Coordinates>,
    cached_place: Option<(Coordinates, PlaceDescriptor)>,
    history: SuggestionHistory,
    date: NaiveDate,
    kind: SuggestionKind,
}

struct RefreshOutcome {
    location: Option<Coordinates>,
    place: Option<(Coordinates, PlaceDescriptor)>,
    suggestion: Result<String, CompletionError>,
}

struct GenerationJob {
    prompt: String,
}

async fn execute_refresh(services: Services, job: RefreshJob) -> RefreshOutcome {
    let mut location = job.location;
    if job.acquire_location {
        match services.geolocation.acquire().await {
            Ok(coordinates) => location = Some(coordinates),
            Err(e) => info!(error = %e, "no location, suggesting without place context"),
        }
    }

    let place = match location {
        Some(coordinates) => match job.cached_place {
            Some((cached_at, place)) if cached_at == coordinates => Some((coordinates, place)),
            _ => Some((coordinates, services.resolver.resolve(coordinates).await)),
        },
        None => None,
    };

    let unknown = PlaceDescriptor::unknown();
    let descriptor = place.as_ref().map(|(_, place)| place).unwrap_or(&unknown);
    let prompt = build_suggestion_prompt_for(job.kind, descriptor, job.date, &job.history);
    let suggestion = services.completion.suggest(SUGGESTION_SYSTEM_ROLE, &prompt).await;

    RefreshOutcome {
        location,
        place,
        suggestion,
    }
}

async fn execute_generation(services: Services, job: GenerationJob) -> Result<String, CompletionError> {
    services.completion.complete(CHEF_SYSTEM_ROLE, &job.prompt).await
}

async fn join_running<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => pending().await,
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

/// Owns the [`SessionState`] and is its only writer.
///
/// Transitions can be driven one at a time through the async methods, or
/// from an event channel with [`run`](Self::run), which keeps handling
/// events while requests are outstanding.
pub struct SessionController {
    state: SessionState,
    services: Services,
    settings: ControllerSettings,
    place_cache: Option<(Coordinates, PlaceDescriptor)>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl SessionController {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        resolver: Arc<dyn PlaceResolver>,
        geolocation: GeolocationAdapter,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            state: SessionState::default(),
            services: Services {
                completion,
                resolver,
                geolocation,
            },
            settings,
            place_cache: None,
            today: local_today,
        }
    }

    /// Replaces the calendar used for seasonal context.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.current_input = text.into();
    }

    pub fn accept_placeholder(&mut self) {
        if self.state.current_input.is_empty() && !self.state.placeholder_text.is_empty() {
            self.state.current_input = self.state.placeholder_text.clone();
        }
    }

    pub fn set_preference(&mut self, slot: PreferenceSlot, value: Option<&str>) {
        match value {
            Some(value) => self.state.preferences.set(slot, value),
            None => self.state.preferences.clear(slot),
        }
    }

    pub fn clear_recipe(&mut self) {
        self.state.recipe_output = None;
        self.state.last_error = None;
    }

    /// Acquire a location and request the first placeholder.
    pub async fn mount(&mut self) {
        if let Some(job) = self.begin_refresh(true) {
            let outcome = execute_refresh(self.services.clone(), job).await;
            self.finish_refresh(outcome);
        }
    }

    /// Request a new placeholder using the last known location.
    /// Returns `false` if a refresh was already in flight.
    pub async fn refresh_placeholder(&mut self) -> bool {
        match self.begin_refresh(false) {
            Some(job) => {
                let outcome = execute_refresh(self.services.clone(), job).await;
                self.finish_refresh(outcome);
                true
            }
            None => false,
        }
    }

    /// Timer callback. Returns whether a request was sent.
    pub async fn on_refresh_tick(&mut self) -> bool {
        if !self.state.refresh_timer_active() {
            debug!("refresh tick ignored, input is empty");
            return false;
        }
        self.refresh_placeholder().await
    }

    /// Generate a recipe from the current input and preferences.
    /// Returns whether a request was sent.
    pub async fn confirm(&mut self) -> bool {
        match self.begin_generation() {
            Some(job) => {
                let result = execute_generation(self.services.clone(), job).await;
                self.finish_generation(result);
                true
            }
            None => false,
        }
    }

    fn begin_refresh(&mut self, acquire_location: bool) -> Option<RefreshJob> {
        if self.state.suggestion_in_flight {
            debug!("placeholder refresh still in flight, skipping");
            return None;
        }
        self.state.suggestion_in_flight = true;
        Some(RefreshJob {
            acquire_location,
            location: self.state.last_location,
            cached_place: self.place_cache.clone(),
            history: self.state.suggestion_history.clone(),
            date: (self.today)(),
            kind: self.settings.suggestion_kind,
        })
    }

    fn finish_refresh(&mut self, outcome: RefreshOutcome) {
        self.state.suggestion_in_flight = false;
        if let Some(location) = outcome.location {
            self.state.last_location = Some(location);
        }
        if let Some(place) = outcome.place {
            self.place_cache = Some(place);
        }
        match outcome.suggestion {
            Ok(text) => {
                debug!(placeholder = %text, "placeholder refreshed");
                self.state.suggestion_history = self.state.suggestion_history.with_entry(text.clone());
                self.state.placeholder_text = text;
            }
            // Keep the previous placeholder rather than showing an empty prompt.
            Err(e) => warn!(error = %e, "placeholder refresh failed"),
        }
    }

    fn begin_generation(&mut self) -> Option<GenerationJob> {
        if self.state.is_generating {
            debug!("generation already in flight");
            return None;
        }
        if self.state.current_input.trim().is_empty() {
            debug!("nothing to generate from");
            return None;
        }
        self.state.is_generating = true;
        self.state.last_error = None;
        Some(GenerationJob {
            prompt: build_recipe_prompt(&self.state.current_input, &self.state.preferences),
        })
    }

    fn finish_generation(&mut self, result: Result<String, CompletionError>) {
        self.state.is_generating = false;
        match result {
            Ok(recipe) => {
                info!(chars = recipe.len(), "recipe generated");
                self.state.recipe_output = Some(recipe);
            }
            Err(e) => {
                warn!(error = %e, "recipe generation failed");
                self.state.last_error = Some(format!("Could not generate a recipe: {}", e));
            }
        }
    }

    fn apply_local(&mut self, event: UiEvent) {
        match event {
            UiEvent::TextChanged(text) => self.set_input(text),
            UiEvent::AcceptPlaceholder => self.accept_placeholder(),
            UiEvent::PreferenceChanged(slot, value) => self.set_preference(slot, value.as_deref()),
            UiEvent::ClearRecipe => self.clear_recipe(),
            UiEvent::Confirm | UiEvent::Shutdown => {}
        }
    }

    fn sync_timer(&self, timer: &mut Option<Interval>) {
        match (self.state.refresh_timer_active(), timer.is_some()) {
            (true, false) => {
                let period = self
                    .settings
                    .refresh_interval
                    .clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL);
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                *timer = Some(interval);
                debug!(?period, "placeholder refresh timer started");
            }
            (false, true) => {
                *timer = None;
                debug!("placeholder refresh timer stopped");
            }
            _ => {}
        }
    }

    /// Drive the session from `events` until it sends
    /// [`UiEvent::Shutdown`] or closes. Every state change is published on
    /// `snapshots`. On exit the timer is dropped and outstanding requests
    /// are aborted.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>, snapshots: watch::Sender<SessionState>) {
        let mut refresh_task: Option<JoinHandle<RefreshOutcome>> = None;
        let mut generation_task: Option<JoinHandle<Result<String, CompletionError>>> = None;
        let mut timer: Option<Interval> = None;

        if let Some(job) = self.begin_refresh(true) {
            refresh_task = Some(tokio::spawn(execute_refresh(self.services.clone(), job)));
        }
        snapshots.send_replace(self.state.clone());

        loop {
            self.sync_timer(&mut timer);
            tokio::select! {
                event = events.recv() => match event {
                    None | Some(UiEvent::Shutdown) => break,
                    Some(UiEvent::Confirm) => {
                        if let Some(job) = self.begin_generation() {
                            generation_task = Some(tokio::spawn(execute_generation(self.services.clone(), job)));
                        }
                    }
                    Some(event) => self.apply_local(event),
                },
                joined = join_running(&mut refresh_task) => {
                    refresh_task = None;
                    match joined {
                        Ok(outcome) => self.finish_refresh(outcome),
                        Err(e) => {
                            error!(error = %e, "placeholder refresh task failed");
                            self.state.suggestion_in_flight = false;
                        }
                    }
                }
                joined = join_running(&mut generation_task) => {
                    generation_task = None;
                    match joined {
                        Ok(result) => self.finish_generation(result),
                        Err(e) => {
                            error!(error = %e, "recipe generation task failed");
                            self.state.is_generating = false;
                            self.state.last_error = Some("Could not generate a recipe".to_string());
                        }
                    }
                }
                _ = next_tick(&mut timer) => {
                    if self.state.refresh_timer_active() {
                        if let Some(job) = self.begin_refresh(false) {
                            refresh_task = Some(tokio::spawn(execute_refresh(self.services.clone(), job)));
                        }
                    }
                }
            }
            snapshots.send_replace(self.state.clone());
        }

        if let Some(task) = refresh_task {
            task.abort();
        }
        if let Some(task) = generation_task {
            task.abort();
        }
        info!("session ended");
    }
}
