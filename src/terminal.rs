//! Line-oriented front end: turns stdin lines into [`UiEvent`]s and prints
//! what changed between session snapshots.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::session::{PreferenceSlot, SessionController, SessionState, UiEvent};

pub const HELP: &str = "\
type a dish or some ingredients and press enter to get a recipe
  <enter> on an empty line   use the suggestion as your input
  :go                        generate from the current input
  :meal <type>               set the meal type (no value clears it)
  :flavor1 <tag>             set the first flavor
  :flavor2 <tag>             set the second flavor
  :prefs                     show preferences
  :clear                     clear the input and the recipe
  :quit                      leave";

#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    Events(Vec<UiEvent>),
    ShowPreferences,
    Help,
    Unknown(String),
}

fn preference(slot: PreferenceSlot, value: &str) -> LineAction {
    let value = value.trim();
    let value = if value.is_empty() { None } else { Some(value.to_string()) };
    LineAction::Events(vec![UiEvent::PreferenceChanged(slot, value)])
}

pub fn parse_line(line: &str) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Events(vec![UiEvent::AcceptPlaceholder]);
    }
    let Some(command) = line.strip_prefix(':') else {
        return LineAction::Events(vec![UiEvent::TextChanged(line.to_string()), UiEvent::Confirm]);
    };
    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "q" | "quit" => LineAction::Events(vec![UiEvent::Shutdown]),
        "go" => LineAction::Events(vec![UiEvent::Confirm]),
        "clear" => LineAction::Events(vec![UiEvent::TextChanged(String::new()), UiEvent::ClearRecipe]),
        "meal" => preference(PreferenceSlot::MealType, rest),
        "flavor1" => preference(PreferenceSlot::FlavorOne, rest),
        "flavor2" => preference(PreferenceSlot::FlavorTwo, rest),
        "prefs" => LineAction::ShowPreferences,
        "help" | "h" => LineAction::Help,
        other => LineAction::Unknown(other.to_string()),
    }
}

/// Lines to print for the transition from `before` to `after`.
pub fn render_changes(before: &SessionState, after: &SessionState) -> Vec<String> {
    let mut lines = Vec::new();
    if after.placeholder_text != before.placeholder_text && !after.placeholder_text.is_empty() {
        lines.push(format!("try: {}", after.placeholder_text));
    }
    if after.current_input != before.current_input && !after.current_input.is_empty() && after.current_input == after.placeholder_text {
        lines.push(format!("input: {}", after.current_input));
    }
    if after.is_generating && !before.is_generating {
        lines.push("cooking up a recipe...".to_string());
    }
    // A finished request is always reported, even when it produced the same
    // recipe or error as the one before it.
    let finished = before.is_generating && !after.is_generating;
    if let Some(recipe) = &after.recipe_output {
        if after.recipe_output != before.recipe_output || (finished && after.last_error.is_none()) {
            lines.push(String::new());
            lines.push(recipe.clone());
            lines.push(String::new());
        }
    }
    if let Some(error) = &after.last_error {
        if after.last_error != before.last_error || finished {
            lines.push(format!("error: {}", error));
        }
    }
    lines
}

pub fn describe_preferences(state: &SessionState) -> String {
    PreferenceSlot::ALL
        .iter()
        .map(|slot| format!("{}: {}", slot, state.preferences.get(*slot).unwrap_or("-")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs an interactive session on stdin/stdout until `:quit` or EOF.
pub async fn run_terminal(controller: SessionController) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel(32);
    let (snapshot_tx, mut snapshot_rx) = watch::channel(SessionState::default());
    let session = tokio::spawn(controller.run(event_rx, snapshot_tx));
    let latest = snapshot_rx.clone();

    let printer = {
        let mut previous = SessionState::default();
        tokio::spawn(async move {
            while snapshot_rx.changed().await.is_ok() {
                let current = snapshot_rx.borrow_and_update().clone();
                for line in render_changes(&previous, &current) {
                    println!("{}", line);
                }
                previous = current;
            }
        })
    };

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        match parse_line(&line) {
            LineAction::Events(events) => {
                let quitting = events.contains(&UiEvent::Shutdown);
                for event in events {
                    event_tx.send(event).await.context("Session stopped unexpectedly")?;
                }
                if quitting {
                    break;
                }
            }
            LineAction::ShowPreferences => println!("{}", describe_preferences(&latest.borrow())),
            LineAction::Help => println!("{}", HELP),
            LineAction::Unknown(name) => println!("unknown command :{} (try :help)", name),
        }
    }

    let _ = event_tx.send(UiEvent::Shutdown).await;
    drop(event_tx);
    session.await.context("Session task failed")?;
    printer.await.context("Renderer task failed")?;
    Ok(())
}
