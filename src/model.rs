//! Values the user builds up over a session: past suggestions and
//! free-form cooking preferences.

use std::collections::BTreeMap;
use std::fmt;

/// Placeholder values suggested so far this session, oldest first.
///
/// Updates produce a new value; nothing outside the controller holds a
/// mutable handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionHistory(Vec<String>);

impl SuggestionHistory {
    pub fn with_entry(&self, entry: impl Into<String>) -> Self {
        let mut entries = self.0.clone();
        entries.push(entry.into());
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreferenceSlot {
    MealType,
    FlavorOne,
    FlavorTwo,
}

impl PreferenceSlot {
    pub const ALL: [PreferenceSlot; 3] = [PreferenceSlot::MealType, PreferenceSlot::FlavorOne, PreferenceSlot::FlavorTwo];
}

impl fmt::Display for PreferenceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreferenceSlot::MealType => "meal",
            PreferenceSlot::FlavorOne => "flavor1",
            PreferenceSlot::FlavorTwo => "flavor2",
        };
        f.write_str(name)
    }
}

/// Free-form values per preference slot. Blank values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPreferences(BTreeMap<PreferenceSlot, String>);

impl UserPreferences {
    /// Sets a slot; a blank value clears it.
    pub fn set(&mut self, slot: PreferenceSlot, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if value.is_empty() {
            self.0.remove(&slot);
        } else {
            self.0.insert(slot, value.to_string());
        }
    }

    pub fn clear(&mut self, slot: PreferenceSlot) {
        self.0.remove(&slot);
    }

    pub fn get(&self, slot: PreferenceSlot) -> Option<&str> {
        self.0.get(&slot).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
