//! Input and output tables.
//!
//! Both tables are created once from the configured address list and never
//! grow or shrink; only values change. Raw input values come from an
//! [`InputSource`], normally an [`InputPanel`] driven by press/release events.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// How a panel input reacts to press and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputType {
    /// Toggles on press and holds.
    #[default]
    Switch,
    /// Normally open: true while held.
    No,
    /// Normally closed: false while held.
    Nc,
}

impl InputType {
    pub const ALL: [InputType; 3] = [InputType::Switch, InputType::No, InputType::Nc];

    /// Value when nobody is touching the input.
    pub fn rest_value(self) -> bool {
        self == InputType::Nc
    }

    /// Next type in the SWITCH → NO → NC → SWITCH rotation.
    pub fn next(self) -> Self {
        match self {
            InputType::Switch => InputType::No,
            InputType::No => InputType::Nc,
            InputType::Nc => InputType::Switch,
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::Switch => "SWITCH",
            InputType::No => "NO",
            InputType::Nc => "NC",
        };
        f.pad(name)
    }
}

/// A fixed table of boolean I/O points keyed by address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoTable {
    values: IndexMap<String, bool>,
}

impl IoTable {
    /// Create a table with every address set to false.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: addresses.into_iter().map(|a| (a.into(), false)).collect(),
        }
    }

    pub fn get(&self, address: &str) -> Option<bool> {
        self.values.get(address).copied()
    }

    /// Write an existing point. Unknown addresses are rejected; the table
    /// never grows after construction.
    pub fn set(&mut self, address: &str, value: bool) -> Result<(), IoError> {
        match self.values.get_mut(address) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(IoError::UnknownPoint(address.to_string())),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.values.contains_key(address)
    }

    /// Set every point to false.
    pub fn clear(&mut self) {
        for value in self.values.values_mut() {
            *value = false;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Every point with mutable access to its value.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut bool)> {
        self.values.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Anything that can refresh the raw input table at the start of a scan.
pub trait InputSource {
    fn refresh(&mut self, inputs: &mut IoTable);
}

/// Keeps the input table as it is.
impl InputSource for () {
    fn refresh(&mut self, _inputs: &mut IoTable) {}
}

/// Operator panel: one push button per input, each with its own [`InputType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPanel {
    types: IndexMap<String, InputType>,
    values: IndexMap<String, bool>,
}

impl InputPanel {
    /// Create a panel for the given addresses, all of `default_type`.
    pub fn new<I, S>(addresses: I, default_type: InputType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types: IndexMap<String, InputType> = addresses
            .into_iter()
            .map(|a| (a.into(), default_type))
            .collect();
        let values = types
            .iter()
            .map(|(a, t)| (a.clone(), t.rest_value()))
            .collect();
        Self { types, values }
    }

    /// Button pressed.
    pub fn press(&mut self, address: &str) -> Result<(), IoError> {
        let input_type = self.input_type(address)?;
        let value = self.slot(address)?;
        *value = match input_type {
            InputType::Switch => !*value,
            InputType::No => true,
            InputType::Nc => false,
        };
        Ok(())
    }

    /// Button released. Switches keep their state.
    pub fn release(&mut self, address: &str) -> Result<(), IoError> {
        let input_type = self.input_type(address)?;
        let value = self.slot(address)?;
        match input_type {
            InputType::Switch => {}
            InputType::No => *value = false,
            InputType::Nc => *value = true,
        }
        Ok(())
    }

    /// Change an input's type; its value returns to the new type's rest state.
    pub fn set_type(&mut self, address: &str, input_type: InputType) -> Result<(), IoError> {
        let slot = self
            .types
            .get_mut(address)
            .ok_or_else(|| IoError::UnknownPoint(address.to_string()))?;
        *slot = input_type;
        *self.slot(address)? = input_type.rest_value();
        Ok(())
    }

    /// Rotate an input to the next type. Returns the new type.
    pub fn cycle_type(&mut self, address: &str) -> Result<InputType, IoError> {
        let next = self.input_type(address)?.next();
        self.set_type(address, next)?;
        Ok(next)
    }

    pub fn input_type(&self, address: &str) -> Result<InputType, IoError> {
        self.types
            .get(address)
            .copied()
            .ok_or_else(|| IoError::UnknownPoint(address.to_string()))
    }

    pub fn value(&self, address: &str) -> Option<bool> {
        self.values.get(address).copied()
    }

    /// Drive an input directly, bypassing press/release.
    pub fn force(&mut self, address: &str, value: bool) -> Result<(), IoError> {
        *self.slot(address)? = value;
        Ok(())
    }

    /// Return every input to its rest state.
    pub fn release_all(&mut self) {
        for (address, value) in self.values.iter_mut() {
            if let Some(t) = self.types.get(address) {
                *value = t.rest_value();
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, InputType, bool)> {
        self.types
            .iter()
            .map(|(a, t)| (a.as_str(), *t, self.values.get(a).copied().unwrap_or(false)))
    }

    fn slot(&mut self, address: &str) -> Result<&mut bool, IoError> {
        self.values
            .get_mut(address)
            .ok_or_else(|| IoError::UnknownPoint(address.to_string()))
    }
}

impl InputSource for InputPanel {
    fn refresh(&mut self, inputs: &mut IoTable) {
        for (address, value) in &self.values {
            if let Err(e) = inputs.set(address, *value) {
                warn!("input panel out of step with input table: {e}");
            }
        }
    }
}

/// Errors raised by the I/O tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("no I/O point at address {0}")]
    UnknownPoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> InputPanel {
        InputPanel::new(["I0.0", "I0.1"], InputType::Switch)
    }

    #[test]
    fn test_switch_toggles_and_holds() {
        let mut p = panel();
        p.press("I0.0").unwrap();
        p.release("I0.0").unwrap();
        assert_eq!(p.value("I0.0"), Some(true));
        p.press("I0.0").unwrap();
        assert_eq!(p.value("I0.0"), Some(false));
    }

    #[test]
    fn test_normally_open_follows_button() {
        let mut p = panel();
        p.set_type("I0.1", InputType::No).unwrap();
        assert_eq!(p.value("I0.1"), Some(false));
        p.press("I0.1").unwrap();
        assert_eq!(p.value("I0.1"), Some(true));
        p.release("I0.1").unwrap();
        assert_eq!(p.value("I0.1"), Some(false));
    }

    #[test]
    fn test_normally_closed_is_inverse() {
        let mut p = panel();
        p.set_type("I0.1", InputType::Nc).unwrap();
        assert_eq!(p.value("I0.1"), Some(true));
        p.press("I0.1").unwrap();
        assert_eq!(p.value("I0.1"), Some(false));
        p.release("I0.1").unwrap();
        assert_eq!(p.value("I0.1"), Some(true));
    }

    #[test]
    fn test_cycle_type_rotates() {
        let mut p = panel();
        assert_eq!(p.cycle_type("I0.0").unwrap(), InputType::No);
        assert_eq!(p.cycle_type("I0.0").unwrap(), InputType::Nc);
        assert_eq!(p.value("I0.0"), Some(true));
        assert_eq!(p.cycle_type("I0.0").unwrap(), InputType::Switch);
        assert_eq!(p.value("I0.0"), Some(false));
    }

    #[test]
    fn test_unknown_input() {
        let mut p = panel();
        assert_eq!(
            p.press("I7.7"),
            Err(IoError::UnknownPoint("I7.7".to_string()))
        );
    }

    #[test]
    fn test_refresh_copies_values() {
        let mut p = panel();
        let mut table = IoTable::new(["I0.0", "I0.1"]);
        p.force("I0.1", true).unwrap();
        p.refresh(&mut table);
        assert_eq!(table.get("I0.0"), Some(false));
        assert_eq!(table.get("I0.1"), Some(true));
    }

    #[test]
    fn test_refresh_skips_points_missing_from_table() {
        let mut p = InputPanel::new(["I0.0", "I0.5"], InputType::Switch);
        let mut table = IoTable::new(["I0.0", "I0.1"]);
        p.force("I0.0", true).unwrap();
        p.force("I0.5", true).unwrap();
        p.refresh(&mut table);
        assert_eq!(table.get("I0.0"), Some(true));
        assert_eq!(table.get("I0.1"), Some(false));
        assert!(!table.contains("I0.5"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_is_fixed() {
        let mut table = IoTable::new(["Q0.0"]);
        assert!(table.set("Q0.0", true).is_ok());
        assert!(table.set("Q9.9", true).is_err());
        assert_eq!(table.len(), 1);
        table.clear();
        assert_eq!(table.get("Q0.0"), Some(false));
    }
}
