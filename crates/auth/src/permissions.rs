use std::collections::BTreeMap;

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A coarse permission domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Users,
    Attendance,
    Content,
}

/// An operation kind within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Edit,
    Delete,
}

/// A permission key that is not part of the closed module/action/role sets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownKey {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownKey {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl Module {
    pub const ALL: [Module; 3] = [Module::Users, Module::Attendance, Module::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Users => "users",
            Module::Attendance => "attendance",
            Module::Content => "content",
        }
    }
}

impl Action {
    pub const ALL: [Action; 3] = [Action::View, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownKey::new("module", s))
    }
}

impl FromStr for Action {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownKey::new("action", s))
    }
}

/// Grants for the actions of one module. Missing actions are denied.
pub type ActionGrants = BTreeMap<Action, bool>;

/// Module × action → granted.
///
/// Stored records may be partial (a module or an action missing); lookups
/// treat anything missing as denied. Unknown module/action keys fail to
/// deserialise instead of being silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<Module, ActionGrants>);

impl PermissionMatrix {
    /// A matrix with no entries at all (everything denied).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matrix assigned to a freshly synced staff account: every module
    /// present, view granted, edit and delete denied.
    pub fn staff_default() -> Self {
        let mut matrix = Self::empty();
        for module in Module::ALL {
            matrix.set(module, Action::View, true);
            matrix.set(module, Action::Edit, false);
            matrix.set(module, Action::Delete, false);
        }
        matrix
    }

    /// Explicit grant for a pair, if the pair is present at all.
    pub fn get(&self, module: Module, action: Action) -> Option<bool> {
        self.0.get(&module)?.get(&action).copied()
    }

    pub fn grants(&self, module: Module, action: Action) -> bool {
        self.get(module, action) == Some(true)
    }

    pub fn set(&mut self, module: Module, action: Action, granted: bool) {
        self.0.entry(module).or_default().insert(action, granted);
    }

    pub fn with(mut self, module: Module, action: Action, granted: bool) -> Self {
        self.set(module, action, granted);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Module, Action, bool)> + '_ {
        self.0
            .iter()
            .flat_map(|(m, grants)| grants.iter().map(move |(a, g)| (*m, *a, *g)))
    }
}
