//! Model replacement index: maps prop models to their skybox counterparts

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

use crate::error::{Error, Result};

const BUILTIN_TABLE: &str = include_str!("../resources/builtin_modelreplace.json");

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntrySource {
    Builtin,
    User,
}

impl Display for EntrySource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySource::Builtin => write!(f, "built-in"),
            EntrySource::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    pub model: &'a str,
    pub replacement: &'a str,
    pub source: EntrySource,
}

/// Built-in entries shipped with the program, shadowed by the user's own entries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelReplacementTable {
    builtin: BTreeMap<String, String>,
    user: BTreeMap<String, String>,
}

impl ModelReplacementTable {
    pub fn new(builtin: BTreeMap<String, String>, user: BTreeMap<String, String>) -> ModelReplacementTable {
        for model in user.keys().filter(|model| builtin.contains_key(*model)) {
            log::info!("User replacement for {} overrides the built-in one", model);
        }
        ModelReplacementTable { builtin, user }
    }

    /// Table with the built-in index and the given user entries
    pub fn with_builtin(user: BTreeMap<String, String>) -> Result<ModelReplacementTable> {
        let builtin = serde_json::from_str(BUILTIN_TABLE)
            .map_err(|err| Error::Settings(format!("built-in model replacement index is invalid: {}", err)))?;
        Ok(ModelReplacementTable::new(builtin, user))
    }

    pub fn resolve(&self, model: &str) -> Option<&str> {
        self.user.get(model)
            .or_else(|| self.builtin.get(model))
            .map(String::as_str)
    }

    /// Adds a user entry; An existing mapping must be removed before it can be changed
    pub fn add(&mut self, model: &str, replacement: &str) -> Result<()> {
        if self.resolve(model).is_some() {
            return Err(Error::DuplicateKey(model.to_string()));
        }
        self.user.insert(model.to_string(), replacement.to_string());
        Ok(())
    }

    /// Removes a user entry, returning whether one existed. Built-in entries cannot be removed.
    pub fn remove(&mut self, model: &str) -> Result<bool> {
        if self.user.remove(model).is_some() {
            return Ok(true);
        }
        if self.builtin.contains_key(model) {
            return Err(Error::BuiltinImmutable(model.to_string()));
        }
        Ok(false)
    }

    /// Every effective entry, sorted by model
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let user = self.user.iter()
            .map(|(model, replacement)| Entry { model, replacement, source: EntrySource::User });
        let builtin = self.builtin.iter()
            .filter(|(model, _)| !self.user.contains_key(*model))
            .map(|(model, replacement)| Entry { model, replacement, source: EntrySource::Builtin });
        let mut entries: Vec<Entry> = user.chain(builtin).collect();
        entries.sort_by(|a, b| a.model.cmp(b.model));
        entries
    }

    pub fn len(&self) -> usize {
        self.user.len() + self.builtin.keys().filter(|model| !self.user.contains_key(*model)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn user_entries(&self) -> &BTreeMap<String, String> {
        &self.user
    }
}

/// Reads a flat `{ "model": "replacement" }` JSON file; A missing file is an empty table
pub fn load_user_table<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|err| Error::Settings(format!("{} is not a valid model replacement file: {}", path.display(), err))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(Error::Settings(format!("could not read {}: {}", path.display(), err))),
    }
}

pub fn save_user_table<P: AsRef<Path>>(path: P, table: &ModelReplacementTable) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(table.user_entries())?;
    std::fs::write(path, content)
        .map_err(|err| Error::Settings(format!("could not write {}: {}", path.display(), err)))
}
