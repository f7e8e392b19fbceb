//! INI-like configuration sections.
//!
//! Used for the optional defaults file read at configuration time and for the
//! resolved option dump embedded in the run script. Values written by this crate
//! are JSON literals so that the downstream engine can recover exact types.

use std::fmt::Write as _;
use std::fs::read_to_string;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigureError;

/// Ordered key/value pairs of one `[section]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), entries: Vec::new() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Sets a key, replacing an existing entry in place.
    pub fn set(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Builds a section from any value serializing to a flat JSON object.
    /// Keys keep the order of the serialized object, values are JSON literals.
    pub fn from_serializable<T: Serialize>(name: &str, value: &T) -> Result<Self, ConfigureError> {
        let object = match serde_json::to_value(value)? {
            Value::Object(object) => object,
            other => return Err(ConfigureError::InvalidConfigValue(name.to_string(), format!("expected an object, got {}", other))),
        };
        let mut section = Self::new(name);
        for (key, value) in object {
            section.entries.push((key, serde_json::to_string(&value)?));
        }
        Ok(section)
    }

    /// Inverse of [`IniSection::from_serializable`].
    pub fn to_deserializable<T: DeserializeOwned>(&self) -> Result<T, ConfigureError> {
        let mut object = Map::new();
        for (key, raw) in &self.entries {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| ConfigureError::InvalidConfigValue(key.clone(), e.to_string()))?;
            object.insert(key.clone(), value);
        }
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    /// Interprets a hand-written value: JSON literals are honoured, anything else is a plain string.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
    }
}

/// A full INI document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IniSections {
    pub sections: Vec<IniSection>,
}

impl IniSections {
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Inserts a section, replacing any existing section of the same name.
    pub fn insert(&mut self, section: IniSection) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigureError> {
        Self::parse(&read_to_string(path)?, path)
    }

    /// Parses `[section]` headers and `key = value` lines; `#` and `;` start comments.
    pub fn parse(text: &str, source: &Path) -> Result<Self, ConfigureError> {
        let mut doc = Self::default();
        let mut current: Option<IniSection> = None;

        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| {
                    ConfigureError::MalformedConfig(source.to_path_buf(), i + 1, format!("unterminated section header '{}'", line))
                })?;
                if let Some(section) = current.take() {
                    doc.insert(section);
                }
                current = Some(IniSection::new(name.trim()));
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ConfigureError::MalformedConfig(source.to_path_buf(), i + 1, format!("expected 'key = value', got '{}'", line))
            })?;
            let section = current.as_mut().ok_or_else(|| {
                ConfigureError::MalformedConfig(source.to_path_buf(), i + 1, "option outside of any section".to_string())
            })?;
            section.set(key.trim(), value.trim().to_string());
        }
        if let Some(section) = current {
            doc.insert(section);
        }
        Ok(doc)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.entries {
                let _ = writeln!(out, "{} = {}", key, value);
            }
        }
        out
    }
}
