//! Selector grammar
//!
//! Each selector entry is classified independently, first match wins:
//! - `+Name::` - every already-loaded package nested under `Name`
//! - `+Name`   - one already-loaded package, no load step
//! - `Name::`  - every loadable module nested under `Name`, each loaded
//! - `Name`    - one module, loaded
//!
//! Exclusions share the grammar; an entry ending in `::` excludes the prefix
//! itself and everything below it, a bare entry excludes one exact name.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::entity::{SEP, nested_under};
use crate::{Error, Result};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z0-9_]+)*$").expect("valid selector regex")
    })
}

/// Whether `name` is a well-formed package name (`Demo`, `Demo::Foo`)
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `+Name::`
    LoadedPrefix(String),
    /// `+Name`
    Loaded(String),
    /// `Name::`
    ModulePrefix(String),
    /// `Name`
    Module(String),
}

impl Selector {
    /// The bare name or prefix, without `+` or trailing `::`
    pub fn name(&self) -> &str {
        match self {
            Selector::LoadedPrefix(n)
            | Selector::Loaded(n)
            | Selector::ModulePrefix(n)
            | Selector::Module(n) => n,
        }
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self, Selector::LoadedPrefix(_) | Selector::ModulePrefix(_))
    }

    /// Whether candidates from this selector must be loaded before describing
    pub fn requires_load(&self) -> bool {
        matches!(self, Selector::ModulePrefix(_) | Selector::Module(_))
    }

    /// Whether `candidate` would be produced by this selector if it existed.
    pub fn covers(&self, candidate: &str) -> bool {
        if self.is_prefix() {
            nested_under(candidate, self.name())
        } else {
            candidate == self.name()
        }
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (loaded, rest) = match s.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (prefix, name) = match rest.strip_suffix(SEP) {
            Some(name) => (true, name),
            None => (false, rest),
        };
        if !is_valid_name(name) {
            return Err(Error::InvalidSelector(s.to_string()));
        }
        let name = name.to_string();
        Ok(match (loaded, prefix) {
            (true, true) => Selector::LoadedPrefix(name),
            (true, false) => Selector::Loaded(name),
            (false, true) => Selector::ModulePrefix(name),
            (false, false) => Selector::Module(name),
        })
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::LoadedPrefix(n) => write!(f, "+{}{}", n, SEP),
            Selector::Loaded(n) => write!(f, "+{}", n),
            Selector::ModulePrefix(n) => write!(f, "{}{}", n, SEP),
            Selector::Module(n) => write!(f, "{}", n),
        }
    }
}

/// Parse a list of selector strings, failing on the first invalid entry
pub fn parse_all<S: AsRef<str>>(entries: &[S]) -> Result<Vec<Selector>> {
    entries.iter().map(|e| e.as_ref().parse()).collect()
}

/// Exclusion rules, split into exact names and prefixes.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl ExclusionSet {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut set = Self::default();
        for selector in parse_all(entries)? {
            if selector.is_prefix() {
                set.prefixes.push(selector.name().to_string());
            } else {
                set.exact.insert(selector.name().to_string());
            }
        }
        Ok(set)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exact.contains(name)
            || self
                .prefixes
                .iter()
                .any(|p| name == p || nested_under(name, p))
    }
}
