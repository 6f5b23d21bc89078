//! Macro maps and `$(NAME)` substitution.

#![allow(missing_docs)]

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::DisplayError;

/// Upper bound on re-scan passes, guards against self-referencing macros.
const MAX_RECURSION: usize = 20;
/// Upper bound on substitutions for one text across all passes.
const MAX_SUBSTITUTIONS: usize = 1000;
/// No substitution may grow the text beyond this many bytes.
const MAX_RESOLVED_LEN: usize = 64 * 1024;

/// Ordered name to value map used for macro substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Macros {
    entries: IndexMap<SmolStr, String>,
}

impl Macros {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from name/value pairs, rejecting invalid names.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, DisplayError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut macros = Self::new();
        for (name, value) in pairs {
            macros.add(name.as_ref(), value)?;
        }
        Ok(macros)
    }

    /// Add or replace a macro. Replacing keeps the original position.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> Result<(), DisplayError> {
        if !is_valid_name(name) {
            return Err(DisplayError::InvalidMacroName(name.into()));
        }
        self.entries.insert(SmolStr::new(name), value.into());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(SmolStr::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge two maps: every `overlay` entry in its order, followed by the
    /// `base` entries whose names the overlay does not define.
    #[must_use]
    pub fn merge(base: &Macros, overlay: &Macros) -> Macros {
        let mut entries = overlay.entries.clone();
        for (name, value) in &base.entries {
            if !entries.contains_key(name) {
                entries.insert(name.clone(), value.clone());
            }
        }
        Macros { entries }
    }

    /// Replace macro references in `text` with values from this map.
    #[must_use]
    pub fn resolve(&self, text: &str) -> String {
        resolve_macros(self, text)
    }
}

impl fmt::Display for Macros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, (name, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("]")
    }
}

/// Source of macro values.
pub trait MacroValueProvider {
    fn macro_value(&self, name: &str) -> Option<String>;
}

impl MacroValueProvider for Macros {
    fn macro_value(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }
}

/// Consult providers in order until one knows the name.
impl<A: MacroValueProvider, B: MacroValueProvider> MacroValueProvider for (A, B) {
    fn macro_value(&self, name: &str) -> Option<String> {
        self.0.macro_value(name).or_else(|| self.1.macro_value(name))
    }
}

/// Substitute `$(NAME)` and `${NAME}` references.
///
/// Substituted text is scanned again so values may refer to further macros,
/// and a reference may build its name from another reference as in
/// `$(DEV_$(N))`. Unknown names stay in the output as written. Expansion
/// stops after a fixed number of substitutions or once the text would grow
/// past a size limit; references not yet expanded are then kept literally.
pub fn resolve_macros(provider: &dyn MacroValueProvider, text: &str) -> String {
    let mut budget = Budget {
        substitutions: MAX_SUBSTITUTIONS,
        exhausted: false,
    };
    let mut current = text.to_string();
    let mut settled = false;
    for _ in 0..MAX_RECURSION {
        match substitute_once(provider, &current, &mut budget) {
            Some(next) => current = next,
            None => {
                settled = true;
                break;
            }
        }
    }
    if budget.exhausted {
        warn!(
            "macro expansion of '{text}' stopped after {} substitution(s), {} byte(s); remaining references kept",
            MAX_SUBSTITUTIONS - budget.substitutions,
            current.len()
        );
    } else if !settled {
        debug!("macro recursion limit reached while resolving '{text}'");
    }
    current
}

/// Work left for one [`resolve_macros`] call.
struct Budget {
    substitutions: usize,
    exhausted: bool,
}

impl Budget {
    /// Take one substitution that leaves the text `len` bytes long.
    fn take(&mut self, len: usize) -> bool {
        if self.exhausted || self.substitutions == 0 || len > MAX_RESOLVED_LEN {
            self.exhausted = true;
            return false;
        }
        self.substitutions -= 1;
        true
    }
}

/// `true` if the text contains anything that looks like a macro reference.
#[must_use]
pub fn contains_macros(text: &str) -> bool {
    find_reference(text).is_some()
}

fn substitute_once(provider: &dyn MacroValueProvider, text: &str, budget: &mut Budget) -> Option<String> {
    let mut output = String::with_capacity(text.len());
    let mut changed = false;
    let mut rest = text;
    while let Some(start) = find_reference(rest) {
        let open = rest.as_bytes()[start + 1];
        let close = if open == b'(' { b')' } else { b'}' };
        let body = &rest[start + 2..];
        let Some(end) = matching_close(body, open, close) else {
            break;
        };
        let name = &body[..end];
        let reference = &rest[start..start + 2 + end + 1];
        let after = &body[end + 1..];
        output.push_str(&rest[..start]);
        if let Some(inner) = contains_macros(name)
            .then(|| substitute_once(provider, name, budget))
            .flatten()
        {
            output.push('$');
            output.push(char::from(open));
            output.push_str(&inner);
            output.push(char::from(close));
            changed = true;
        } else if let Some(value) = lookup(provider, name)
            .filter(|value| budget.take(output.len() + value.len() + after.len()))
        {
            output.push_str(&value);
            changed = true;
        } else {
            output.push_str(reference);
        }
        rest = after;
    }
    output.push_str(rest);
    changed.then_some(output)
}

fn lookup(provider: &dyn MacroValueProvider, name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    provider.macro_value(name)
}

fn find_reference(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('$') {
        let index = offset + pos;
        match bytes.get(index + 1) {
            Some(b'(' | b'{') => return Some(index),
            Some(_) => offset = index + 1,
            None => return None,
        }
    }
    None
}

fn matching_close(body: &str, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in body.bytes().enumerate() {
        if byte == open {
            depth += 1;
        } else if byte == close {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        }
    }
    None
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
