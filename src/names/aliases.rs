use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use super::CanonicalKey;
use super::normalize::{normalize_name, normalize_value};
use crate::error::{MapError, Result};

/// Spellings that differ from the canonical province key.
///
/// Keys are normalized when the table is built, so accented or upper-case
/// entries still match normalized input.
static DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("castellon", "castellon"),
    ("castellon/castello", "castellon"),
    ("castello", "castellon"),
    ("alicante", "alicante"),
    ("alacant", "alicante"),
    ("alicante/alacant", "alicante"),
    ("araba", "alava"),
    ("araba/alava", "alava"),
    ("Araba/Álava", "alava"),
    ("Vitoria", "alava"),
    ("Álava", "alava"),
];

/// Equivalence table mapping normalized name variants to canonical keys.
///
/// Extra entries can be loaded from a JSON object on disk:
/// ```json
/// {
///   "Valencia/València": "valencia",
///   "Illes Balears": "baleares"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProvinceAliases {
    entries: HashMap<String, String>,
}

impl Default for ProvinceAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        aliases.extend(DEFAULT_ALIASES.iter().copied());
        aliases
    }
}

impl ProvinceAliases {
    /// A table with no entries; every name standardizes to its normalized form.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Loads extra entries from a JSON file on top of the built-in table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MapError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let extra: HashMap<String, String> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), entries = extra.len(), "Loaded province aliases");

        let mut aliases = Self::default();
        aliases.extend(extra);
        Ok(aliases)
    }

    /// Adds or replaces entries. Both sides are normalized.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (variant, canonical) in entries {
            let variant = normalize_name(Some(variant.as_ref()));
            let canonical = normalize_name(Some(canonical.as_ref()));
            if variant.is_empty() || canonical.is_empty() {
                warn!(variant, canonical, "Ignoring empty alias entry");
                continue;
            }
            self.entries.insert(variant, canonical);
        }
        self.close_chains();
    }

    /// Number of variant spellings in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps a raw province name to its canonical key.
    ///
    /// Names missing from the table pass through in normalized form, so
    /// unknown spellings of one province stay distinct keys.
    pub fn standardize(&self, raw: &str) -> CanonicalKey {
        self.resolve(normalize_name(Some(raw)))
    }

    /// Like [`standardize`](Self::standardize) for a JSON attribute value.
    pub fn standardize_value(&self, value: &serde_json::Value) -> CanonicalKey {
        self.resolve(normalize_value(value))
    }

    fn resolve(&self, normalized: String) -> CanonicalKey {
        match self.entries.get(&normalized) {
            Some(canonical) => CanonicalKey(canonical.clone()),
            None => CanonicalKey(normalized),
        }
    }

    /// Points every entry at the end of its chain so a canonical key is
    /// never itself remapped. Cycles are left at the first repeated hop.
    fn close_chains(&mut self) {
        let snapshot = self.entries.clone();
        for target in self.entries.values_mut() {
            let mut seen = vec![target.clone()];
            while let Some(next) = snapshot.get(target.as_str()) {
                if seen.contains(next) {
                    break;
                }
                seen.push(next.clone());
                *target = next.clone();
            }
        }
    }
}
