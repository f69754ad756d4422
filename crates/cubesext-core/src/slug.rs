//! Slug identifiers derived from table and column names

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn separator_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static pattern is valid"))
}

/// Transliterate `text` to ASCII, lowercase it and collapse every run of
/// non-alphanumeric characters into a single `_`, trimming separators at
/// both ends.
///
/// The result can be empty (`"___"`, symbols without a transliteration).
pub fn slugify(text: &str) -> String {
    let lower = deunicode::deunicode(text).to_lowercase();
    separator_runs()
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Strip a trailing `_id` from an already slugged name, if present.
pub fn strip_id_suffix(slug: &str) -> &str {
    match slug.strip_suffix("_id") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => slug,
    }
}

/// Names handed out within one namespace; clashes get a numeric suffix
#[derive(Debug, Clone, Default)]
pub struct SlugSet {
    used: HashSet<String>,
}

impl SlugSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a name as taken
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// `base` if it is free, otherwise `base_2`, `base_3`, ...
    pub fn unique(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
