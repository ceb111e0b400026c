//! Key Normalization
//!
//! Canonicalizes cache keys so logically identical requests share one entry.

use regex::Regex;

/// Lower-cases keys and strips query parameters that do not affect the
/// response (cache busters such as `timestamp` or `nocache`).
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    ignored: Option<Regex>,
}

impl KeyNormalizer {
    /// Builds a normalizer that drops the given query parameter names.
    pub fn new<S: AsRef<str>>(ignored_params: &[S]) -> Self {
        let names: Vec<String> = ignored_params
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(&p.to_lowercase()))
            .collect();

        let ignored = if names.is_empty() {
            None
        } else {
            // Escaped names always form a valid pattern
            Regex::new(&format!("[?&](?:{})=[^&]*", names.join("|"))).ok()
        };

        Self { ignored }
    }

    /// Returns the canonical form of `key`.
    pub fn normalize(&self, key: &str) -> String {
        let lowered = key.to_lowercase();
        match &self.ignored {
            Some(re) => re.replace_all(&lowered, "").into_owned(),
            None => lowered,
        }
    }
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self::new(&["timestamp", "_t", "nocache"])
    }
}
