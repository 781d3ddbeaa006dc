use std::collections::HashSet;
use tracing::warn;

/// Reduce free text to an IRI-safe local name.
///
/// Whitespace at the ends is dropped, inner spaces become `_`, `_-_` collapses to `-`, and
/// anything that is not alphanumeric, `-` or `_` is removed.
pub fn convert_string_to_label(input: &str) -> String {
    input
        .trim()
        .replace(' ', "_")
        .replace("_-_", "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// `"""text"""@tag` as built by [`crate::core::predicates::language_literal`]. Cell text that merely
/// starts with a quote is not a literal.
fn is_language_literal(raw: &str) -> bool {
    let Some(body) = raw.strip_prefix("\"\"\"") else {
        return false;
    };
    let Some((_, tag)) = body.rsplit_once("\"\"\"@") else {
        return false;
    };
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Turns raw cell text into Turtle terms: `prefix:name`, `<absolute-iri>` or a literal.
#[derive(Debug, Clone)]
pub struct IriSanitizer {
    base_prefix: String,
    known_prefixes: HashSet<String>,
}

impl IriSanitizer {
    pub fn new<I, S>(base_prefix: &str, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known_prefixes: HashSet<String> = prefixes.into_iter().map(Into::into).collect();
        known_prefixes.insert(String::new());
        known_prefixes.insert("_".to_string());
        known_prefixes.insert(base_prefix.to_string());

        Self {
            base_prefix: base_prefix.to_string(),
            known_prefixes,
        }
    }

    /// Canonical term for `raw`, or `None` when it uses an unknown prefix or reduces to
    /// nothing.
    pub fn sanitize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();

        if is_language_literal(raw) {
            return Some(raw.to_string());
        }

        if raw.contains(':') && !raw.contains(": ") {
            if let Some(stripped) = raw.strip_suffix(':') {
                return self.sanitize(stripped);
            }

            let prefix = raw.split(':').next().unwrap_or_default();
            if self.known_prefixes.contains(prefix) {
                return Some(raw.to_string());
            }
            if raw.contains(":/") {
                return Some(format!("<{}>", raw));
            }

            warn!("unknown prefix: {}", prefix);
            return None;
        }

        self.mint(raw)
    }

    /// `base_prefix:label` for free text.
    pub fn mint(&self, raw: &str) -> Option<String> {
        let label = convert_string_to_label(raw);
        if label.is_empty() {
            None
        } else {
            Some(format!("{}:{}", self.base_prefix, label))
        }
    }
}
