//! Cache key generators for consistent key naming.

/// Segment between the namespace and a tag name.
const TAG_SEGMENT: &str = "tags";

/// Namespaced key builder.
///
/// Every key the engine touches lives under `{namespace}:`; tag index sets
/// live under `{namespace}:tags:`. The namespace is escaped wherever it ends
/// up in a glob pattern.
#[derive(Debug, Clone)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    /// Create a new key builder with the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full key for a caller-supplied key.
    pub fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Tag index set for a tag.
    pub fn tag(&self, tag: &str) -> String {
        format!("{}:{}:{}", self.namespace, TAG_SEGMENT, tag)
    }

    /// Namespaced glob pattern.
    pub fn pattern(&self, pattern: &str) -> String {
        format!("{}:{}", escape_glob(&self.namespace), pattern)
    }

    /// Pattern matching everything in the namespace, tag sets included.
    pub fn namespace_pattern(&self) -> String {
        self.pattern("*")
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("cachet")
    }
}

/// Returns true if `pattern` needs glob matching rather than a literal
/// lookup. Escaped characters count.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '\\'])
}

/// Escapes glob metacharacters so `value` only matches itself inside a
/// pattern.
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
