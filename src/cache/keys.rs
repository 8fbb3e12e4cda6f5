//! Cache key generation and invalidation patterns
//!
//! Keys follow `{entity}:{view}:{canonical params}`. Parameters are rendered
//! as JSON with object fields sorted and null fields dropped, so two filter
//! sets that differ only in field order or in unset optionals share a key.

use super::errors::CacheResult;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Entity types whose query results are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Metrics,
    Benchmarks,
    Sources,
}

impl CacheNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Benchmarks => "benchmarks",
            Self::Sources => "sources",
        }
    }

    /// Key for one cached view of this entity
    pub fn key<P: Serialize + ?Sized>(&self, view: &str, params: &P) -> CacheResult<String> {
        generate_key(self.as_str(), view, params)
    }

    /// Pattern matching every cached view of this entity
    pub fn pattern(&self) -> String {
        entity_pattern(self.as_str())
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a deterministic key from entity, view and query parameters.
///
/// Parameters that serialize to `null` or an empty object produce the
/// shorter `{entity}:{view}` key.
pub fn generate_key<P: Serialize + ?Sized>(
    entity: &str,
    view: &str,
    params: &P,
) -> CacheResult<String> {
    let value = serde_json::to_value(params)?;
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);

    if canonical.is_empty() || canonical == "{}" {
        Ok(format!("{entity}:{view}"))
    } else {
        Ok(format!("{entity}:{view}:{canonical}"))
    }
}

/// `entity:*`
pub fn entity_pattern(entity: &str) -> String {
    format!("{}:*", escape_glob(entity))
}

/// `key:*`, the keys derived from `key`. Glob metacharacters inside `key`
/// (JSON arrays in generated keys, for one) match literally.
pub fn related_pattern(key: &str) -> String {
    format!("{}:*", escape_glob(key))
}

/// Backslash-escape `*`, `?`, `[`, `]` and `\` so `literal` matches only itself
pub fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if item.is_null() {
                    out.push_str("null");
                } else {
                    write_canonical(item, out);
                }
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Redis-compatible glob matching: `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and
/// `\` escapes.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    match_from(&pattern, &key)
}

fn match_from(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Position after the most recent `*` and the key index it is trying
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, k));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match_class(pattern, p, key[k]),
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == key[k]).then_some(p + 2),
            Some(c) => (*c == key[k]).then_some(p + 1),
            None => None,
        };

        match (step, backtrack) {
            (Some(next), _) => {
                p = next;
                k += 1;
            }
            (None, Some((star_p, star_k))) => {
                p = star_p;
                k = star_k + 1;
                backtrack = Some((star_p, star_k + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Match `c` against the class opening at `pattern[start]`; returns the index
/// after the closing `]` on success.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<usize> {
    let mut i = start + 1;
    let negated = pattern.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        let mut lo = pattern[i];
        if lo == '\\' && i + 1 < pattern.len() {
            i += 1;
            lo = pattern[i];
        }
        if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let hi = pattern[i + 2];
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= lo == c;
            i += 1;
        }
    }

    // Unterminated class: treat `[` as a literal
    if i >= pattern.len() {
        return (c == '[').then_some(start + 1);
    }

    (matched != negated).then_some(i + 1)
}
