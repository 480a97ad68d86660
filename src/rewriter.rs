//! Reconciles `%(name)s`, `:name` and `%<letter>` placeholder conventions
//! with the server's single positional `?` binding form.
//!
//! A single left-to-right scan classifies every placeholder site as it is
//! encountered, so a literal `?` is never ambiguous with one introduced by
//! token substitution and no sentinel byte is needed to tell them apart.
//! Sequence expansion then runs once over the resulting flat parameter
//! list, using each placeholder's character offset, rather than rescanning
//! the query from scratch per expansion — O(n) instead of O(n^2) in the
//! number of `?` occurrences.

use crate::error::{FourDError, FourDResult};
use crate::protocol::value::Value;
use std::collections::HashMap;

/// A single bound argument: either a plain value or a sequence to be
/// expanded into a parenthesized, comma-separated group of placeholders
/// (an `IN (...)` list).
#[derive(Clone, Debug)]
pub enum Param {
    Value(Value),
    Seq(Vec<Value>),
}

impl<T: Into<Value>> From<T> for Param {
    fn from(v: T) -> Self {
        Param::Value(v.into())
    }
}

/// The parameters bound to a query: either an ordered sequence (for
/// positional `?`/`%s`-style placeholders) or a name-to-value mapping (for
/// `%(name)s`/`:name`-style placeholders).
#[derive(Clone, Debug)]
pub enum Params {
    Positional(Vec<Param>),
    Named(HashMap<String, Param>),
}

impl Params {
    #[must_use]
    pub fn empty() -> Self {
        Params::Positional(Vec::new())
    }
}

/// One resolved placeholder site: either a value already looked up from a
/// named-parameter mapping, or a pending index into the positional list.
enum Slot {
    Resolved(Param),
    Positional,
}

/// Rewrites `query` so it contains only positional `?` placeholders, and
/// returns the flat, ordered list of values to bind.
pub fn rewrite(query: &str, params: &Params) -> FourDResult<(String, Vec<Value>)> {
    let chars: Vec<char> = query.chars().collect();
    let mut out = String::with_capacity(query.len());
    let mut slots: Vec<Slot> = Vec::new();

    let named = match params {
        Params::Named(map) => Some(map),
        Params::Positional(_) => None,
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '%' && chars.get(i + 1) == Some(&'%') {
            out.push('%');
            i += 2;
            continue;
        }
        if c == '%' && chars.get(i + 1) == Some(&'(') {
            if let Some((name, end)) = scan_percent_name(&chars, i) {
                if named.is_some() {
                    let value = lookup_named(named, &name)?;
                    slots.push(Slot::Resolved(value));
                    out.push('?');
                    i = end;
                    continue;
                }
            }
        }
        if c == ':' {
            if let Some((name, end)) = scan_ident(&chars, i + 1) {
                if named.is_some() {
                    let value = lookup_named(named, &name)?;
                    slots.push(Slot::Resolved(value));
                    out.push('?');
                    i = end;
                    continue;
                }
            }
        }
        if c == '%' && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic()) {
            out.push('?');
            slots.push(Slot::Positional);
            i += 2;
            continue;
        }
        if c == '?' {
            out.push('?');
            slots.push(Slot::Positional);
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }

    let mut positional_iter = match params {
        Params::Positional(values) => values.iter().cloned(),
        Params::Named(_) => Vec::new().into_iter(),
    };

    let mut flat: Vec<Param> = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Resolved(value) => flat.push(value),
            Slot::Positional => {
                let value = positional_iter.next().ok_or_else(|| {
                    FourDError::programming("not enough positional parameters for query")
                })?;
                flat.push(value);
            }
        }
    }

    Ok(expand_sequences(&out, flat))
}

fn lookup_named(named: Option<&HashMap<String, Param>>, name: &str) -> FourDResult<Param> {
    let map = named.ok_or_else(|| {
        FourDError::programming(format!(
            "query references named parameter {name:?} but positional parameters were supplied"
        ))
    })?;
    map.get(name).cloned().ok_or_else(|| {
        FourDError::programming(format!("missing value for named parameter {name:?}"))
    })
}

fn scan_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut end = start;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some((chars[start..end].iter().collect(), end))
}

/// Scans `%(name)s` starting at the `%`, returning the name and the index
/// just past the trailing `s`.
fn scan_percent_name(chars: &[char], start: usize) -> Option<(String, usize)> {
    let (name, after_name) = scan_ident(chars, start + 2)?;
    if chars.get(after_name) == Some(&')') && chars.get(after_name + 1) == Some(&'s') {
        Some((name, after_name + 2))
    } else {
        None
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Expands every sequence-valued parameter into a `(?,?,...)` group,
/// splicing its elements into the flat value list in place.
///
/// Runs once over the already-fully-substituted query: each sequence
/// parameter's position in `params` corresponds 1:1 to the Nth `?` in
/// `query`, so the replacement positions can be computed by a single scan
/// rather than repeated from-scratch searches.
fn expand_sequences(query: &str, params: Vec<Param>) -> (String, Vec<Value>) {
    let placeholder_positions: Vec<usize> = query
        .char_indices()
        .filter(|(_, c)| *c == '?')
        .map(|(idx, _)| idx)
        .collect();

    let mut rewritten = String::with_capacity(query.len());
    let mut flat_values = Vec::with_capacity(params.len());
    let mut last_end = 0;
    let mut placeholder_cursor = 0;

    for param in params {
        match param {
            Param::Value(value) => {
                if placeholder_cursor < placeholder_positions.len() {
                    let pos = placeholder_positions[placeholder_cursor];
                    rewritten.push_str(&query[last_end..pos + 1]);
                    last_end = pos + 1;
                }
                placeholder_cursor += 1;
                flat_values.push(value);
            }
            Param::Seq(values) => {
                if placeholder_cursor < placeholder_positions.len() {
                    let pos = placeholder_positions[placeholder_cursor];
                    rewritten.push_str(&query[last_end..pos]);
                    rewritten.push('(');
                    rewritten.push_str(&vec!["?"; values.len()].join(","));
                    rewritten.push(')');
                    last_end = pos + 1;
                }
                placeholder_cursor += 1;
                flat_values.extend(values);
            }
        }
    }
    rewritten.push_str(&query[last_end..]);
    (rewritten, flat_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, Value)]) -> Params {
        Params::Named(pairs.iter().map(|(k, v)| (k.to_string(), Param::Value(v.clone()))).collect())
    }

    #[test]
    fn percent_name_token_matches_scenario_1() {
        let params = named(&[("id", Value::Int(7))]);
        let (query, values) = rewrite("SELECT a,b FROM t WHERE id = %(id)s", &params).unwrap();
        assert_eq!(query, "SELECT a,b FROM t WHERE id = ?");
        assert_eq!(values, vec![Value::Int(7)]);
    }

    #[test]
    fn colon_name_token() {
        let params = named(&[("name", Value::Text("x".into()))]);
        let (query, values) = rewrite("SELECT * FROM t WHERE name = :name", &params).unwrap();
        assert_eq!(query, "SELECT * FROM t WHERE name = ?");
        assert_eq!(values, vec![Value::Text("x".into())]);
    }

    #[test]
    fn sequence_expansion_matches_scenario_2() {
        let params = Params::Positional(vec![Param::Seq(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ])]);
        let (query, values) = rewrite("SELECT * FROM t WHERE id IN %s", &params).unwrap();
        assert_eq!(query, "SELECT * FROM t WHERE id IN (?,?,?)");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn literal_question_mark_consumes_positional_param() {
        let params = Params::Positional(vec![Param::Value(Value::Int(5))]);
        let (query, values) = rewrite("SELECT * FROM t WHERE id = ?", &params).unwrap();
        assert_eq!(query, "SELECT * FROM t WHERE id = ?");
        assert_eq!(values, vec![Value::Int(5)]);
    }

    #[test]
    fn double_percent_is_literal() {
        let params = Params::empty();
        let (query, values) = rewrite("SELECT '100%%' FROM t", &params).unwrap();
        assert_eq!(query, "SELECT '100%' FROM t");
        assert!(values.is_empty());
    }

    #[test]
    fn percent_name_token_is_literal_with_positional_params() {
        let params = Params::Positional(vec![Param::Value(Value::Int(1))]);
        let (query, values) =
            rewrite("SELECT * FROM t WHERE note = '%(id)s' AND a = ?", &params).unwrap();
        assert_eq!(query, "SELECT * FROM t WHERE note = '%(id)s' AND a = ?");
        assert_eq!(values, vec![Value::Int(1)]);
    }

    #[test]
    fn missing_named_key_is_programming_error() {
        let params = named(&[("id", Value::Int(1))]);
        let err = rewrite("SELECT * FROM t WHERE x = %(missing)s", &params).unwrap_err();
        assert!(matches!(err, FourDError::ProgrammingError(_)));
    }

    #[test]
    fn mixed_sequence_and_scalar_positional() {
        let params = Params::Positional(vec![
            Param::Value(Value::Int(9)),
            Param::Seq(vec![Value::Int(1), Value::Int(2)]),
        ]);
        let (query, values) =
            rewrite("SELECT * FROM t WHERE a = ? AND b IN ?", &params).unwrap();
        assert_eq!(query, "SELECT * FROM t WHERE a = ? AND b IN (?,?)");
        assert_eq!(values, vec![Value::Int(9), Value::Int(1), Value::Int(2)]);
    }
}
