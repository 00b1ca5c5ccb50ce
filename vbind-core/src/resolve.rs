//! Value Resolver
//!
//! Pure functions over a data root: dotted-path lookup, dotted-path
//! assignment, and expansion of `{{ expression }}` markers in text.
//!
//! # Resolution Rules
//!
//! Resolution starts at the root object and reads one segment at a time.
//!
//! - Reading a key an object lacks, or an index past the end of an array,
//!   yields `None`.
//! - Reading any segment of a bool, number, or string yields `None`.
//! - Reading a segment of `None` or `null` fails with
//!   [`BindError::PathResolution`] naming that segment.
//!
//! So `a.b.c` against `{a: {}}` fails on `c`, while `a.x` against `{a: 1}`
//! quietly resolves to `None`.
//!
//! Reads go through the observed properties, so resolution performed inside
//! a tracking context registers dependencies.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{BindError, Result};
use crate::reactive::{Object, Value};

/// A parsed dotted-path expression such as `user.address.city`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    source: String,
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// Parse an expression. Surrounding whitespace is ignored; empty
    /// expressions and empty segments are rejected.
    pub fn parse(expression: &str) -> Result<Self> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(BindError::InvalidExpression(expression.to_string()));
        }

        let segments: SmallVec<[String; 4]> = source.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(BindError::InvalidExpression(expression.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Path {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Read one segment from `current`.
fn read_segment(current: Option<Value>, segment: &str, path: &Path) -> Result<Option<Value>> {
    match current {
        None | Some(Value::Null) => Err(BindError::PathResolution {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
        Some(Value::Object(object)) => Ok(object.get(segment)),
        Some(Value::Array(array)) => Ok(segment.parse::<usize>().ok().and_then(|i| array.get(i))),
        Some(_) => Ok(None),
    }
}

/// Resolve a parsed path against `root`.
pub fn resolve(root: &Object, path: &Path) -> Result<Option<Value>> {
    path.segments()
        .iter()
        .try_fold(Some(Value::Object(root.clone())), |current, segment| {
            read_segment(current, segment, path)
        })
}

/// Resolve `expression` against `root`.
pub fn resolve_path(root: &Object, expression: &str) -> Result<Option<Value>> {
    resolve(root, &Path::parse(expression)?)
}

/// Assign through a parsed path.
///
/// Every segment but the last is read; the last is written through its
/// container, so an observed entry notifies its subscribers.
pub fn assign(root: &Object, path: &Path, value: Value) -> Result<()> {
    let (last, parents) = match path.segments().split_last() {
        Some(split) => split,
        None => return Err(BindError::InvalidExpression(path.to_string())),
    };

    let parent = parents
        .iter()
        .try_fold(Some(Value::Object(root.clone())), |current, segment| {
            read_segment(current, segment, path)
        })?;

    let unassignable = || BindError::PathResolution {
        path: path.to_string(),
        segment: last.clone(),
    };

    match parent {
        Some(Value::Object(object)) => object.set(last, value),
        Some(Value::Array(array)) => {
            let index = last.parse::<usize>().map_err(|_| unassignable())?;
            array.set(index, value)
        }
        _ => Err(unassignable()),
    }
}

/// Assign `value` at `expression` within `root`.
pub fn assign_path(root: &Object, expression: &str, value: Value) -> Result<()> {
    assign(root, &Path::parse(expression)?, value)
}

/// Text for a resolved value as a rendering sink shows it. Absent values
/// render as the empty string.
pub fn display(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}

// ----------------------------------------------------------------------------
// Interpolation
// ----------------------------------------------------------------------------

/// One `{{ expression }}` occurrence inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Byte offset of the opening `{{`.
    pub start: usize,
    /// Byte offset just past the closing `}}`.
    pub end: usize,
    /// The trimmed inner expression.
    pub expression: &'a str,
}

/// Characters a marker may not span.
const LINE_BREAKS: &[char] = &['\n', '\r', '\u{2028}', '\u{2029}'];

/// Iterator over the markers of a text, in order.
pub struct Markers<'a> {
    text: &'a str,
    pos: usize,
}

/// Scan `text` for interpolation markers.
///
/// A marker is `{{`, then at least one character with no line break, then
/// the nearest `}}`.
pub fn markers(text: &str) -> Markers<'_> {
    Markers { text, pos: 0 }
}

/// Whether `text` contains at least one marker.
pub fn has_markers(text: &str) -> bool {
    markers(text).next().is_some()
}

impl<'a> Iterator for Markers<'a> {
    type Item = Marker<'a>;

    fn next(&mut self) -> Option<Marker<'a>> {
        let text = self.text;
        while self.pos < text.len() {
            let open = self.pos + text[self.pos..].find("{{")?;
            let inner_start = open + 2;
            let rest = &text[inner_start..];

            let closed = rest.chars().next().and_then(|first| {
                let min = first.len_utf8();
                let close = min + rest[min..].find("}}")?;
                (!rest[..close].contains(LINE_BREAKS)).then_some(close)
            });

            match closed {
                Some(close) => {
                    let end = inner_start + close + 2;
                    self.pos = end;
                    return Some(Marker {
                        start: open,
                        end,
                        expression: rest[..close].trim(),
                    });
                }
                None => self.pos = open + 1,
            }
        }
        None
    }
}

/// Replace every marker in `text` with its resolved value, leaving the
/// literal text untouched.
pub fn expand_template(root: &Object, text: &str) -> Result<String> {
    let mut expanded = String::with_capacity(text.len());
    let mut literal_start = 0;

    for marker in markers(text) {
        expanded.push_str(&text[literal_start..marker.start]);
        let value = resolve_path(root, marker.expression)?;
        expanded.push_str(&display(value.as_ref()));
        literal_start = marker.end;
    }

    expanded.push_str(&text[literal_start..]);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(json: &str) -> Object {
        Object::parse_json(json).unwrap()
    }

    #[test]
    fn parse_paths() {
        let path = Path::parse(" user.name ").unwrap();
        assert_eq!(path.segments(), ["user", "name"]);
        assert_eq!(path.as_str(), "user.name");

        assert!(matches!(Path::parse(""), Err(BindError::InvalidExpression(_))));
        assert!(matches!(Path::parse("a..b"), Err(BindError::InvalidExpression(_))));
        assert!("a.".parse::<Path>().is_err());
    }

    #[test]
    fn resolve_nested() {
        let root = data(r#"{"a":{"b":{"c":7}}}"#);
        assert_eq!(resolve_path(&root, "a.b.c").unwrap(), Some(Value::from(7)));
    }

    #[test]
    fn resolve_array_index() {
        let root = data(r#"{"items":["x","y"]}"#);
        assert_eq!(resolve_path(&root, "items.1").unwrap(), Some(Value::from("y")));
        assert_eq!(resolve_path(&root, "items.9").unwrap(), None);
        assert_eq!(resolve_path(&root, "items.first").unwrap(), None);
    }

    #[test]
    fn missing_intermediate_names_segment() {
        let root = data(r#"{"a":{}}"#);
        let err = resolve_path(&root, "a.b.c").unwrap_err();
        assert_eq!(err.segment(), Some("c"));
    }

    #[test]
    fn null_intermediate_fails() {
        let root = data(r#"{"a":null}"#);
        let err = resolve_path(&root, "a.b").unwrap_err();
        assert_eq!(err.segment(), Some("b"));
    }

    #[test]
    fn scalar_child_is_absent() {
        let root = data(r#"{"a":1}"#);
        assert_eq!(resolve_path(&root, "a.x").unwrap(), None);
    }

    #[test]
    fn assign_nested_and_new_keys() {
        let root = data(r#"{"a":{"b":1}}"#);
        assign_path(&root, "a.b", Value::from(2)).unwrap();
        assign_path(&root, "a.fresh", Value::from("new")).unwrap();

        assert_eq!(resolve_path(&root, "a.b").unwrap(), Some(Value::from(2)));
        assert_eq!(resolve_path(&root, "a.fresh").unwrap(), Some(Value::from("new")));
    }

    #[test]
    fn assign_into_scalar_fails() {
        let root = data(r#"{"a":1}"#);
        let err = assign_path(&root, "a.b", Value::from(2)).unwrap_err();
        assert_eq!(err.segment(), Some("b"));
    }

    #[test]
    fn assign_array_item() {
        let root = data(r#"{"items":[1,2]}"#);
        assign_path(&root, "items.0", Value::from(10)).unwrap();
        assert_eq!(resolve_path(&root, "items.0").unwrap(), Some(Value::from(10)));
        assert!(assign_path(&root, "items.x", Value::from(1)).is_err());
    }

    #[test]
    fn marker_scanning() {
        let found: Vec<_> = markers("a {{ x }} b {{y.z}}").map(|m| m.expression).collect();
        assert_eq!(found, ["x", "y.z"]);

        assert!(!has_markers("plain text"));
        assert!(!has_markers("{{}}"));
        assert!(!has_markers("{{ broken\n }}"));
        assert!(!has_markers("{{ broken\r }}"));
        assert!(!has_markers("{{ a\u{2028}b }}"));
        assert!(!has_markers("{{ a\u{2029}b }}"));
        assert!(has_markers("{{ a\u{2029}b }} {{ c }}"));
        assert!(!has_markers("{{ unterminated"));
    }

    #[test]
    fn marker_offsets() {
        let marker = markers("hi {{name}}!").next().unwrap();
        assert_eq!((marker.start, marker.end), (3, 11));
    }

    #[test]
    fn expand_zero_one_many() {
        let root = data(r#"{"name":"Ann","age":30}"#);
        assert_eq!(expand_template(&root, "no markers").unwrap(), "no markers");
        assert_eq!(expand_template(&root, "{{name}}").unwrap(), "Ann");
        assert_eq!(
            expand_template(&root, "Hello {{name}}, you are {{age}}").unwrap(),
            "Hello Ann, you are 30"
        );
    }

    #[test]
    fn expand_adjacent_markers() {
        let root = data(r#"{"a":"x","b":"y"}"#);
        assert_eq!(expand_template(&root, "{{a}}{{b}}").unwrap(), "xy");
    }

    #[test]
    fn expand_absent_as_empty() {
        let root = data(r#"{"a":1}"#);
        assert_eq!(expand_template(&root, "[{{a.x}}]").unwrap(), "[]");
    }

    #[test]
    fn expand_propagates_resolution_errors() {
        let root = data(r#"{"a":{}}"#);
        assert!(expand_template(&root, "{{a.b.c}}").is_err());
    }
}
