//! # Frame Field Patterns
//!
//! Each inbound frame definition carries a structural pattern that names the
//! fields of its payload. The pattern is a whitespace-separated list of field
//! specs, parsed with `nom`:
//!
//! | Spec         | Meaning                                        |
//! |--------------|------------------------------------------------|
//! | `cmd1`       | one byte captured as `cmd1`                    |
//! | `from:3`     | three bytes captured as `from`                 |
//! | `ack=06\|15` | one byte captured as `ack`, must be 06 or 15   |
//! | `_:2`        | two bytes skipped                              |
//!
//! A pattern is compiled against the payload length declared next to it; the
//! widths must add up to exactly that length, so every accepted pattern can
//! match at least one payload.
//!
//! ```rust
//! use plm_rs::catalog::pattern::FramePattern;
//!
//! let pattern = FramePattern::compile("id:3 fw ack=06|15", 5).unwrap();
//! let fields = pattern.decode(&[0x1a, 0x2b, 0x3c, 0x9e, 0x06]).unwrap();
//! assert_eq!(fields.get("id").unwrap().to_string(), "1a2b3c");
//! assert!(pattern.decode(&[0x1a, 0x2b, 0x3c, 0x9e, 0x07]).is_none());
//! ```

use crate::error::PlmError;
use nom::{
    bytes::complete::{take, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{all_consuming, map_res, opt, recognize},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::collections::HashSet;
use std::fmt;

/// One field of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// `None` for skipped (`_`) bytes
    pub name: Option<String>,
    pub width: usize,
    /// Permitted values for a one-byte field; empty means any value
    pub allowed: Vec<u8>,
}

/// A compiled structural pattern for one frame type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    source: String,
    fields: Vec<FieldSpec>,
}

/// Raw bytes captured for one named field, displayed as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue(Vec<u8>);

impl FieldValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        FieldValue(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The value of a one-byte field.
    pub fn as_u8(&self) -> Option<u8> {
        match self.0.as_slice() {
            [b] => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Decoded fields of one frame, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFields {
    entries: Vec<(String, FieldValue)>,
}

impl FrameFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type RawField<'a> = (&'a str, Option<usize>, Option<Vec<u8>>);

fn field_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn field_width(input: &str) -> IResult<&str, usize> {
    preceded(char(':'), map_res(digit1, str::parse::<usize>))(input)
}

fn hex_value(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s| {
        u8::from_str_radix(s, 16)
    })(input)
}

fn allowed_values(input: &str) -> IResult<&str, Vec<u8>> {
    preceded(char('='), separated_list1(char('|'), hex_value))(input)
}

fn field_spec(input: &str) -> IResult<&str, RawField<'_>> {
    tuple((field_name, opt(field_width), opt(allowed_values)))(input)
}

fn pattern_specs(input: &str) -> IResult<&str, Vec<RawField<'_>>> {
    all_consuming(delimited(
        multispace0,
        separated_list0(multispace1, field_spec),
        multispace0,
    ))(input)
}

impl FramePattern {
    /// Parse `source` and check it against the declared payload length.
    pub fn compile(source: &str, payload_len: usize) -> Result<Self, PlmError> {
        let (_, raw) = pattern_specs(source)
            .map_err(|e| PlmError::ConfigError(format!("bad pattern \"{source}\": {e}")))?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw.len());
        for (name, width, allowed) in raw {
            let width = width.unwrap_or(1);
            let allowed = allowed.unwrap_or_default();
            if width == 0 {
                return Err(PlmError::ConfigError(format!(
                    "pattern \"{source}\": field {name} has zero width"
                )));
            }
            if !allowed.is_empty() && width != 1 {
                return Err(PlmError::ConfigError(format!(
                    "pattern \"{source}\": value set on multi-byte field {name}"
                )));
            }
            let name = if name == "_" {
                None
            } else {
                if !seen.insert(name) {
                    return Err(PlmError::ConfigError(format!(
                        "pattern \"{source}\": duplicate field {name}"
                    )));
                }
                Some(name.to_string())
            };
            fields.push(FieldSpec { name, width, allowed });
        }

        let total = fields
            .iter()
            .try_fold(0usize, |acc, f| acc.checked_add(f.width))
            .ok_or_else(|| {
                PlmError::ConfigError(format!("pattern \"{source}\": field widths overflow"))
            })?;
        if total != payload_len {
            return Err(PlmError::ConfigError(format!(
                "pattern \"{source}\" covers {total} byte(s), payload is {payload_len}"
            )));
        }

        Ok(FramePattern {
            source: source.to_string(),
            fields,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of payload bytes the pattern covers.
    pub fn width(&self) -> usize {
        self.fields.iter().fold(0, |acc, f| acc.saturating_add(f.width))
    }

    /// Names of the captured (non-skipped) fields, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| f.name.as_deref())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_names().any(|n| n == name)
    }

    /// Match a payload; `None` when its content does not fit the pattern.
    pub fn decode(&self, payload: &[u8]) -> Option<FrameFields> {
        match self.apply(payload) {
            Ok((rest, fields)) if rest.is_empty() => Some(fields),
            _ => None,
        }
    }

    fn apply<'a>(&self, mut input: &'a [u8]) -> IResult<&'a [u8], FrameFields> {
        let mut out = FrameFields::new();
        for spec in &self.fields {
            let (rest, bytes) = take::<_, _, nom::error::Error<&[u8]>>(spec.width)(input)?;
            if !spec.allowed.is_empty() && !spec.allowed.contains(&bytes[0]) {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::OneOf,
                )));
            }
            if let Some(name) = &spec.name {
                out.insert(name.clone(), FieldValue::new(bytes.to_vec()));
            }
            input = rest;
        }
        Ok((input, out))
    }
}
