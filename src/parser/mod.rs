//! CSV row validation
//!
//! Turns the raw text of one remote file into typed rows. Parsing is
//! header-driven and tolerant of ragged rows; classification then applies
//! either the strict or the permissive policy (see [`ValidationMode`]).

use std::collections::HashMap;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::constants::HEX_LENGTH;
use crate::types::{LenientRow, Row, ValidRow, ValidationMode};

/// Header name to field value, exactly as read from the file.
pub type RawRow = HashMap<String, String>;

pub const FIELD_TEXT: &str = "text";
pub const FIELD_NUMBER: &str = "number";
pub const FIELD_HEX: &str = "hex";

/// Result of the structural parse, before any field validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Vec<RawRow>),
    Failed(String),
}

impl ParseOutcome {
    /// A structural failure degrades to zero rows.
    pub fn into_rows(self) -> Vec<RawRow> {
        match self {
            ParseOutcome::Parsed(rows) => rows,
            ParseOutcome::Failed(reason) => {
                warn!("CSV parse failed, treating file as empty: {}", reason);
                Vec::new()
            }
        }
    }
}

/// Parse CSV text using its first record as the header.
///
/// Blank lines are skipped. Short rows simply lack the trailing fields and
/// fields beyond the header width are ignored.
pub fn parse_rows(raw: &str) -> ParseOutcome {
    if let Err(reason) = check_quoting(raw) {
        return ParseOutcome::Failed(reason);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return ParseOutcome::Failed(format!("Failed to read CSV headers: {}", e)),
    };

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                return ParseOutcome::Failed(format!("Failed to parse CSV row {}: {}", index + 1, e))
            }
        };
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }

    debug!("Parsed {} CSV rows", rows.len());
    ParseOutcome::Parsed(rows)
}

/// Reject quoting the `csv` reader would silently accept.
///
/// A quote may only open a field at its first character, must be closed
/// before end of input, and a closing quote must be followed by a
/// delimiter, a line break or end of input. `""` inside a quoted field is an
/// escaped quote.
fn check_quoting(raw: &str) -> Result<(), String> {
    let mut line = 1usize;
    let mut field_start = true;
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if in_quotes {
            if c == '"' {
                match chars.peek() {
                    Some('"') => {
                        chars.next();
                    }
                    None | Some(',') | Some('\n') | Some('\r') => in_quotes = false,
                    Some(other) => {
                        return Err(format!(
                            "Invalid closing quote at line {}: found '{}' after quote",
                            line, other
                        ))
                    }
                }
            }
            continue;
        }
        match c {
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            '"' => return Err(format!("Invalid opening quote at line {}", line)),
            ',' | '\n' | '\r' => field_start = true,
            _ => field_start = false,
        }
    }

    if in_quotes {
        return Err(format!("Quoted field not terminated at line {}", line));
    }
    Ok(())
}

/// Parse and classify every row of `raw` under `mode`.
pub fn validate(raw: &str, mode: ValidationMode) -> Vec<Row> {
    validate_counted(raw, mode).0
}

/// Like [`validate`], also returning how many rows the parser produced.
pub fn validate_counted(raw: &str, mode: ValidationMode) -> (Vec<Row>, usize) {
    let parsed = parse_rows(raw).into_rows();
    let rows = parsed
        .iter()
        .filter_map(|row| classify_row(row, mode))
        .collect();
    (rows, parsed.len())
}

/// Apply the field predicates to one parsed row.
///
/// Strict mode returns `None` for any row failing a predicate; permissive mode
/// always returns a row.
pub fn classify_row(row: &RawRow, mode: ValidationMode) -> Option<Row> {
    let text = row
        .get(FIELD_TEXT)
        .filter(|t| !t.is_empty())
        .cloned();
    let number = row
        .get(FIELD_NUMBER)
        .filter(|n| !n.is_empty())
        .and_then(|n| coerce_number(n));
    let hex = row.get(FIELD_HEX).filter(|h| has_hex_width(h)).cloned();

    match mode {
        ValidationMode::Strict => match (text, number, hex) {
            (Some(text), Some(number), Some(hex)) => Some(Row::Valid(ValidRow { text, number, hex })),
            _ => None,
        },
        ValidationMode::Permissive => Some(Row::Lenient(LenientRow { text, number, hex })),
    }
}

/// Width is counted in UTF-16 units; the alphabet is not checked.
fn has_hex_width(value: &str) -> bool {
    value.encode_utf16().count() == HEX_LENGTH
}

/// Loose numeric coercion of a non-empty field.
///
/// Surrounding whitespace is ignored and a blank value counts as zero.
/// Plain decimals (sign, fraction, exponent) and unsigned `0x`/`0o`/`0b`
/// integers are accepted. Non-finite results are rejected.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix_digits = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|(prefix, radix)| trimmed.strip_prefix(prefix).map(|rest| (rest, *radix)));
    if let Some((digits, radix)) = radix_digits {
        return parse_radix(digits, radix);
    }

    let decimal_shape = trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !decimal_shape {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let value = digits.chars().try_fold(0f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })?;
    value.is_finite().then_some(value)
}
