use serde::{Deserialize, Serialize, Serializer};

/// Which validation policy the row validator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Drop any row that fails a field predicate.
    Strict,
    /// Keep every row, nulling fields that fail their predicate.
    Permissive,
}

impl ValidationMode {
    /// `includeEmpty` on the outer surface selects permissive validation.
    pub fn from_include_empty(include_empty: bool) -> Self {
        if include_empty {
            ValidationMode::Permissive
        } else {
            ValidationMode::Strict
        }
    }
}

/// A row that passed every strict predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidRow {
    pub text: String,
    #[serde(serialize_with = "serialize_number")]
    pub number: f64,
    pub hex: String,
}

/// A row kept in permissive mode; any field that failed validation is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LenientRow {
    pub text: Option<String>,
    #[serde(serialize_with = "serialize_optional_number")]
    pub number: Option<f64>,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    Valid(ValidRow),
    Lenient(LenientRow),
}

impl Row {
    pub fn text(&self) -> Option<&str> {
        match self {
            Row::Valid(r) => Some(&r.text),
            Row::Lenient(r) => r.text.as_deref(),
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Row::Valid(r) => Some(r.number),
            Row::Lenient(r) => r.number,
        }
    }

    pub fn hex(&self) -> Option<&str> {
        match self {
            Row::Valid(r) => Some(&r.hex),
            Row::Lenient(r) => r.hex.as_deref(),
        }
    }
}

/// Validated rows of one remote file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub file: String,
    pub lines: Vec<Row>,
}

impl FileRecord {
    pub fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            lines: Vec::new(),
        }
    }
}

/// Body of the remote list endpoint, and of `/files/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    pub files: Vec<String>,
}

/// Whole numbers serialize as JSON integers (`5`, not `5.0`).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_optional_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => serialize_number(n, serializer),
        None => serializer.serialize_none(),
    }
}
