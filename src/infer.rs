//! The type ladder and inference over it.
//!
//! Columns are declared with the narrowest type that can faithfully hold the
//! values written so far, and only ever widen during normal operation:
//! `Boolean < Integer < Float < Text < Binary`. Narrowing is reserved for the
//! administrative optimizer pass in [`crate::gc`].

use std::fmt;

use crate::bean::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
    Binary,
}

/// The ladder from narrowest to widest.
pub const LADDER: [ColumnType; 5] = [
    ColumnType::Boolean,
    ColumnType::Integer,
    ColumnType::Float,
    ColumnType::Text,
    ColumnType::Binary,
];

impl ColumnType {
    /// Position on the ladder; higher ranks never narrow on write.
    pub fn rank(&self) -> u8 {
        match self {
            ColumnType::Boolean => 0,
            ColumnType::Integer => 1,
            ColumnType::Float => 2,
            ColumnType::Text => 3,
            ColumnType::Binary => 4,
        }
    }
    /// The declared SQL type name for this rung.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "real",
            ColumnType::Text => "text",
            ColumnType::Binary => "blob",
        }
    }
    /// Reverse of [`sql_name`](Self::sql_name), used when introspecting
    /// declared column types. Unknown declarations map to the widest rung so
    /// foreign columns are read back without loss.
    pub fn from_sql_name(name: &str) -> ColumnType {
        match name.to_ascii_lowercase().as_str() {
            "boolean" | "tinyint" => ColumnType::Boolean,
            "integer" | "int" | "bigint" => ColumnType::Integer,
            "real" | "float" | "double" => ColumnType::Float,
            "text" | "varchar" | "clob" => ColumnType::Text,
            _ => ColumnType::Binary,
        }
    }
    /// Whether this rung can faithfully represent the canonical string `s`,
    /// meaning a coercion into the rung and back yields `s` again.
    pub fn fits(&self, s: &str) -> bool {
        match self {
            ColumnType::Boolean => s == "0" || s == "1",
            ColumnType::Integer => s.parse::<i64>().map(|i| i.to_string() == s).unwrap_or(false),
            ColumnType::Float => {
                s.parse::<f64>()
                    .map(|f| f.is_finite() && f.to_string() == s)
                    .unwrap_or(false)
            }
            ColumnType::Text => true,
            ColumnType::Binary => true,
        }
    }
    pub fn widest(a: ColumnType, b: ColumnType) -> ColumnType {
        if a.rank() >= b.rank() { a } else { b }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

/// Walks the ladder narrowest to widest and returns the first rung whose
/// round-trip representation equals the value's canonical string. Binary
/// payloads have no canonical text form and go straight to the widest rung.
pub fn infer(value: &Value) -> ColumnType {
    if let Value::Binary(_) = value {
        return ColumnType::Binary;
    }
    let canonical = value.canonical();
    for candidate in LADDER {
        if candidate.fits(&canonical) {
            return candidate;
        }
    }
    ColumnType::Binary
}

/// Inference over a plain string, used by the optimizer when re-evaluating
/// stored data.
pub fn infer_str(s: &str) -> ColumnType {
    for candidate in LADDER {
        if candidate.fits(s) {
            return candidate;
        }
    }
    ColumnType::Binary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_the_narrowest_faithful_rung() {
        assert_eq!(infer(&Value::Text("1".into())), ColumnType::Boolean);
        assert_eq!(infer(&Value::Text("123".into())), ColumnType::Integer);
        assert_eq!(infer(&Value::Text("123.5".into())), ColumnType::Float);
        assert_eq!(infer(&Value::Text("Ann".into())), ColumnType::Text);
        assert_eq!(infer(&Value::Binary(vec![0, 1, 2])), ColumnType::Binary);
    }

    #[test]
    fn tagged_variants_infer_from_canonical_form() {
        assert_eq!(infer(&Value::Bool(true)), ColumnType::Boolean);
        assert_eq!(infer(&Value::Int(30)), ColumnType::Integer);
        assert_eq!(infer(&Value::Int(0)), ColumnType::Boolean);
        assert_eq!(infer(&Value::Float(1.5)), ColumnType::Float);
    }

    #[test]
    fn unfaithful_round_trips_fall_through() {
        // leading zeros and plus signs do not survive an integer round trip
        assert_eq!(infer_str("007"), ColumnType::Text);
        assert_eq!(infer_str("+1"), ColumnType::Text);
        // non-finite floats must not become real columns
        assert_eq!(infer_str("inf"), ColumnType::Text);
    }

    #[test]
    fn ladder_rank_is_total_and_monotone() {
        for pair in LADDER.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert_eq!(
            ColumnType::widest(ColumnType::Integer, ColumnType::Float),
            ColumnType::Float
        );
    }

    #[test]
    fn sql_names_round_trip() {
        for t in LADDER {
            assert_eq!(ColumnType::from_sql_name(t.sql_name()), t);
        }
    }
}
