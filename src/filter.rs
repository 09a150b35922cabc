//! Identifier sanitization.
//!
//! Table names are reduced to lowercase `[a-z0-9]` with no underscores. That
//! restriction is load-bearing: it keeps the relation-table grammar
//! unambiguous, since a single `_` in an engine table name always separates
//! two type names (junction tables) and the `pc_` prefix always marks a tree
//! table. Property names additionally allow `_`, but not as a first
//! character.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TABLE_DIRT: Regex = Regex::new(r"[^a-z0-9]").unwrap();
    static ref PROPERTY_DIRT: Regex = Regex::new(r"[^a-z0-9_]").unwrap();
    static ref LEADING_NON_ALPHA: Regex = Regex::new(r"^[^a-z]+").unwrap();
}

#[derive(Debug, Default)]
pub struct StrictFilter;

impl StrictFilter {
    pub fn new() -> Self {
        StrictFilter
    }
    pub fn table_name(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let cleaned = TABLE_DIRT.replace_all(&lowered, "");
        LEADING_NON_ALPHA.replace(&cleaned, "").into_owned()
    }
    pub fn property_name(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let cleaned = PROPERTY_DIRT.replace_all(&lowered, "");
        LEADING_NON_ALPHA.replace(&cleaned, "").into_owned()
    }
}
