use std::collections::HashMap;
use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput};

use crate::error::{BeanError, Result};
use crate::filter::StrictFilter;

// ------------- Value -------------
/// A tagged scalar held by a bean property. The variants correspond one to
/// one with the rungs of the type ladder in [`crate::infer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    /// The canonical string form used for type inference round-trips.
    /// Binary values have no canonical text form and are excluded upstream.
    pub fn canonical(&self) -> String {
        match self {
            Value::Bool(b) => if *b { "1".into() } else { "0".into() },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(t) => t.clone(),
            Value::Binary(_) => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            other => write!(f, "{}", other.canonical()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Bool(b) => ToSqlOutput::from(*b as i64),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(t) => ToSqlOutput::from(t.as_str()),
            Value::Binary(b) => ToSqlOutput::from(b.as_slice()),
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_owned()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}
impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self { Value::Binary(b) }
}

// ------------- Bean -------------
/// A loosely typed record: a type name, a numeric id and an ordered property
/// bag. `id == 0` means the bean has not been stored yet. Beans are owned
/// exclusively by the caller; the engine never caches them between calls.
#[derive(Debug, Clone)]
pub struct Bean {
    type_name: String,
    pub id: i64,
    properties: Vec<(String, Value)>,
}

impl Bean {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: 0,
            properties: Vec::new(),
        }
    }
    // The type is encapsulated behind a getter so it stays immutable
    // after dispensing, while the property bag is freely mutable.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
    pub fn is_transient(&self) -> bool {
        self.id == 0
    }
    /// Sets a property, replacing an earlier value under the same name while
    /// keeping its original position in the bag.
    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name, value)),
        }
    }
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.properties.len()
    }
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Display for Bean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

// ------------- Validation -------------
/// Structural checks performed before any write: a non-empty type that
/// survives the identifier filter unchanged, and property names that are
/// valid identifiers. Violations are raised, never swallowed.
pub fn check_bean(bean: &Bean, filter: &StrictFilter) -> Result<()> {
    if bean.type_name.is_empty() {
        return Err(BeanError::Validation {
            bean_type: String::new(),
            message: "bean has no type".into(),
        });
    }
    if filter.table_name(&bean.type_name) != bean.type_name {
        return Err(BeanError::Validation {
            bean_type: bean.type_name.clone(),
            message: "type is not a clean table name".into(),
        });
    }
    for (name, _) in bean.properties() {
        if name == "id" {
            return Err(BeanError::Validation {
                bean_type: bean.type_name.clone(),
                message: "property 'id' is reserved".into(),
            });
        }
        if filter.property_name(name) != name {
            return Err(BeanError::Validation {
                bean_type: bean.type_name.clone(),
                message: format!("invalid property name '{}'", name),
            });
        }
    }
    Ok(())
}

// ------------- Dispenser -------------
/// Maps a type name to a constructor function, populated at startup.
/// Replaces by-name reflection: unknown types fall back to a blank bean.
pub struct Dispenser {
    constructors: HashMap<String, fn(&str) -> Bean>,
}

impl Dispenser {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }
    pub fn register(&mut self, type_name: impl Into<String>, constructor: fn(&str) -> Bean) {
        self.constructors.insert(type_name.into(), constructor);
    }
    pub fn dispense(&self, type_name: &str) -> Bean {
        match self.constructors.get(type_name) {
            Some(constructor) => constructor(type_name),
            None => Bean::new(type_name),
        }
    }
}

impl Default for Dispenser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_bag_keeps_insertion_order() {
        let mut bean = Bean::new("user");
        bean.set_prop("name", "Ann");
        bean.set_prop("age", 30i64);
        bean.set_prop("name", "Beth");
        let names: Vec<&str> = bean.properties().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["name", "age"]);
        assert_eq!(bean.prop("name"), Some(&Value::Text("Beth".into())));
    }

    #[test]
    fn check_rejects_reserved_and_dirty_names() {
        let filter = StrictFilter::new();
        let mut bean = Bean::new("user");
        bean.set_prop("id", 1i64);
        assert!(check_bean(&bean, &filter).is_err());

        let mut bean = Bean::new("user");
        bean.set_prop("drop table", 1i64);
        assert!(check_bean(&bean, &filter).is_err());

        let bean = Bean::new("User Account");
        assert!(check_bean(&bean, &filter).is_err());
    }

    #[test]
    fn dispenser_prefers_registered_constructor() {
        fn with_defaults(t: &str) -> Bean {
            let mut b = Bean::new(t);
            b.set_prop("active", true);
            b
        }
        let mut dispenser = Dispenser::new();
        dispenser.register("user", with_defaults);
        assert_eq!(dispenser.dispense("user").prop("active"), Some(&Value::Bool(true)));
        assert!(dispenser.dispense("book").is_empty());
    }
}
