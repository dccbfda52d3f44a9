use crate::Time;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}
impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One measurement written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub name: String,
    pub timestamp: Time,
    pub fields: Vec<(&'static str, FieldValue)>,
}
impl Point {
    pub fn new(name: String, timestamp: Time) -> Self {
        Self {
            name,
            timestamp,
            fields: vec![],
        }
    }
    pub fn with(mut self, label: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((label, value.into()));
        self
    }

    pub fn field(&self, label: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| *v)
    }
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(l, _)| *l)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Milliseconds,
}
impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Milliseconds => "ms",
        }
    }
}

/// Everything submitted in one export cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub database: String,
    pub precision: Precision,
    pub points: Vec<Point>,
}
impl Batch {
    pub fn new(database: String, points: Vec<Point>) -> Self {
        Self {
            database,
            precision: Precision::Milliseconds,
            points,
        }
    }
}
