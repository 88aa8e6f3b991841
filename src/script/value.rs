use crate::sim::{CollisionStatus, Observation, Pose};
use serde::Serialize;
use std::fmt;

/// Runtime value of a control script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Text(String),
    Observation(Observation),
    Pose(Pose),
    Collision(CollisionStatus),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Observation(_) => "observation",
            Value::Pose(_) => "pose",
            Value::Collision(_) => "collision",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Observation(obs) => !obs.detections.is_empty(),
            Value::Pose(_) => true,
            // truthy while something is in the way
            Value::Collision(status) => *status != CollisionStatus::Free,
        }
    }

    /// Numeric view; text that parses as a number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Equality used by `==`/`!=`: numeric when both sides are numeric,
    /// otherwise by rendered text, so `$status == free` works.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Observation(obs) => write!(f, "{obs}"),
            Value::Pose(pose) => write!(f, "{pose}"),
            Value::Collision(status) => write!(f, "{status}"),
        }
    }
}

/// Parse a numeric literal. Words such as `inf` or `nan` stay text.
pub fn parse_number(token: &str) -> Option<f64> {
    let digits = token.trim_start_matches(['-', '+']);
    let starts_numeric = digits
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    if !starts_numeric {
        return None;
    }
    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_but_special_float_words_do_not() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("-0.5"), Some(-0.5));
        assert_eq!(parse_number(".25"), Some(0.25));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("map"), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn loose_equality_compares_numbers_and_rendered_text() {
        assert!(Value::Number(1.0).loosely_equals(&Value::Text("1".into())));
        assert!(Value::Collision(CollisionStatus::Left).loosely_equals(&Value::Text("left".into())));
        assert!(!Value::Bool(true).loosely_equals(&Value::Text("yes".into())));
        assert!(Value::Nil.loosely_equals(&Value::Nil));
    }

    #[test]
    fn collision_is_truthy_only_when_blocked() {
        assert!(!Value::Collision(CollisionStatus::Free).is_truthy());
        assert!(Value::Collision(CollisionStatus::Front).is_truthy());
    }
}
