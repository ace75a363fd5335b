//! Room search predicates.
//!
//! A [`Query`] is a conjunction of terms over a room's public
//! properties. It is built fluently on the client, encoded into the
//! tagged binary format, and evaluated by whoever holds the room
//! registry. [`Query::matches`] is that evaluation, so the in-memory
//! directory and the remote authority agree on the semantics:
//!
//! - a term on a missing key is false (also for `not_equal` and
//!   `not_contain`);
//! - numbers compare across widths (`I32(20)` equals `I64(20)`);
//! - strings compare lexicographically; a string never compares with a
//!   number;
//! - `between` is inclusive at both ends;
//! - `contain` looks for an element in a list or array property.

use std::cmp::Ordering;

use roomwire_protocol::{PropertyMap, ProtocolError, Value, serial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Equal = 0,
    NotEqual = 1,
    Less = 2,
    LessEqual = 3,
    Greater = 4,
    GreaterEqual = 5,
    Between = 6,
    Contain = 7,
    NotContain = 8,
}

impl Op {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Equal,
            1 => Self::NotEqual,
            2 => Self::Less,
            3 => Self::LessEqual,
            4 => Self::Greater,
            5 => Self::GreaterEqual,
            6 => Self::Between,
            7 => Self::Contain,
            8 => Self::NotContain,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Self::Between => 2,
            _ => 1,
        }
    }
}

/// One predicate: `key op operands`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub key: String,
    pub op: Op,
    pub operands: Vec<Value>,
}

impl Term {
    fn matches(&self, props: &PropertyMap) -> bool {
        let Some(actual) = props.get(&self.key) else {
            return false;
        };
        let cmp = |i: usize| {
            self.operands
                .get(i)
                .and_then(|operand| actual.loose_cmp(operand))
        };
        match self.op {
            Op::Equal => self.operands.first().is_some_and(|v| actual.loose_eq(v)),
            Op::NotEqual => self.operands.first().is_some_and(|v| !actual.loose_eq(v)),
            Op::Less => cmp(0) == Some(Ordering::Less),
            Op::LessEqual => matches!(cmp(0), Some(Ordering::Less | Ordering::Equal)),
            Op::Greater => cmp(0) == Some(Ordering::Greater),
            Op::GreaterEqual => {
                matches!(cmp(0), Some(Ordering::Greater | Ordering::Equal))
            }
            Op::Between => {
                matches!(cmp(0), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cmp(1), Some(Ordering::Less | Ordering::Equal))
            }
            Op::Contain => self.contains(actual),
            Op::NotContain => actual.elements().is_some() && !self.contains(actual),
        }
    }

    fn contains(&self, actual: &Value) -> bool {
        let (Some(items), Some(needle)) = (actual.elements(), self.operands.first()) else {
            return false;
        };
        items.iter().any(|item| item.loose_eq(needle))
    }
}

/// A conjunctive room filter.
///
/// ```rust
/// use roomwire_protocol::PropertyMap;
/// use roomwire_room::Query;
///
/// let query = Query::new().between("bbb", 20, 80).contain("tags", "pvp");
/// let props = PropertyMap::new()
///     .with("bbb", 50)
///     .with("tags", vec!["pvp".to_string()]);
/// assert!(query.matches(&props));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    terms: Vec<Term>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn term(mut self, key: impl Into<String>, op: Op, operands: Vec<Value>) -> Self {
        self.terms.push(Term {
            key: key.into(),
            op,
            operands,
        });
        self
    }

    #[must_use]
    pub fn equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::Equal, vec![value.into()])
    }

    #[must_use]
    pub fn not_equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::NotEqual, vec![value.into()])
    }

    #[must_use]
    pub fn less(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::Less, vec![value.into()])
    }

    #[must_use]
    pub fn less_equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::LessEqual, vec![value.into()])
    }

    #[must_use]
    pub fn greater(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::Greater, vec![value.into()])
    }

    #[must_use]
    pub fn greater_equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::GreaterEqual, vec![value.into()])
    }

    /// `low <= value <= high`.
    #[must_use]
    pub fn between(
        self,
        key: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.term(key, Op::Between, vec![low.into(), high.into()])
    }

    #[must_use]
    pub fn contain(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::Contain, vec![value.into()])
    }

    #[must_use]
    pub fn not_contain(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(key, Op::NotContain, vec![value.into()])
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True if every term holds. The empty query matches everything.
    pub fn matches(&self, props: &PropertyMap) -> bool {
        self.terms.iter().all(|term| term.matches(props))
    }

    /// Encodes as a list of `[key, op, operand...]` lists.
    pub fn to_value(&self) -> Value {
        Value::List(
            self.terms
                .iter()
                .map(|term| {
                    let mut items = Vec::with_capacity(2 + term.operands.len());
                    items.push(Value::Str(term.key.clone()));
                    items.push(Value::U8(term.op as u8));
                    items.extend(term.operands.iter().cloned());
                    Value::List(items)
                })
                .collect(),
        )
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let raw_terms = match value {
            Value::List(raw_terms) => raw_terms,
            other => {
                return Err(ProtocolError::TypeMismatch {
                    expected: "list",
                    found: other.kind(),
                });
            }
        };
        let mut terms = Vec::with_capacity(raw_terms.len());
        for raw in raw_terms {
            let Value::List(items) = raw else {
                return Err(ProtocolError::InvalidMessage("query term is not a list".into()));
            };
            let mut items = items.into_iter();
            let (Some(Value::Str(key)), Some(Value::U8(code))) = (items.next(), items.next())
            else {
                return Err(ProtocolError::InvalidMessage(
                    "query term must start with key and operator".into(),
                ));
            };
            let op = Op::from_code(code).ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("unknown query operator {code}"))
            })?;
            let operands: Vec<Value> = items.collect();
            if operands.len() != op.arity() {
                return Err(ProtocolError::InvalidMessage(format!(
                    "query operator {op:?} takes {} operands, got {}",
                    op.arity(),
                    operands.len()
                )));
            }
            terms.push(Term { key, op, operands });
        }
        Ok(Self { terms })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serial::encode_value(&self.to_value())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_value(serial::decode_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(bbb: i32) -> PropertyMap {
        PropertyMap::new()
            .with("aaa", "public")
            .with("bbb", bbb)
            .with("ddd", vec![2, 4, 5, 8])
    }

    #[test]
    fn test_between_is_inclusive_and_filters_rooms() {
        let query = Query::new().between("bbb", 20, 80);
        let matching: Vec<i32> = [10, 20, 50, 80, 90]
            .into_iter()
            .filter(|&b| query.matches(&room(b)))
            .collect();
        assert_eq!(matching, vec![20, 50, 80]);
    }

    #[test]
    fn test_missing_key_is_false_even_for_negations() {
        let props = PropertyMap::new();
        assert!(!Query::new().not_equal("zzz", 1).matches(&props));
        assert!(!Query::new().not_contain("zzz", 1).matches(&props));
        assert!(!Query::new().less("zzz", 1).matches(&props));
    }

    #[test]
    fn test_terms_are_conjunctive() {
        let query = Query::new().greater_equal("bbb", 20).equal("aaa", "public");
        assert!(query.matches(&room(20)));
        assert!(!query.matches(&room(19)));
        assert!(!Query::new().equal("aaa", "private").greater("bbb", 0).matches(&room(5)));
    }

    #[test]
    fn test_contain_checks_array_elements() {
        assert!(Query::new().contain("ddd", 5).matches(&room(0)));
        assert!(!Query::new().contain("ddd", 3).matches(&room(0)));
        assert!(Query::new().not_contain("ddd", 3).matches(&room(0)));
        // scalar property: neither contains nor not-contains
        assert!(!Query::new().contain("bbb", 0).matches(&room(0)));
        assert!(!Query::new().not_contain("bbb", 1).matches(&room(0)));
    }

    #[test]
    fn test_compare_across_integer_widths() {
        let props = PropertyMap::new().with("n", 20i64);
        assert!(Query::new().equal("n", 20u8).matches(&props));
        assert!(Query::new().less_equal("n", 20).matches(&props));
    }

    #[test]
    fn test_string_never_compares_with_number() {
        let props = PropertyMap::new().with("n", "20");
        assert!(!Query::new().greater_equal("n", 0).matches(&props));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(Query::new().matches(&PropertyMap::new()));
    }

    #[test]
    fn test_bytes_round_trip() {
        let query = Query::new()
            .between("bbb", 20, 80)
            .contain("ddd", 5)
            .not_equal("aaa", "x");
        assert_eq!(Query::from_bytes(&query.to_bytes()).unwrap(), query);
    }

    #[test]
    fn test_from_value_rejects_wrong_arity() {
        let bad = Value::List(vec![Value::List(vec![
            Value::from("bbb"),
            Value::U8(Op::Between as u8),
            Value::I32(1),
        ])]);
        assert!(matches!(
            Query::from_value(bad),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_from_value_rejects_unknown_operator() {
        let bad = Value::List(vec![Value::List(vec![
            Value::from("k"),
            Value::U8(99),
            Value::I32(1),
        ])]);
        assert!(Query::from_value(bad).is_err());
    }
}
