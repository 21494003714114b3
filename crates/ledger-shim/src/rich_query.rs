//! Selector evaluation for the mock state database
//!
//! Supports the subset of the CouchDB query language the chaincode
//! emits and a little more: field equality, `$eq`, `$ne`, `$gt`,
//! `$gte`, `$lt`, `$lte`, `$in`, `$exists`, `$and`, `$or`, dotted
//! field paths, `sort` and `limit`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::{StubError, StubResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

/// A parsed query document
#[derive(Clone, Debug)]
pub struct RichQuery {
    selector: Map<String, Value>,
    sort: Vec<SortField>,
    limit: Option<usize>,
}

impl RichQuery {
    pub fn parse(query: &str) -> StubResult<Self> {
        let document: Value = serde_json::from_str(query)
            .map_err(|e| StubError::InvalidQuery(format!("not JSON: {}", e)))?;
        let document = document
            .as_object()
            .ok_or_else(|| StubError::InvalidQuery("query must be an object".to_string()))?;

        let selector = match document.get("selector") {
            Some(Value::Object(selector)) => selector.clone(),
            Some(_) => {
                return Err(StubError::InvalidQuery("selector must be an object".to_string()))
            }
            None => return Err(StubError::InvalidQuery("selector is required".to_string())),
        };

        let sort = match document.get("sort") {
            None => Vec::new(),
            Some(Value::Array(fields)) => fields
                .iter()
                .map(parse_sort_field)
                .collect::<StubResult<Vec<_>>>()?,
            Some(_) => return Err(StubError::InvalidQuery("sort must be an array".to_string())),
        };

        let limit = match document.get("limit") {
            None => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .ok_or_else(|| {
                        StubError::InvalidQuery("limit must be a non-negative integer".to_string())
                    })? as usize,
            ),
        };

        Ok(Self {
            selector,
            sort,
            limit,
        })
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    /// Does the document satisfy the selector
    pub fn matches(&self, document: &Value) -> StubResult<bool> {
        matches_selector(&self.selector, document)
    }

    /// Order two matched documents by the sort fields, then by key
    pub fn compare(&self, left: (&str, &Value), right: (&str, &Value)) -> Ordering {
        for sort in &self.sort {
            let a = lookup(left.1, &sort.field);
            let b = lookup(right.1, &sort.field);
            let ordering = compare_optional(a, b);
            let ordering = match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        left.0.cmp(right.0)
    }
}

fn parse_sort_field(value: &Value) -> StubResult<SortField> {
    match value {
        Value::String(field) => Ok(SortField {
            field: field.clone(),
            direction: SortDirection::Asc,
        }),
        Value::Object(map) if map.len() == 1 => {
            let (field, direction) = map
                .iter()
                .next()
                .ok_or_else(|| StubError::InvalidQuery("empty sort entry".to_string()))?;
            let direction = match direction.as_str() {
                Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                _ => {
                    return Err(StubError::InvalidQuery(format!(
                        "sort direction for {} must be \"asc\" or \"desc\"",
                        field
                    )))
                }
            };
            Ok(SortField {
                field: field.clone(),
                direction,
            })
        }
        _ => Err(StubError::InvalidQuery("malformed sort entry".to_string())),
    }
}

fn matches_selector(selector: &Map<String, Value>, document: &Value) -> StubResult<bool> {
    for (field, condition) in selector {
        let matched = match field.as_str() {
            "$or" => {
                let branches = as_selector_list(field, condition)?;
                let mut any = false;
                for branch in branches {
                    if matches_selector(branch, document)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$and" => {
                let branches = as_selector_list(field, condition)?;
                let mut all = true;
                for branch in branches {
                    if !matches_selector(branch, document)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            _ if field.starts_with('$') => {
                return Err(StubError::InvalidQuery(format!(
                    "unsupported combination operator {}",
                    field
                )))
            }
            _ => matches_condition(lookup(document, field), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn as_selector_list<'a>(
    operator: &str,
    value: &'a Value,
) -> StubResult<Vec<&'a Map<String, Value>>> {
    let items = value
        .as_array()
        .ok_or_else(|| StubError::InvalidQuery(format!("{} expects an array", operator)))?;
    items
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| {
                StubError::InvalidQuery(format!("{} entries must be objects", operator))
            })
        })
        .collect()
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> StubResult<bool> {
    let operators = match condition {
        Value::Object(map) if map.keys().all(|k| k.starts_with('$')) && !map.is_empty() => map,
        literal => return Ok(actual == Some(literal)),
    };

    for (operator, operand) in operators {
        let ok = match operator.as_str() {
            "$eq" => actual == Some(operand),
            "$ne" => actual != Some(operand),
            "$gt" => compare_present(actual, operand) == Some(Ordering::Greater),
            "$gte" => matches!(
                compare_present(actual, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            "$lt" => compare_present(actual, operand) == Some(Ordering::Less),
            "$lte" => matches!(
                compare_present(actual, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            "$in" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| StubError::InvalidQuery("$in expects an array".to_string()))?;
                actual.map_or(false, |value| candidates.contains(value))
            }
            "$exists" => {
                let expected = operand.as_bool().ok_or_else(|| {
                    StubError::InvalidQuery("$exists expects a boolean".to_string())
                })?;
                actual.is_some() == expected
            }
            other => {
                return Err(StubError::InvalidQuery(format!(
                    "unsupported condition operator {}",
                    other
                )))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn compare_present(actual: Option<&Value>, operand: &Value) -> Option<Ordering> {
    actual.and_then(|value| compare_values(value, operand))
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            compare_values(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// CouchDB collation order between JSON types
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
