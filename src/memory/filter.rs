use bson::{Bson, Document};
use std::cmp::Ordering;

use super::MemoryError;
use super::eval::{bson_eq, compare_bson, get_path};

pub(crate) const MAX_IN_SET: usize = 1000;
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Parsed form of a Mongo-style filter document.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
}

/// Parses `{"qty": {"$gt": 0}, "$or": [{"a": 1}, {"b": 2}]}` style documents.
///
/// # Errors
/// `MemoryError::UnknownOperator` for an unsupported `$` key and
/// `MemoryError::InvalidFilter` for a malformed operand.
pub fn parse_filter(doc: &Document) -> Result<Filter, MemoryError> {
    parse_level(doc, 0)
}

fn parse_level(doc: &Document, depth: usize) -> Result<Filter, MemoryError> {
    if depth > MAX_NESTING {
        return Err(MemoryError::InvalidFilter("filter nested too deeply".into()));
    }
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        if let Some(op) = key.strip_prefix('$') {
            let subs = logical_operands(key, value, depth)?;
            clauses.push(match op {
                "and" => Filter::And(subs),
                "or" => Filter::Or(subs),
                "nor" => Filter::Nor(subs),
                _ => return Err(MemoryError::UnknownOperator(key.clone())),
            });
            continue;
        }
        match value {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                clauses.push(parse_field_ops(key, ops)?);
            }
            other => clauses.push(Filter::Cmp { path: key.clone(), op: CmpOp::Eq, value: other.clone() }),
        }
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn logical_operands(key: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, MemoryError> {
    if !matches!(key, "$and" | "$or" | "$nor") {
        return Err(MemoryError::UnknownOperator(key.to_string()));
    }
    let Bson::Array(items) = value else {
        return Err(MemoryError::InvalidFilter(format!("{key} needs an array")));
    };
    if items.is_empty() {
        return Err(MemoryError::InvalidFilter(format!("{key} needs a nonempty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_level(d, depth + 1),
            _ => Err(MemoryError::InvalidFilter(format!("{key} entries must be documents"))),
        })
        .collect()
}

fn parse_field_ops(path: &str, ops: &Document) -> Result<Filter, MemoryError> {
    let mut clauses = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let cmp = |op: CmpOp| Filter::Cmp { path: path.to_string(), op, value: operand.clone() };
        clauses.push(match op.as_str() {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => cmp(CmpOp::Ne),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" | "$nin" => {
                let Bson::Array(values) = operand else {
                    return Err(MemoryError::InvalidFilter(format!("{op} needs an array")));
                };
                if values.len() > MAX_IN_SET {
                    return Err(MemoryError::InvalidFilter(format!("{op} takes at most {MAX_IN_SET} values")));
                }
                let values = values.clone();
                if op == "$in" {
                    Filter::In { path: path.to_string(), values }
                } else {
                    Filter::Nin { path: path.to_string(), values }
                }
            }
            "$exists" => {
                let exists = match operand {
                    Bson::Boolean(b) => *b,
                    other => crate::utils::num::bson_to_i64(other).is_some_and(|n| n != 0),
                };
                Filter::Exists { path: path.to_string(), exists }
            }
            "$not" => {
                let Bson::Document(inner) = operand else {
                    return Err(MemoryError::InvalidFilter("$not needs an operator document".into()));
                };
                Filter::Not(Box::new(parse_field_ops(path, inner)?))
            }
            _ => return Err(MemoryError::UnknownOperator(op.clone())),
        });
    }
    Ok(if clauses.len() == 1 { clauses.remove(0) } else { Filter::And(clauses) })
}

fn matches_value(v: &Bson, pred: impl Fn(&Bson) -> bool) -> bool {
    // Arrays match when any element does, as well as when the whole array does.
    pred(v) || matches!(v, Bson::Array(items) if items.iter().any(&pred))
}

#[must_use]
pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path)
            .is_some_and(|v| matches_value(v, |x| values.iter().any(|w| bson_eq(x, w)))),
        Filter::Nin { path, values } => !get_path(doc, path)
            .is_some_and(|v| matches_value(v, |x| values.iter().any(|w| bson_eq(x, w)))),
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !get_path(doc, path).is_some_and(|v| matches_value(v, |x| bson_eq(x, value)))
        }
        Filter::Cmp { path, op, value } => get_path(doc, path).is_some_and(|v| {
            matches_value(v, |x| match op {
                CmpOp::Eq => bson_eq(x, value),
                CmpOp::Gt => same_class(x, value) && compare_bson(x, value, false) == Ordering::Greater,
                CmpOp::Gte => same_class(x, value) && compare_bson(x, value, false) != Ordering::Less,
                CmpOp::Lt => same_class(x, value) && compare_bson(x, value, false) == Ordering::Less,
                CmpOp::Lte => same_class(x, value) && compare_bson(x, value, false) != Ordering::Greater,
                CmpOp::Ne => !bson_eq(x, value),
            })
        }),
    }
}

// Range operators only match values of a comparable type (numbers with numbers, etc).
fn same_class(a: &Bson, b: &Bson) -> bool {
    let num = |x: &Bson| matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_));
    (num(a) && num(b)) || std::mem::discriminant(a) == std::mem::discriminant(b)
}
