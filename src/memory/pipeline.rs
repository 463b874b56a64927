use bson::{Bson, Document};

use crate::utils::num::{bson_to_i64, i64_to_usize, usize_to_u64, u64_to_i64_saturating};

use super::MemoryError;
use super::eval::{bson_eq, compare_bson, compare_docs, get_path, project, validate_sort};
use super::filter::{eval_filter, parse_filter};

/// Runs `stages` over `docs` in order.
///
/// Supported: `$match`, `$project`, `$sort`, `$skip`, `$limit`, `$count`,
/// `$group` (see [`group`]), `$addFields`/`$set` and `$unset`. Expressions
/// are field references (`"$a.b"`), `$literal`, and documents or arrays built
/// from those.
///
/// # Errors
/// `MemoryError::UnknownStage` for any other stage name, `UnknownOperator` for
/// any other `$` expression, `InvalidStage`/`InvalidSort`/`InvalidProjection`
/// for an operand with the wrong shape. Operands are checked even when no
/// documents reach the stage.
pub fn run_pipeline(
    mut docs: Vec<Document>,
    stages: &[Document],
    ignore_case: bool,
) -> Result<Vec<Document>, MemoryError> {
    for stage in stages {
        let mut it = stage.iter();
        let (Some((name, arg)), None) = (it.next(), it.next()) else {
            return Err(MemoryError::InvalidStage(
                "a pipeline stage specification object must contain exactly one field".into(),
            ));
        };
        docs = match name.as_str() {
            "$match" => {
                let filter = parse_filter(operand_doc(name, arg)?)?;
                docs.retain(|d| eval_filter(d, &filter));
                docs
            }
            "$project" => {
                let spec = operand_doc(name, arg)?;
                project(&Document::new(), spec)?;
                docs.iter().map(|d| project(d, spec)).collect::<Result<Vec<_>, _>>()?
            }
            "$sort" => {
                let spec = operand_doc(name, arg)?;
                if spec.is_empty() {
                    return Err(MemoryError::InvalidStage("$sort stage must have at least one sort key".into()));
                }
                validate_sort(spec)?;
                docs.sort_by(|a, b| compare_docs(a, b, spec, ignore_case));
                docs
            }
            "$skip" => {
                let n = count_operand(name, arg, 0)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = count_operand(name, arg, 1)?;
                docs.truncate(n);
                docs
            }
            "$count" => {
                let Bson::String(field) = arg else {
                    return Err(MemoryError::InvalidStage("$count needs a field name".into()));
                };
                if field.is_empty() || field.starts_with('$') || field.contains('.') {
                    return Err(MemoryError::InvalidStage(format!("invalid $count field: {field:?}")));
                }
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = Document::new();
                    out.insert(field.clone(), u64_to_i64_saturating(usize_to_u64(docs.len())));
                    vec![out]
                }
            }
            "$group" => group(docs, operand_doc(name, arg)?, ignore_case)?,
            "$addFields" | "$set" => {
                let spec = operand_doc(name, arg)?;
                for (field, expr) in spec {
                    check_output_field(name, field)?;
                    check_expr(expr)?;
                }
                for d in &mut docs {
                    add_fields(d, spec)?;
                }
                docs
            }
            "$unset" => {
                let fields = match arg {
                    Bson::String(s) => vec![s.as_str()],
                    Bson::Array(items) => items
                        .iter()
                        .map(|v| {
                            v.as_str()
                                .ok_or_else(|| MemoryError::InvalidStage(format!("$unset fields must be strings, got {v}")))
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => return Err(MemoryError::InvalidStage("$unset needs a field or list of fields".into())),
                };
                if let Some(bad) = fields.iter().find(|f| f.is_empty() || f.starts_with('$')) {
                    return Err(MemoryError::InvalidStage(format!("invalid $unset field: {bad:?}")));
                }
                for d in &mut docs {
                    for f in &fields {
                        remove_path(d, f);
                    }
                }
                docs
            }
            other => return Err(MemoryError::UnknownStage(other.to_string())),
        };
    }
    Ok(docs)
}

fn operand_doc<'a>(name: &str, arg: &'a Bson) -> Result<&'a Document, MemoryError> {
    match arg {
        Bson::Document(d) => Ok(d),
        _ => Err(MemoryError::InvalidStage(format!("{name} needs a document"))),
    }
}

fn count_operand(name: &str, arg: &Bson, min: i64) -> Result<usize, MemoryError> {
    bson_to_i64(arg)
        .filter(|n| *n >= min)
        .and_then(i64_to_usize)
        .ok_or_else(|| MemoryError::InvalidStage(format!("{name} needs an integer >= {min}, got {arg}")))
}

fn check_output_field(stage: &str, field: &str) -> Result<(), MemoryError> {
    if field.is_empty() || field.starts_with('$') || field.contains('.') {
        return Err(MemoryError::InvalidStage(format!("{stage} cannot write field {field:?}")));
    }
    Ok(())
}

// Resolving against an empty document surfaces unsupported operators up front.
fn check_expr(expr: &Bson) -> Result<(), MemoryError> {
    resolve(&Document::new(), expr).map(|_| ())
}

// `"$a.b"` reads a field and `{"$literal": v}` is `v` untouched. Other
// documents and arrays resolve member by member; missing fields are dropped
// from documents and become null in arrays. `Ok(None)` for a missing field.
fn resolve(d: &Document, expr: &Bson) -> Result<Option<Bson>, MemoryError> {
    match expr {
        Bson::String(s) if s.starts_with("$$") => Err(MemoryError::UnknownOperator(s.clone())),
        Bson::String(s) if s.starts_with('$') => Ok(get_path(d, &s[1..]).cloned()),
        Bson::Document(fields) => {
            if let Some(op) = fields.keys().find(|k| k.starts_with('$')) {
                return match fields.get("$literal") {
                    Some(v) if fields.len() == 1 => Ok(Some(v.clone())),
                    _ => Err(MemoryError::UnknownOperator(op.clone())),
                };
            }
            let mut out = Document::new();
            for (k, v) in fields {
                if let Some(value) = resolve(d, v)? {
                    out.insert(k.clone(), value);
                }
            }
            Ok(Some(Bson::Document(out)))
        }
        Bson::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for v in items {
                out.push(resolve(d, v)?.unwrap_or(Bson::Null));
            }
            Ok(Some(Bson::Array(out)))
        }
        other => Ok(Some(other.clone())),
    }
}

// Every expression sees the document as it was before the stage.
fn add_fields(d: &mut Document, spec: &Document) -> Result<(), MemoryError> {
    let mut values = Vec::with_capacity(spec.len());
    for (k, v) in spec {
        if let Some(value) = resolve(d, v)? {
            values.push((k.clone(), value));
        }
    }
    for (k, value) in values {
        d.insert(k, value);
    }
    Ok(())
}

fn remove_path(d: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            d.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = d.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

const ACCUMULATORS: [&str; 7] = ["$sum", "$avg", "$min", "$max", "$first", "$last", "$push"];

/// `{"_id": <expr>, "<field>": {"<acc>": <expr>}, ...}`.
///
/// Groups keep first-seen order; a document-valued `_id` groups on every
/// field it names. Accumulators: `$sum`, `$avg`, `$min`, `$max`, `$first`,
/// `$last`, `$push`. Missing fields are skipped by every accumulator except
/// `$first`/`$last`, which yield null.
fn group(docs: Vec<Document>, spec: &Document, ignore_case: bool) -> Result<Vec<Document>, MemoryError> {
    let id_expr = spec
        .get("_id")
        .ok_or_else(|| MemoryError::InvalidStage("$group needs an _id expression".into()))?;
    check_expr(id_expr)?;
    let mut accs = Vec::with_capacity(spec.len());
    for (field, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        check_output_field("$group", field)?;
        let Bson::Document(acc) = acc else {
            return Err(MemoryError::InvalidStage(format!("$group field {field} needs an accumulator")));
        };
        let mut it = acc.iter();
        let (Some((op, operand)), None) = (it.next(), it.next()) else {
            return Err(MemoryError::InvalidStage(format!("$group field {field} needs exactly one accumulator")));
        };
        if !ACCUMULATORS.contains(&op.as_str()) {
            return Err(MemoryError::UnknownOperator(op.clone()));
        }
        check_expr(operand)?;
        accs.push((field.clone(), op.as_str(), operand));
    }

    let mut groups: Vec<(Bson, Vec<Document>)> = Vec::new();
    for d in docs {
        let key = resolve(&d, id_expr)?.unwrap_or(Bson::Null);
        match groups.iter_mut().find(|(k, _)| bson_eq(k, &key)) {
            Some((_, members)) => members.push(d),
            None => groups.push((key, vec![d])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut row = Document::new();
        row.insert("_id", key);
        for (field, op, operand) in &accs {
            let edge = |d: Option<&Document>| -> Result<Bson, MemoryError> {
                Ok(match d {
                    Some(d) => resolve(d, operand)?.unwrap_or(Bson::Null),
                    None => Bson::Null,
                })
            };
            let value = match *op {
                "$first" => edge(members.first())?,
                "$last" => edge(members.last())?,
                _ => {
                    let mut values = Vec::with_capacity(members.len());
                    for d in &members {
                        values.extend(resolve(d, operand)?);
                    }
                    match *op {
                        "$sum" => sum(values.into_iter()),
                        "$avg" => avg(values.into_iter()),
                        "$min" => values.into_iter().min_by(|a, b| compare_bson(a, b, ignore_case)).unwrap_or(Bson::Null),
                        "$max" => values.into_iter().max_by(|a, b| compare_bson(a, b, ignore_case)).unwrap_or(Bson::Null),
                        _ => Bson::Array(values),
                    }
                }
            };
            row.insert(field.clone(), value);
        }
        out.push(row);
    }
    Ok(out)
}

// Integer sums stay integral (Int32 when they fit); any double makes the sum a double.
#[allow(clippy::cast_precision_loss)]
fn sum(values: impl Iterator<Item = Bson>) -> Bson {
    let mut ints: i64 = 0;
    let mut floats: Option<f64> = None;
    for v in values {
        match v {
            Bson::Int32(i) => ints = ints.saturating_add(i64::from(i)),
            Bson::Int64(i) => ints = ints.saturating_add(i),
            Bson::Double(f) => *floats.get_or_insert(0.0) += f,
            _ => {}
        }
    }
    match floats {
        Some(f) => Bson::Double(f + ints as f64),
        None => i32::try_from(ints).map_or(Bson::Int64(ints), Bson::Int32),
    }
}

#[allow(clippy::cast_precision_loss)]
fn avg(values: impl Iterator<Item = Bson>) -> Bson {
    let (total, n) = values.fold((0.0_f64, 0u32), |(t, n), v| match v {
        Bson::Int32(i) => (t + f64::from(i), n + 1),
        Bson::Int64(i) => (t + i as f64, n + 1),
        Bson::Double(f) => (t + f, n + 1),
        _ => (t, n),
    });
    if n == 0 { Bson::Null } else { Bson::Double(total / f64::from(n)) }
}
