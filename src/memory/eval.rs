use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::utils::num::bson_to_i64;

use super::MemoryError;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_SORT_FIELDS: usize = 32;

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut segs = 0usize;
    while let Some(part) = parts.next() {
        segs += 1;
        if segs > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Total order over BSON values: numbers compare numerically across types,
/// strings lexically (optionally case-folded), everything else by type rank.
pub(crate) fn compare_bson(a: &Bson, b: &Bson, ignore_case: bool) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) if ignore_case => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

pub(crate) fn bson_eq(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return compare_bson(a, b, false) == Ordering::Equal;
    }
    a == b
}

// Mongo's cross-type sort order; numbers share a rank.
fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 255,
    }
}

/// Checks a sort spec before it reaches [`compare_docs`]: every direction
/// must be `1`, `-1` or a `{"$meta": ...}` document.
pub(crate) fn validate_sort(sort: &Document) -> Result<(), MemoryError> {
    if sort.len() > MAX_SORT_FIELDS {
        return Err(MemoryError::InvalidSort(format!("at most {MAX_SORT_FIELDS} sort keys are allowed")));
    }
    for (field, dir) in sort {
        match dir {
            Bson::Document(meta) if meta.len() == 1 && meta.contains_key("$meta") => {}
            other if matches!(bson_to_i64(other), Some(1 | -1)) => {}
            other => return Err(MemoryError::InvalidSort(format!("bad direction for {field}: {other}"))),
        }
    }
    Ok(())
}

/// Orders two documents by an ordered sort spec (`{"a": 1, "b": -1}`).
/// `$meta` keys have no meaning without a text index and compare equal.
pub(crate) fn compare_docs(a: &Document, b: &Document, sort: &Document, ignore_case: bool) -> Ordering {
    for (field, dir) in sort.iter().take(MAX_SORT_FIELDS) {
        let desc = match bson_to_i64(dir) {
            Some(1) => false,
            Some(-1) => true,
            _ => continue,
        };
        let ord = match (get_path(a, field), get_path(b, field)) {
            (Some(x), Some(y)) => compare_bson(x, y, ignore_case),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if desc { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

fn projection_flag(field: &str, v: &Bson) -> Result<bool, MemoryError> {
    if field.is_empty() || field.starts_with('$') || field.contains('.') {
        return Err(MemoryError::InvalidProjection(format!("unsupported field path {field:?}")));
    }
    match v {
        Bson::Boolean(b) => Ok(*b),
        n if is_num(n) => Ok(as_f64_num(n) != 0.0),
        other => Err(MemoryError::InvalidProjection(format!("unsupported value for {field}: {other}"))),
    }
}

/// Applies a projection document of `0`/`1` (or boolean) flags on top-level
/// fields.
///
/// Inclusion (`{"name": 1}`) keeps the listed fields plus `_id` unless
/// `_id: 0`; a projection whose non-`_id` fields are all `0` excludes them
/// instead. Computed fields, nested paths and mixed inclusion/exclusion are
/// errors.
pub(crate) fn project(doc: &Document, projection: &Document) -> Result<Document, MemoryError> {
    let mut keep_id = true;
    let mut fields = Vec::with_capacity(projection.len());
    for (k, v) in projection {
        let flag = projection_flag(k, v)?;
        if k == "_id" {
            keep_id = flag;
        } else {
            fields.push((k.as_str(), flag));
        }
    }
    let exclusion = match fields.first() {
        Some((_, flag)) => !flag,
        None => !(keep_id && projection.contains_key("_id")),
    };
    if let Some((k, _)) = fields.iter().find(|(_, flag)| *flag == exclusion) {
        return Err(MemoryError::InvalidProjection(format!("cannot mix inclusion and exclusion (at {k})")));
    }
    if exclusion {
        let mut out = doc.clone();
        for (k, _) in &fields {
            out.remove(*k);
        }
        if !keep_id {
            out.remove("_id");
        }
        return Ok(out);
    }
    let mut out = Document::new();
    for (k, v) in doc {
        let wanted = if k == "_id" { keep_id } else { fields.iter().any(|(f, _)| *f == k.as_str()) };
        if wanted {
            out.insert(k.clone(), v.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn dotted_paths_resolve() {
        let d = doc! {"a": {"b": {"c": 3}}, "x": 1};
        assert_eq!(get_path(&d, "a.b.c"), Some(&Bson::Int32(3)));
        assert_eq!(get_path(&d, "x.y"), None);
        assert_eq!(get_path(&d, ""), None);
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(bson_eq(&Bson::Int32(5), &Bson::Int64(5)));
        assert!(bson_eq(&Bson::Double(5.0), &Bson::Int32(5)));
        assert_eq!(compare_bson(&Bson::Int32(2), &Bson::Double(2.5), false), Ordering::Less);
    }

    #[test]
    fn case_folding_only_when_asked() {
        let a = Bson::String("apple".into());
        let b = Bson::String("Banana".into());
        assert_eq!(compare_bson(&a, &b, false), Ordering::Greater);
        assert_eq!(compare_bson(&a, &b, true), Ordering::Less);
    }

    #[test]
    fn multi_key_sort_falls_through() {
        let sort = doc! {"g": 1, "v": -1};
        let a = doc! {"g": 1, "v": 1};
        let b = doc! {"g": 1, "v": 2};
        assert_eq!(compare_docs(&a, &b, &sort, false), Ordering::Greater);
        let meta_only = doc! {"score": {"$meta": "textScore"}};
        assert!(validate_sort(&meta_only).is_ok());
        assert_eq!(compare_docs(&a, &b, &meta_only, false), Ordering::Equal);
    }

    #[test]
    fn odd_sort_directions_are_rejected() {
        assert!(validate_sort(&doc! {"a": 1, "b": -1.0}).is_ok());
        for bad in [doc! {"a": 2}, doc! {"a": "asc"}, doc! {"a": 1, "b": 0}, doc! {"a": {"$natural": 1}}] {
            assert!(matches!(validate_sort(&bad), Err(MemoryError::InvalidSort(_))), "{bad}");
        }
        let wide: Document = (0..=MAX_SORT_FIELDS).map(|i| (format!("f{i}"), Bson::Int32(1))).collect();
        assert!(validate_sort(&wide).is_err());
    }

    #[test]
    fn inclusion_and_exclusion_projections() {
        let d = doc! {"_id": 1, "name": "x", "qty": 2, "price": 3};
        assert_eq!(project(&d, &doc! {"name": 1}).unwrap(), doc! {"_id": 1, "name": "x"});
        assert_eq!(project(&d, &doc! {"name": true, "_id": 0}).unwrap(), doc! {"name": "x"});
        assert_eq!(project(&d, &doc! {"price": 0}).unwrap(), doc! {"_id": 1, "name": "x", "qty": 2});
        assert_eq!(project(&d, &doc! {"_id": 0}).unwrap(), doc! {"name": "x", "qty": 2, "price": 3});
        assert_eq!(project(&d, &doc! {"_id": 1}).unwrap(), doc! {"_id": 1});
    }

    #[test]
    fn unsupported_projections_are_rejected() {
        let d = doc! {"_id": 1, "a": 5, "secret": "x"};
        for bad in [
            doc! {"alias": "$a"},
            doc! {"total": {"$add": ["$a", 1]}},
            doc! {"a": 1, "secret": 0},
            doc! {"a.b": 1},
            doc! {"a": Bson::Null},
        ] {
            assert!(matches!(project(&d, &bad), Err(MemoryError::InvalidProjection(_))), "{bad}");
        }
    }
}
