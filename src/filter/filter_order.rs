use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::filter::validate_field_name;
use super::types::{SortDirection, SortSpec};

pub struct FilterOrder;

impl FilterOrder {
    /// ORDER BY clause for the JSONB backend. Ties fall back to insertion order.
    pub fn generate(sort: Option<&SortSpec>) -> Result<String, FilterError> {
        match sort {
            None => Ok("ORDER BY seq ASC".to_string()),
            Some(spec) => {
                validate_field_name(&spec.field)?;
                Ok(format!(
                    "ORDER BY doc -> '{}' {} {}, seq ASC",
                    spec.field,
                    spec.direction.to_sql(),
                    spec.direction.nulls_sql()
                ))
            }
        }
    }

    /// Stable in-place sort; documents that compare equal keep their natural order.
    pub fn sort(docs: &mut [Map<String, Value>], spec: &SortSpec) {
        docs.sort_by(|a, b| {
            let ord = compare_values(
                a.get(&spec.field).unwrap_or(&Value::Null),
                b.get(&spec.field).unwrap_or(&Value::Null),
            );
            match spec.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}

/// Total order over JSON values, following jsonb: null < string < number < bool < array < object.
/// Arrays and objects compare by length first.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return x.len().cmp(&y.len());
            }
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values.into_iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    #[test]
    fn sorts_numbers_numerically() {
        let mut d = docs(vec![json!({"n": 10}), json!({"n": 2}), json!({"n": 2.5})]);
        FilterOrder::sort(&mut d, &SortSpec::asc("n"));
        let ns: Vec<f64> = d.iter().map(|m| m["n"].as_f64().unwrap()).collect();
        assert_eq!(ns, vec![2.0, 2.5, 10.0]);
    }

    #[test]
    fn descending_sort_is_stable_for_ties() {
        let mut d = docs(vec![
            json!({"k": 1, "tag": "first"}),
            json!({"k": 2, "tag": "top"}),
            json!({"k": 1, "tag": "second"}),
        ]);
        FilterOrder::sort(&mut d, &SortSpec::desc("k"));
        let tags: Vec<&str> = d.iter().map(|m| m["tag"].as_str().unwrap()).collect();
        assert_eq!(tags, vec!["top", "first", "second"]);
    }

    #[test]
    fn missing_fields_sort_first_ascending() {
        let mut d = docs(vec![json!({"s": "b"}), json!({}), json!({"s": "a"})]);
        FilterOrder::sort(&mut d, &SortSpec::asc("s"));
        assert!(d[0].get("s").is_none());
        assert_eq!(d[1]["s"], "a");
    }

    #[test]
    fn missing_fields_sort_last_descending() {
        let mut d = docs(vec![json!({}), json!({"s": "a"}), json!({"s": "b"})]);
        FilterOrder::sort(&mut d, &SortSpec::desc("s"));
        assert_eq!(d[0]["s"], "b");
        assert!(d[2].get("s").is_none());
    }

    #[test]
    fn mixed_types_rank_like_jsonb() {
        let mut d = docs(vec![
            json!({"v": true}),
            json!({"v": [1, 2]}),
            json!({"v": 3}),
            json!({"v": "x"}),
            json!({"v": [9]}),
            json!({"v": null}),
        ]);
        FilterOrder::sort(&mut d, &SortSpec::asc("v"));
        let vs: Vec<Value> = d.iter().map(|m| m["v"].clone()).collect();
        assert_eq!(vs, vec![json!(null), json!("x"), json!(3), json!(true), json!([9]), json!([1, 2])]);
    }

    #[test]
    fn generates_order_clause() {
        assert_eq!(FilterOrder::generate(None).unwrap(), "ORDER BY seq ASC");
        assert_eq!(
            FilterOrder::generate(Some(&SortSpec::desc("dateCreated"))).unwrap(),
            "ORDER BY doc -> 'dateCreated' DESC NULLS LAST, seq ASC"
        );
        assert_eq!(
            FilterOrder::generate(Some(&SortSpec::asc("title"))).unwrap(),
            "ORDER BY doc -> 'title' ASC NULLS FIRST, seq ASC"
        );
        assert!(FilterOrder::generate(Some(&SortSpec::asc("a;b"))).is_err());
    }
}
