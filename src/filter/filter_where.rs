use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{Condition, FilterOp};

/// Compiles a `Filter` into a WHERE clause over a `doc jsonb` column.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(filter: &Filter, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        filter.validate()?;
        let mut filter_where = Self::new(starting_param_index);
        let mut sql_conditions = vec![];
        for condition in filter.conditions() {
            sql_conditions.push(filter_where.build_sql_condition(condition));
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, filter_where.param_values))
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> String {
        // Field names are validated identifiers, so inlining them as literals is safe
        let path = format!("doc -> '{}'", condition.field);
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    format!("({} IS NULL OR {} = 'null'::jsonb)", path, path)
                } else {
                    format!("{} = {}", path, self.param(condition.data.clone()))
                }
            }
            FilterOp::In => match &condition.data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                    format!("{} IN ({})", path, params.join(", "))
                }
                other => format!("{} = {}", path, self.param(other.clone())),
            },
            FilterOp::Contains => {
                let wrapped = Value::Array(vec![condition.data.clone()]);
                format!("{} @> {}", path, self.param(wrapped))
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::jsonb", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_is_tautology() {
        let (sql, params) = FilterWhere::generate(&Filter::new(), 0).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn numbers_parameters_after_offset() {
        let filter = Filter::new().eq("owner", "u1").is_in("title", ["a", "b"]);
        let (sql, params) = FilterWhere::generate(&filter, 1).unwrap();
        assert_eq!(sql, "doc -> 'owner' = $2::jsonb AND doc -> 'title' IN ($3::jsonb, $4::jsonb)");
        assert_eq!(params, vec![json!("u1"), json!("a"), json!("b")]);
    }

    #[test]
    fn contains_wraps_value_in_array() {
        let (sql, params) = FilterWhere::generate(&Filter::new().contains("shared", "u2"), 0).unwrap();
        assert_eq!(sql, "doc -> 'shared' @> $1::jsonb");
        assert_eq!(params, vec![json!(["u2"])]);
    }

    #[test]
    fn null_and_empty_membership() {
        let (sql, _) = FilterWhere::generate(&Filter::new().eq("x", Value::Null), 0).unwrap();
        assert_eq!(sql, "(doc -> 'x' IS NULL OR doc -> 'x' = 'null'::jsonb)");
        let (sql, params) = FilterWhere::generate(&Filter::new().is_in("x", Vec::<Value>::new()), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn invalid_field_is_rejected() {
        assert!(FilterWhere::generate(&Filter::new().eq("x' OR 1=1 --", 1), 0).is_err());
    }
}
