use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// One failed constraint on one input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    String { min_len: Option<usize> },
    Number { integer: bool },
    Boolean,
    Id,
    OneOf(Vec<String>),
    Object(Schema),
}

/// Constraint on a single field value
#[derive(Debug, Clone)]
pub struct Rule {
    kind: Kind,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl Rule {
    fn of(kind: Kind) -> Self {
        Self { kind, minimum: None, maximum: None }
    }

    pub fn string() -> Self {
        Self::of(Kind::String { min_len: None })
    }

    pub fn number() -> Self {
        Self::of(Kind::Number { integer: false })
    }

    pub fn integer() -> Self {
        Self::of(Kind::Number { integer: true })
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// UUID-formatted string
    pub fn id() -> Self {
        Self::of(Kind::Id)
    }

    pub fn one_of<S: AsRef<str>>(values: &[S]) -> Self {
        Self::of(Kind::OneOf(values.iter().map(|v| v.as_ref().to_string()).collect()))
    }

    pub fn object(schema: Schema) -> Self {
        Self::of(Kind::Object(schema))
    }

    pub fn min_len(mut self, len: usize) -> Self {
        if let Kind::String { min_len } = &mut self.kind {
            *min_len = Some(len);
        }
        self
    }

    /// Inclusive numeric bounds
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn check(&self, field: &str, value: &Value, out: &mut Vec<Violation>) {
        match &self.kind {
            Kind::String { min_len } => match value.as_str() {
                Some(s) => {
                    if let Some(min) = min_len {
                        if s.chars().count() < *min {
                            out.push(Violation::new(field, format!("must be at least {} characters", min)));
                        }
                    }
                }
                None => out.push(Violation::new(field, "must be a string")),
            },
            Kind::Number { integer } => match as_number(value) {
                Some(n) => {
                    if *integer && n.fract() != 0.0 {
                        out.push(Violation::new(field, "must be an integer"));
                    }
                    if let Some(min) = self.minimum {
                        if n < min {
                            out.push(Violation::new(field, format!("must be >= {}", min)));
                        }
                    }
                    if let Some(max) = self.maximum {
                        if n > max {
                            out.push(Violation::new(field, format!("must be <= {}", max)));
                        }
                    }
                }
                None => out.push(Violation::new(field, "must be a number")),
            },
            Kind::Boolean => {
                if as_bool(value).is_none() {
                    out.push(Violation::new(field, "must be a boolean"));
                }
            }
            Kind::Id => {
                if value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()).is_none() {
                    out.push(Violation::new(field, "must be a valid id"));
                }
            }
            Kind::OneOf(allowed) => {
                if !value.as_str().map_or(false, |s| allowed.iter().any(|a| a == s)) {
                    out.push(Violation::new(field, format!("must be one of: {}", allowed.join(", "))));
                }
            }
            Kind::Object(schema) => match value.as_object() {
                Some(obj) => schema.collect(obj, Some(field), out),
                None => out.push(Violation::new(field, "must be an object")),
            },
        }
    }
}

/// Numbers may arrive as JSON numbers or as numeric strings from query strings and forms
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    rule: Rule,
    required: bool,
}

/// Declarative shape of a request's non-path inputs. Fields not named here are ignored.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, rule: Rule) -> Self {
        self.fields.push(FieldRule { name: name.to_string(), rule, required: true });
        self
    }

    pub fn optional(mut self, name: &str, rule: Rule) -> Self {
        self.fields.push(FieldRule { name: name.to_string(), rule, required: false });
        self
    }

    /// Check every field, reporting all violations rather than only the first
    pub fn validate(&self, input: &Map<String, Value>) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        self.collect(input, None, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn collect(&self, input: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<Violation>) {
        for field in &self.fields {
            let path = match prefix {
                Some(p) => format!("{}.{}", p, field.name),
                None => field.name.clone(),
            };
            match input.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        out.push(Violation::new(&path, "is required"));
                    }
                }
                Some(value) => field.rule.check(&path, value, out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use serde_json::json;

    fn input(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_valid_input_and_ignores_unknown_fields() {
        let schema = Schema::new()
            .required("title", Rule::string().min_len(1))
            .required("day", Rule::integer().range(0.0, 364.0))
            .optional("author", Rule::string());
        assert!(schema.validate(&input(json!({"title": "Run", "day": 12, "extra": true}))).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let schema = Schema::new()
            .required("title", Rule::string().min_len(1))
            .required("day", Rule::integer().range(0.0, 364.0))
            .required("category", Rule::one_of(Category::NAMES));
        let errs = schema
            .validate(&input(json!({"title": "", "day": 400, "category": "Root"})))
            .unwrap_err();
        let fields: Vec<&str> = errs.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "day", "category"]);
    }

    #[test]
    fn missing_and_null_required_fields_fail() {
        let schema = Schema::new().required("username", Rule::string());
        assert!(schema.validate(&Map::new()).is_err());
        assert!(schema.validate(&input(json!({"username": null}))).is_err());
        let optional = Schema::new().optional("author", Rule::string());
        assert!(optional.validate(&Map::new()).is_ok());
    }

    #[test]
    fn numeric_and_boolean_strings_are_accepted() {
        let schema = Schema::new()
            .required("day", Rule::integer().range(0.0, 364.0))
            .required("flag", Rule::boolean());
        assert!(schema.validate(&input(json!({"day": "7", "flag": "true"}))).is_ok());
        assert!(schema.validate(&input(json!({"day": "7.5", "flag": "yes"}))).is_err());
    }

    #[test]
    fn nested_objects_and_ids() {
        let schema = Schema::new()
            .required("post", Rule::id())
            .optional("options", Rule::object(Schema::new().optional("backgroundColor", Rule::string())));
        let ok = json!({"post": Uuid::new_v4().to_string(), "options": {"backgroundColor": "red"}});
        assert!(schema.validate(&input(ok)).is_ok());

        let errs = schema
            .validate(&input(json!({"post": "abc", "options": {"backgroundColor": 3}})))
            .unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[1].field, "options.backgroundColor");
    }
}
