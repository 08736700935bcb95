use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::middleware::SessionHandle;
use crate::router::handler::Param;
use crate::types::{Category, Id};
use crate::validation::{as_number, Violation};

/// Arguments bound for one handler invocation
#[derive(Debug, Clone, Default)]
pub struct Call {
    args: Map<String, Value>,
    session: Option<SessionHandle>,
}

impl Call {
    pub fn new(args: Map<String, Value>, session: Option<SessionHandle>) -> Self {
        Self { args, session }
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    /// The caller's session. Only present when the handler declared it.
    pub fn session(&self) -> Result<&SessionHandle, ApiError> {
        self.session
            .as_ref()
            .ok_or_else(|| ApiError::internal_server_error("Handler did not declare a session"))
    }

    pub fn string(&self, name: &str) -> Result<String, ApiError> {
        self.opt_string(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing parameter '{}'", name)))
    }

    /// Strings, numbers and booleans all read as text
    pub fn opt_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn id(&self, name: &str) -> Result<Id, ApiError> {
        let raw = self.string(name)?;
        raw.parse()
            .map_err(|_| ApiError::bad_request(format!("Parameter '{}' is not a valid id: {}", name, raw)))
    }

    pub fn number(&self, name: &str) -> Result<f64, ApiError> {
        self.get(name)
            .and_then(as_number)
            .ok_or_else(|| ApiError::bad_request(format!("Parameter '{}' must be a number", name)))
    }

    pub fn integer(&self, name: &str) -> Result<i64, ApiError> {
        let n = self.number(name)?;
        if n.fract() != 0.0 {
            return Err(ApiError::bad_request(format!("Parameter '{}' must be an integer", name)));
        }
        Ok(n as i64)
    }

    /// Category by name; absent means the default category
    pub fn category(&self, name: &str) -> Result<Category, ApiError> {
        match self.opt_string(name) {
            Some(raw) => raw.parse().map_err(ApiError::bad_request),
            None => Ok(Category::default()),
        }
    }

    /// Deserialize an optional structured input
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        self.get(name)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(|e| ApiError::bad_request(format!("Parameter '{}' is malformed: {}", name, e)))
    }
}

/// GET and HEAD carry their inputs in the query string; everything else in the body
pub fn reads_query(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Query parameters as string values. A repeated key keeps its last value.
pub fn parse_query(query: Option<&str>) -> Map<String, Value> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect()
        })
        .unwrap_or_default()
}

/// A JSON object body. Empty means no inputs.
pub fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::invalid_json("Request body must be a JSON object")),
        Err(e) => Err(ApiError::invalid_json(format!("Malformed JSON body: {}", e))),
    }
}

/// Assemble handler arguments: path parameters win over inputs of the same name,
/// every required input must be present and undeclared inputs are dropped.
pub fn reconcile(
    path_params: Vec<(String, String)>,
    mut inputs: Map<String, Value>,
    declared: &[Param],
) -> Result<Map<String, Value>, ApiError> {
    let mut args = Map::new();

    for param in declared {
        if let Some(value) = inputs.remove(&param.name) {
            args.insert(param.name.clone(), value);
        }
    }
    for (name, value) in path_params {
        args.insert(name, Value::String(value));
    }

    let missing: Vec<Violation> = declared
        .iter()
        .filter(|p| p.required && args.get(&p.name).map_or(true, Value::is_null))
        .map(|p| Violation {
            field: p.name.clone(),
            message: "is required".to_string(),
        })
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::validation_error("Missing required parameters", missing));
    }

    if !inputs.is_empty() {
        tracing::debug!("Dropping undeclared inputs: {:?}", inputs.keys().collect::<Vec<_>>());
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declared(required: &[&str], optional: &[&str]) -> Vec<Param> {
        required
            .iter()
            .map(|n| Param { name: n.to_string(), required: true })
            .chain(optional.iter().map(|n| Param { name: n.to_string(), required: false }))
            .collect()
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn path_parameters_take_precedence() {
        let args = reconcile(
            vec![("id".to_string(), "from-path".to_string())],
            map(json!({"id": "from-body", "content": "hi"})),
            &declared(&["content"], &[]),
        )
        .unwrap();
        assert_eq!(args["id"], json!("from-path"));
        assert_eq!(args["content"], json!("hi"));
    }

    #[test]
    fn missing_required_inputs_are_all_reported() {
        let err = reconcile(vec![], map(json!({"title": null})), &declared(&["title", "day"], &["note"])).unwrap_err();
        match err {
            ApiError::ValidationError { violations, .. } => {
                let names: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(names, vec!["title", "day"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn undeclared_inputs_are_dropped() {
        let args = reconcile(vec![], map(json!({"title": "T", "admin": true})), &declared(&["title"], &[])).unwrap();
        assert_eq!(args.len(), 1);
        assert!(args.get("admin").is_none());
    }

    #[test]
    fn body_parsing() {
        assert!(parse_body(b"").unwrap().is_empty());
        assert!(parse_body(b"  \n").unwrap().is_empty());
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap()["a"], json!(1));
        assert!(matches!(parse_body(b"[1,2]"), Err(ApiError::InvalidJson(_))));
        assert!(matches!(parse_body(b"{oops"), Err(ApiError::InvalidJson(_))));
    }

    #[test]
    fn query_parsing_decodes_values() {
        let q = parse_query(Some("author=jane%20doe&user=1&user=2"));
        assert_eq!(q["author"], json!("jane doe"));
        assert_eq!(q["user"], json!("2"));
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn typed_accessors() {
        let id = Id::new();
        let call = Call::new(
            map(json!({"id": id.to_string(), "day": "12", "category": "Entertainment", "bad": "x"})),
            None,
        );
        assert_eq!(call.id("id").unwrap(), id);
        assert_eq!(call.integer("day").unwrap(), 12);
        assert_eq!(call.category("category").unwrap(), Category::Entertainment);
        assert_eq!(call.category("missing").unwrap(), Category::Lifestyle);
        assert!(call.id("bad").is_err());
        assert!(call.string("missing").is_err());
        assert!(call.session().is_err());
    }
}
