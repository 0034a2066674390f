//! Pure derivation of field descriptors and portable schemas from an input schema.
//!
//! The input schema is itself a JSON value shaped like a (loose) JSON Schema
//! object: `{"type": "object", "properties": {name: schema, ...}, "required": [...]}`.
//! Derivation never performs IO and is referentially transparent: the same
//! schema value always yields the same sequence of descriptors.

use serde_json::{Map, Value};

use crate::error::{SchemaError, ValidationError};

/// The primitive or structural type a field resolves to after unwrapping
/// `optional`/`default`/`nullable` wrapper markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
    Object,
    File,
    Unknown,
}

/// UI metadata attached to a field, either parsed from a JSON-object
/// `description`, or synthesized (a plain-string `description` becomes the
/// `label`).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UiHints {
    /// Display label; defaults to a title-cased derivation of the field name.
    pub label: Option<String>,
    /// Any other hint keys carried verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One field of a derived input schema.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub default_value: Option<Value>,
    pub enum_values: Option<Vec<Value>>,
    pub array_item_type: Option<FieldType>,
    pub object_fields: Option<Vec<FieldDescriptor>>,
    pub ui_hints: Option<UiHints>,
}

/// Traverse an object-like input schema and derive an ordered sequence of
/// field descriptors, one per top-level property.
///
/// Unwraps `optional`, `default`, and `nullable` wrapper shapes (schemas of
/// the form `{"type": "optional", "inner": <schema>}` etc.) to their
/// underlying type, forcing `required = false` in the process. Description
/// text that parses as a JSON object becomes the hints structure verbatim;
/// any other description string becomes the `label` hint.
pub fn derive_fields(input_schema: &Value) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let obj = input_schema
        .as_object()
        .ok_or_else(|| SchemaError::UnrecognizedShape("input schema is not an object".into()))?;
    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::UnrecognizedShape("input schema has no properties map".into()))?;
    let required: std::collections::HashSet<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, field_schema)| derive_field(name, field_schema, required.contains(name.as_str())))
        .collect()
}

fn derive_field(name: &str, schema: &Value, declared_required: bool) -> Result<FieldDescriptor, SchemaError> {
    let (inner, forced_optional) = unwrap_modifiers(schema);
    let obj = inner
        .as_object()
        .ok_or_else(|| SchemaError::UnrecognizedShape(format!("field {name} is not an object schema")))?;

    let field_type = resolve_type(obj);
    let default_value = obj.get("default").cloned();
    let enum_values = obj.get("enum").and_then(Value::as_array).cloned();
    let array_item_type = if field_type == FieldType::Array {
        obj.get("items")
            .and_then(Value::as_object)
            .map(resolve_type)
    } else {
        None
    };
    let object_fields = if field_type == FieldType::Object {
        let nested_required: std::collections::HashSet<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        obj.get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(n, s)| derive_field(n, s, nested_required.contains(n.as_str())))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
    } else {
        None
    };

    let ui_hints = derive_hints(name, obj.get("description"));

    Ok(FieldDescriptor {
        name: name.to_string(),
        field_type,
        required: declared_required && !forced_optional && default_value.is_none(),
        default_value,
        enum_values,
        array_item_type,
        object_fields,
        ui_hints,
    })
}

/// Peel `optional`/`default`/`nullable` wrapper shapes off a schema,
/// returning the innermost schema and whether any wrapper was present.
fn unwrap_modifiers(schema: &Value) -> (&Value, bool) {
    let mut current = schema;
    let mut unwrapped = false;
    loop {
        match current.get("type").and_then(Value::as_str) {
            Some("optional") | Some("default") | Some("nullable") => {
                unwrapped = true;
                match current.get("inner") {
                    Some(inner) => current = inner,
                    None => break,
                }
            }
            _ => break,
        }
    }
    (current, unwrapped)
}

fn resolve_type(obj: &Map<String, Value>) -> FieldType {
    if obj.contains_key("enum") {
        return FieldType::Enum;
    }
    match obj.get("type").and_then(Value::as_str) {
        Some("string") => FieldType::String,
        Some("number") | Some("integer") => FieldType::Number,
        Some("boolean") => FieldType::Boolean,
        Some("array") => FieldType::Array,
        Some("object") => FieldType::Object,
        Some("file") => FieldType::File,
        _ => FieldType::Unknown,
    }
}

fn derive_hints(field_name: &str, description: Option<&Value>) -> Option<UiHints> {
    match description {
        Some(Value::Object(map)) => {
            let mut hints: UiHints = serde_json::from_value(Value::Object(map.clone())).ok()?;
            if hints.label.is_none() {
                hints.label = Some(default_label(field_name));
            }
            Some(hints)
        }
        Some(Value::String(s)) => Some(UiHints {
            label: Some(s.clone()),
            extra: Map::new(),
        }),
        _ => Some(UiHints {
            label: Some(default_label(field_name)),
            extra: Map::new(),
        }),
    }
}

/// Split camelCase and snake/kebab-case boundaries, then title-case each word.
fn default_label(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
        prev_lower = ch.is_lowercase();
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => w,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive a JSON-schema-like tree suitable for wire protocols (e.g. MCP tool
/// definitions): `{type, properties, required, items, enum, default}`.
pub fn to_portable_schema(input_schema: &Value) -> Result<Value, SchemaError> {
    let fields = derive_fields(input_schema)?;
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &fields {
        properties.insert(field.name.clone(), field_to_portable(field));
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
    }

    Ok(serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

fn field_to_portable(field: &FieldDescriptor) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), Value::String(field_type_name(field.field_type).into()));
    if let Some(default) = &field.default_value {
        out.insert("default".into(), default.clone());
    }
    if let Some(values) = &field.enum_values {
        out.insert("enum".into(), Value::Array(values.clone()));
    }
    if let Some(item_type) = field.array_item_type {
        out.insert(
            "items".into(),
            serde_json::json!({"type": field_type_name(item_type)}),
        );
    }
    if let Some(object_fields) = &field.object_fields {
        let mut props = Map::new();
        let mut req = Vec::new();
        for f in object_fields {
            props.insert(f.name.clone(), field_to_portable(f));
            if f.required {
                req.push(Value::String(f.name.clone()));
            }
        }
        out.insert("properties".into(), Value::Object(props));
        out.insert("required".into(), Value::Array(req));
    }
    Value::Object(out)
}

fn field_type_name(t: FieldType) -> &'static str {
    match t {
        FieldType::String => "string",
        FieldType::Number => "number",
        FieldType::Boolean => "boolean",
        FieldType::Enum => "string",
        FieldType::Array => "array",
        FieldType::Object => "object",
        FieldType::File => "string",
        FieldType::Unknown => "unknown",
    }
}

/// Validate raw input against an input schema's derived fields, applying
/// defaults for missing optional fields. Used by the Orchestrator during
/// `PRE_FLIGHT`.
pub fn validate_input(input_schema: &Value, raw: &Value) -> Result<Value, ValidationError> {
    let fields =
        derive_fields(input_schema).map_err(|e| ValidationError::Other(Box::new(e)))?;
    let raw_obj = raw.as_object().cloned().unwrap_or_default();
    let mut validated = Map::new();

    for field in &fields {
        match raw_obj.get(&field.name) {
            Some(value) => {
                check_type(field, value)?;
                validated.insert(field.name.clone(), value.clone());
            }
            None => {
                if let Some(default) = &field.default_value {
                    validated.insert(field.name.clone(), default.clone());
                } else if field.required {
                    return Err(ValidationError::MissingField(field.name.clone()));
                }
            }
        }
    }

    Ok(Value::Object(validated))
}

fn check_type(field: &FieldDescriptor, value: &Value) -> Result<(), ValidationError> {
    let matches = match field.field_type {
        FieldType::String | FieldType::File => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
        FieldType::Enum => {
            let allowed = field.enum_values.as_deref().unwrap_or_default();
            allowed.contains(value)
        }
        FieldType::Unknown => true,
    };
    if matches {
        Ok(())
    } else {
        if field.field_type == FieldType::Enum {
            return Err(ValidationError::NotInEnum {
                field: field.name.clone(),
            });
        }
        Err(ValidationError::TypeMismatch {
            field: field.name.clone(),
            expected: format!("{:?}", field.field_type),
            got: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["a", "op"],
            "properties": {
                "a": {"type": "number", "description": "First operand"},
                "b": {"type": "optional", "inner": {"type": "number"}},
                "op": {"type": "string", "enum": ["add", "sub", "mul", "div"]},
            }
        })
    }

    #[test]
    fn derives_required_and_optional_fields() {
        let fields = derive_fields(&schema()).unwrap();
        let a = fields.iter().find(|f| f.name == "a").unwrap();
        assert!(a.required);
        assert_eq!(a.field_type, FieldType::Number);
        assert_eq!(a.ui_hints.as_ref().unwrap().label.as_deref(), Some("First operand"));

        let b = fields.iter().find(|f| f.name == "b").unwrap();
        assert!(!b.required);
        assert_eq!(b.field_type, FieldType::Number);
    }

    #[test]
    fn default_label_splits_camel_and_snake_case() {
        assert_eq!(default_label("firstName"), "First Name");
        assert_eq!(default_label("first_name"), "First Name");
        assert_eq!(default_label("first-name"), "First Name");
    }

    #[test]
    fn derivation_is_deterministic() {
        let s = schema();
        let first = derive_fields(&s).unwrap();
        let second = derive_fields(&s).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn portable_schema_lists_required_fields() {
        let portable = to_portable_schema(&schema()).unwrap();
        let required = portable["required"].as_array().unwrap();
        assert!(required.contains(&Value::String("a".into())));
        assert!(required.contains(&Value::String("op".into())));
        assert!(!required.contains(&Value::String("b".into())));
    }

    #[test]
    fn validate_input_accepts_well_typed_value() {
        let raw = serde_json::json!({"a": 10, "b": 5, "op": "add"});
        let validated = validate_input(&schema(), &raw).unwrap();
        assert_eq!(validated["a"], 10);
        assert_eq!(validated["op"], "add");
    }

    #[test]
    fn validate_input_rejects_missing_required_field() {
        let raw = serde_json::json!({"a": 10});
        let err = validate_input(&schema(), &raw).unwrap_err();
        matches!(err, ValidationError::MissingField(ref f) if f == "op");
    }

    #[test]
    fn validate_input_rejects_value_outside_enum() {
        let raw = serde_json::json!({"a": 10, "op": "xor"});
        let err = validate_input(&schema(), &raw).unwrap_err();
        assert!(matches!(err, ValidationError::NotInEnum { .. }));
    }
}
