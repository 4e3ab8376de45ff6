//! Opt-in, best-effort coercion of instance values to the types their schema declares.
//!
//! This is useful when validating data that comes from a format with a weaker type system
//! than JSON, such as query strings, environment variables, or CSV cells, where every leaf
//! value arrives as a string. Coercion is never performed implicitly during validation; it is
//! a separate pass a caller runs explicitly via [`crate::Validator::apply_coercion`] and is only
//! active once [`crate::ValidationOptions::with_coercion`] has been called.
//!
//! Coercion walks the raw schema `Value` alongside the instance and recurses through
//! `properties`, `additionalProperties`, `prefixItems`, `items` (both the 2020-12 single-schema
//! form and the legacy tuple-array form) and the composition branches (`allOf`/`anyOf`/`oneOf`).
//! `$ref`/`$dynamicRef` are not followed, since resolving them needs the compiled reference
//! graph rather than the raw schema `Value` this pass has access to; a schema reachable only
//! through a reference is left uncoerced. `not` is skipped deliberately: coercing an instance to
//! satisfy the schema it must *not* match would be self-defeating.
use serde_json::Value;

/// Which coercions [`crate::Validator::apply_coercion`] should perform.
///
/// All coercions are enabled by default; disable the ones you don't want with the `without_*`
/// builder methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coercion {
    strings_to_integers: bool,
    strings_to_numbers: bool,
    booleans: bool,
    strings_to_null: bool,
    scalars_to_arrays: bool,
}

impl Default for Coercion {
    fn default() -> Self {
        Coercion {
            strings_to_integers: true,
            strings_to_numbers: true,
            booleans: true,
            strings_to_null: true,
            scalars_to_arrays: true,
        }
    }
}

impl Coercion {
    /// Disable coercing strings like `"42"` into `type: integer` values.
    #[must_use]
    pub fn without_strings_to_integers(mut self) -> Self {
        self.strings_to_integers = false;
        self
    }
    /// Disable coercing strings like `"4.2"` into `type: number` values.
    #[must_use]
    pub fn without_strings_to_numbers(mut self) -> Self {
        self.strings_to_numbers = false;
        self
    }
    /// Disable coercing `"true"`/`"false"`/`"1"`/`"0"`/`1`/`0` into `type: boolean` values.
    #[must_use]
    pub fn without_booleans(mut self) -> Self {
        self.booleans = false;
        self
    }
    /// Disable coercing the empty string into `type: null`.
    #[must_use]
    pub fn without_strings_to_null(mut self) -> Self {
        self.strings_to_null = false;
        self
    }
    /// Disable wrapping a bare scalar into a single-element array for `type: array`.
    #[must_use]
    pub fn without_scalars_to_arrays(mut self) -> Self {
        self.scalars_to_arrays = false;
        self
    }
}

/// Internal alias kept distinct from the public [`Coercion`] builder so the stored
/// configuration can grow without affecting the builder's public shape.
pub(crate) type CoercionOptions = Coercion;

/// Walk `schema` and `instance` together, coercing values in place.
///
/// Returns `true` if at least one value was changed.
pub(crate) fn coerce(schema: &Value, instance: &mut Value, options: &Coercion) -> bool {
    let mut changed = false;
    coerce_against_schema(schema, instance, options, &mut changed);
    changed
}

fn coerce_against_schema(schema: &Value, instance: &mut Value, options: &Coercion, changed: &mut bool) {
    let Value::Object(schema) = schema else {
        return;
    };

    if let Some(target) = schema.get("type").and_then(Value::as_str) {
        coerce_scalar(target, instance, options, changed);
    }

    match instance {
        Value::Object(instance) => {
            let mut handled: std::collections::HashSet<&str> = std::collections::HashSet::new();
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (key, subschema) in properties {
                    if let Some(value) = instance.get_mut(key) {
                        coerce_against_schema(subschema, value, options, changed);
                    }
                    handled.insert(key.as_str());
                }
            }
            if let Some(additional) = schema.get("additionalProperties") {
                if !matches!(additional, Value::Bool(false)) {
                    for (key, value) in instance.iter_mut() {
                        if !handled.contains(key.as_str()) {
                            coerce_against_schema(additional, value, options, changed);
                        }
                    }
                }
            }
        }
        Value::Array(elements) => {
            let prefix_len = if let Some(Value::Array(prefix_items)) = schema.get("prefixItems") {
                for (element, subschema) in elements.iter_mut().zip(prefix_items.iter()) {
                    coerce_against_schema(subschema, element, options, changed);
                }
                prefix_items.len()
            } else {
                0
            };
            match schema.get("items") {
                Some(Value::Array(tuple_items)) => {
                    for (element, subschema) in elements.iter_mut().zip(tuple_items.iter()) {
                        coerce_against_schema(subschema, element, options, changed);
                    }
                }
                Some(items_schema) => {
                    for element in elements.iter_mut().skip(prefix_len) {
                        coerce_against_schema(items_schema, element, options, changed);
                    }
                }
                None => {}
            }
        }
        _ => {}
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = schema.get(keyword) {
            for branch in branches {
                coerce_against_schema(branch, instance, options, changed);
            }
        }
    }
}

/// Attempt to coerce `instance` itself to the declared `target` type. A no-op if `instance`
/// already has a shape that doesn't need coercing, or the corresponding option is disabled.
fn coerce_scalar(target: &str, instance: &mut Value, options: &Coercion, changed: &mut bool) {
    match target {
        "integer" if options.strings_to_integers => {
            if let Value::String(raw) = instance {
                if let Ok(value) = raw.parse::<i64>() {
                    *instance = Value::from(value);
                    *changed = true;
                }
            }
        }
        "number" if options.strings_to_numbers => {
            if let Value::String(raw) = instance {
                if let Ok(value) = raw.parse::<f64>() {
                    if let Some(number) = serde_json::Number::from_f64(value) {
                        *instance = Value::Number(number);
                        *changed = true;
                    }
                }
            }
        }
        "boolean" if options.booleans => match instance {
            Value::String(raw) => match raw.as_str() {
                "true" | "1" => {
                    *instance = Value::Bool(true);
                    *changed = true;
                }
                "false" | "0" => {
                    *instance = Value::Bool(false);
                    *changed = true;
                }
                _ => {}
            },
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    if value == 1 {
                        *instance = Value::Bool(true);
                        *changed = true;
                    } else if value == 0 {
                        *instance = Value::Bool(false);
                        *changed = true;
                    }
                }
            }
            _ => {}
        },
        "null" if options.strings_to_null => {
            if matches!(instance, Value::String(raw) if raw.is_empty()) {
                *instance = Value::Null;
                *changed = true;
            }
        }
        "array" if options.scalars_to_arrays => {
            if !matches!(instance, Value::Array(_) | Value::Object(_) | Value::Null) {
                let scalar = instance.take();
                *instance = Value::Array(vec![scalar]);
                *changed = true;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_nested_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "age": {"type": "integer"},
                "active": {"type": "boolean"},
                "nickname": {"type": "null"}
            }
        });
        let mut instance = json!({"age": "42", "active": "false", "nickname": ""});
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!({"age": 42, "active": false, "nickname": null}));
    }

    #[test]
    fn coerces_array_items() {
        let schema = json!({"type": "array", "items": {"type": "number"}});
        let mut instance = json!(["1.5", "2.5"]);
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!([1.5, 2.5]));
    }

    #[test]
    fn coerces_prefix_items_then_remaining_items() {
        let schema = json!({
            "prefixItems": [{"type": "integer"}, {"type": "boolean"}],
            "items": {"type": "number"}
        });
        let mut instance = json!(["1", "1", "2.5"]);
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!([1, true, 2.5]));
    }

    #[test]
    fn coerces_additional_properties_not_named_explicitly() {
        let schema = json!({
            "properties": {"id": {"type": "integer"}},
            "additionalProperties": {"type": "number"}
        });
        let mut instance = json!({"id": "1", "score": "2.5"});
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!({"id": 1, "score": 2.5}));
    }

    #[test]
    fn coerces_through_composition_branches() {
        let schema = json!({"allOf": [{"properties": {"age": {"type": "integer"}}}]});
        let mut instance = json!({"age": "42"});
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!({"age": 42}));
    }

    #[test]
    fn wraps_scalar_into_single_element_array() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        let mut instance = json!("1");
        assert!(coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!([1]));
    }

    #[test]
    fn coerces_one_and_zero_to_booleans() {
        let schema = json!({"type": "boolean"});
        for (raw, expected) in [
            (json!("1"), json!(true)),
            (json!("0"), json!(false)),
            (json!(1), json!(true)),
            (json!(0), json!(false)),
        ] {
            let mut instance = raw;
            assert!(coerce(&schema, &mut instance, &Coercion::default()));
            assert_eq!(instance, expected);
        }
    }

    #[test]
    fn leaves_unparsable_strings_untouched() {
        let schema = json!({"type": "integer"});
        let mut instance = json!("not a number");
        assert!(!coerce(&schema, &mut instance, &Coercion::default()));
        assert_eq!(instance, json!("not a number"));
    }

    #[test]
    fn respects_disabled_coercions() {
        let schema = json!({"type": "integer"});
        let mut instance = json!("42");
        let options = Coercion::default().without_strings_to_integers();
        assert!(!coerce(&schema, &mut instance, &options));
        assert_eq!(instance, json!("42"));
    }
}
