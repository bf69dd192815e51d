//! Label helpers: type names, key labels and descriptor lookup
//!
//! None of these run user code. Descriptor lookup walks the prototype chain
//! through [`Host::get_own_property`], which sees through proxies without
//! triggering their traps.

use nativetrace_host::{Host, ObjectId, PropertyDescriptor, PropertyKey, Value};

/// Type name used in log labels
///
/// Objects report their class tag (`"HTMLDivElement"`, `"Function"`);
/// primitives their lowercase type (`"string"`, `"null"`).
pub fn type_name(host: &Host, value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Symbol(_) => "symbol".to_string(),
        Value::Object(_) => host.class_of(value),
    }
}

/// Label for a property key: `[int]` for indexes, `[Symbol(desc)]` for symbols
pub fn key_label(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Symbol(sym) => format!("[{}]", sym),
        key if key.is_index() => "[int]".to_string(),
        PropertyKey::String(s) => s.to_string(),
    }
}

/// Find the object that defines `key` (own or inherited) and its descriptor
pub fn find_property(host: &Host, id: ObjectId, key: &PropertyKey) -> Option<(ObjectId, PropertyDescriptor)> {
    let mut current = Some(id);
    while let Some(obj) = current {
        if let Some(desc) = host.get_own_property(obj, key) {
            return Some((obj, desc));
        }
        current = host.prototype_of(obj);
    }
    None
}

/// Class tag of the object that defines `key`, falling back to `id`'s own
pub fn owner_type(host: &Host, id: ObjectId, key: &PropertyKey) -> String {
    let owner = find_property(host, id, key).map_or(id, |(owner, _)| owner);
    host.class_of(&Value::Object(owner))
}

/// Name of the function stored under `constructor`, used to name prototypes
pub fn constructor_name(host: &Host, proto: ObjectId) -> Option<String> {
    let (_, desc) = find_property(host, proto, &"constructor".into())?;
    match desc.value() {
        Some(Value::Object(ctor)) => host.function_name(*ctor).map(|name| name.to_string()),
        _ => None,
    }
}
