//! Language-level built-ins

use super::{arg, construct_fn, native_fn, RealmBuilder};
use crate::error::{HostError, HostResult};
use crate::host::Host;
use crate::object::{ObjectId, PropertyDescriptor};
use crate::realm::RealmId;
use crate::value::{number_to_string, PropertyKey, Symbol, Value};

pub(super) fn install(b: &mut RealmBuilder<'_>) {
    install_object(b);
    install_function(b);
    install_array(b);
    install_primitives(b);
    install_regexp(b);
    install_error(b);
    install_set(b);
    install_typed_arrays(b);
    install_reflect(b);
    install_console(b);
}

/// `ToNumber`
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Symbol(_) | Value::Object(_) => f64::NAN,
    }
}

fn length_of(host: &Host, id: ObjectId) -> HostResult<usize> {
    match host.get(id, &"length".into())? {
        Value::Number(n) if n >= 0.0 => Ok(n as usize),
        _ => Ok(0),
    }
}

/// Append to an array-like object through ordinary property writes
pub(crate) fn push_value(host: &Host, array: ObjectId, value: Value) -> HostResult<usize> {
    let len = length_of(host, array)?;
    host.set(array, &len.into(), value)?;
    host.set(array, &"length".into(), Value::Number((len + 1) as f64))?;
    Ok(len + 1)
}

fn install_object(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let proto = b.object_proto();

    b.method(proto, "toString", |host, this, _| {
        Ok(Value::string(&format!("[object {}]", host.class_of(&this))))
    });
    b.method(proto, "hasOwnProperty", |host, this, args| {
        let key = host.to_property_key(&arg(args, 0));
        Ok(Value::Bool(match this {
            Value::Object(id) => host.get_own_property(id, &key).is_some(),
            _ => false,
        }))
    });
    b.method(proto, "valueOf", |_, this, _| Ok(this));

    let get_proto = b.native("get __proto__", |host, this, _| {
        Ok(this
            .as_object()
            .and_then(|id| host.prototype_of(id))
            .map_or(Value::Null, Value::Object))
    });
    let set_proto = b.native("set __proto__", |host, this, args| {
        if let Value::Object(id) = this {
            match arg(args, 0) {
                Value::Object(proto) => host.set_prototype_of(id, Some(proto))?,
                Value::Null => host.set_prototype_of(id, None)?,
                _ => {}
            }
        }
        Ok(Value::Undefined)
    });
    b.put(
        proto,
        "__proto__",
        PropertyDescriptor::Accessor {
            get: Some(get_proto),
            set: Some(set_proto),
            enumerable: false,
            configurable: true,
        },
    );

    let to_object = move |host: &Host, args: &[Value]| -> HostResult<Value> {
        match arg(args, 0) {
            value @ Value::Object(_) => Ok(value),
            _ => Ok(Value::Object(host.create_plain_object(realm))),
        }
    };
    let ctor = b.constructor(
        "Object",
        proto,
        native_fn(move |host, _, args| to_object(host, args)),
        Some(construct_fn(move |host, args| to_object(host, args))),
    );

    b.method(ctor, "getPrototypeOf", |host, _, args| match arg(args, 0) {
        Value::Object(id) => Ok(host.prototype_of(id).map_or(Value::Null, Value::Object)),
        other => Err(HostError::type_error(format!(
            "Cannot convert {} to object",
            host.to_display_string(&other)
        ))),
    });
    b.method(ctor, "keys", move |host, _, args| {
        let Value::Object(id) = arg(args, 0) else {
            return Ok(Value::Object(host.create_array(realm, &[])));
        };
        let keys: Vec<Value> = host
            .own_keys(id)
            .into_iter()
            .filter(|key| {
                matches!(key, PropertyKey::String(_))
                    && host.get_own_property(id, key).is_some_and(|d| d.enumerable())
            })
            .map(|key| Value::string(&key.to_string()))
            .collect();
        Ok(Value::Object(host.create_array(realm, &keys)))
    });
}

fn install_function(b: &mut RealmBuilder<'_>) {
    let proto = b.function_proto();

    b.method(proto, "call", |host, this, args| {
        host.call(&this, arg(args, 0), args.get(1..).unwrap_or(&[]))
    });
    b.method(proto, "apply", |host, this, args| {
        let list = match arg(args, 1) {
            Value::Object(array) => host.array_elements(array)?,
            Value::Undefined | Value::Null => Vec::new(),
            _ => {
                return Err(HostError::type_error(
                    "CreateListFromArrayLike called on non-object",
                ))
            }
        };
        host.call(&this, arg(args, 0), &list)
    });
    b.method(proto, "bind", |host, this, args| {
        let Value::Object(target) = this else {
            return Err(HostError::type_error("Bind must be called on a function"));
        };
        let bound = host.bind_function(target, arg(args, 0), args.get(1..).unwrap_or(&[]).to_vec())?;
        Ok(Value::Object(bound))
    });
    b.method(proto, "toString", |host, this, _| match this {
        Value::Object(id) => Ok(Value::string(&host.function_source(id)?)),
        _ => Err(HostError::type_error(
            "Function.prototype.toString requires that 'this' be a Function",
        )),
    });

    let unsupported = || HostError::type_error("Code generation from strings disallowed for this context");
    b.constructor(
        "Function",
        proto,
        native_fn(move |_, _, _| Err(unsupported())),
        Some(construct_fn(move |_, _| Err(unsupported()))),
    );
}

fn install_array(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let proto = b.prototype("Array", b.object_proto());
    b.put(
        proto,
        "length",
        PropertyDescriptor::Data {
            value: Value::Number(0.0),
            writable: true,
            enumerable: false,
            configurable: false,
        },
    );

    b.method(proto, "push", |host, this, args| {
        let Value::Object(array) = this else {
            return Err(HostError::type_error("Array.prototype.push called on null or undefined"));
        };
        let mut len = 0;
        for value in args {
            len = push_value(host, array, value.clone())?;
        }
        if args.is_empty() {
            len = length_of(host, array)?;
        }
        Ok(Value::Number(len as f64))
    });
    b.method(proto, "join", |host, this, args| {
        let Value::Object(array) = this else {
            return Err(HostError::type_error("Array.prototype.join called on null or undefined"));
        };
        let separator = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            other => host.to_display_string(&other),
        };
        let parts: Vec<String> = host
            .array_elements(array)?
            .iter()
            .map(|v| if v.is_nullish() { String::new() } else { host.to_display_string(v) })
            .collect();
        Ok(Value::string(&parts.join(&separator)))
    });
    b.method(proto, "indexOf", |host, this, args| {
        let Value::Object(array) = this else {
            return Ok(Value::Number(-1.0));
        };
        let needle = arg(args, 0);
        let position = host.array_elements(array)?.iter().position(|v| *v == needle);
        Ok(Value::Number(position.map_or(-1.0, |p| p as f64)))
    });

    let ctor = b.constructor(
        "Array",
        proto,
        native_fn(move |host, _, args| Ok(Value::Object(host.create_array(realm, args)))),
        Some(construct_fn(move |host, args| {
            Ok(Value::Object(host.create_array(realm, args)))
        })),
    );
    b.method(ctor, "isArray", |host, _, args| {
        Ok(Value::Bool(host.class_of(&arg(args, 0)) == "Array"))
    });
}

fn install_primitives(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();

    let string_proto = b.prototype("String", b.object_proto());
    b.method(string_proto, "toString", |host, this, _| primitive_of(host, &this, "String"));
    b.method(string_proto, "valueOf", |host, this, _| primitive_of(host, &this, "String"));
    b.constructor(
        "String",
        string_proto,
        native_fn(|host, _, args| {
            Ok(match args.first() {
                None => Value::string(""),
                Some(value) => Value::string(&host.to_display_string(value)),
            })
        }),
        Some(construct_fn(move |host, args| {
            let primitive = Value::string(&args.first().map(|v| host.to_display_string(v)).unwrap_or_default());
            wrap_primitive(host, realm, "String", string_proto, primitive)
        })),
    );

    let number_proto = b.prototype("Number", b.object_proto());
    b.method(number_proto, "toString", |host, this, _| {
        let n = primitive_of(host, &this, "Number")?;
        Ok(Value::string(&host.to_display_string(&n)))
    });
    b.method(number_proto, "valueOf", |host, this, _| primitive_of(host, &this, "Number"));
    b.constructor(
        "Number",
        number_proto,
        native_fn(|_, _, args| Ok(Value::Number(args.first().map_or(0.0, to_number)))),
        Some(construct_fn(move |host, args| {
            let primitive = Value::Number(args.first().map_or(0.0, to_number));
            wrap_primitive(host, realm, "Number", number_proto, primitive)
        })),
    );

    let boolean_proto = b.prototype("Boolean", b.object_proto());
    b.method(boolean_proto, "valueOf", |host, this, _| primitive_of(host, &this, "Boolean"));
    b.constructor(
        "Boolean",
        boolean_proto,
        native_fn(|_, _, args| Ok(Value::Bool(arg(args, 0).is_truthy()))),
        Some(construct_fn(move |host, args| {
            let primitive = Value::Bool(arg(args, 0).is_truthy());
            wrap_primitive(host, realm, "Boolean", boolean_proto, primitive)
        })),
    );

    let symbol_proto = b.prototype("Symbol", b.object_proto());
    b.getter(symbol_proto, "description", |_, this, _| match this {
        Value::Symbol(sym) => Ok(Value::string(sym.description())),
        _ => Ok(Value::Undefined),
    });
    b.constructor(
        "Symbol",
        symbol_proto,
        native_fn(|host, _, args| {
            let description = match arg(args, 0) {
                Value::Undefined => String::new(),
                other => host.to_display_string(&other),
            };
            Ok(Value::Symbol(Symbol::new(&description)))
        }),
        None,
    );
}

fn wrap_primitive(
    host: &Host,
    realm: RealmId,
    class_name: &str,
    proto: ObjectId,
    primitive: Value,
) -> HostResult<Value> {
    let wrapper = host.alloc_object(realm, class_name, Some(proto));
    host.set_slot(wrapper, "primitive", primitive)?;
    Ok(Value::Object(wrapper))
}

fn primitive_of(host: &Host, this: &Value, class_name: &str) -> HostResult<Value> {
    match this {
        Value::String(_) if class_name == "String" => Ok(this.clone()),
        Value::Number(_) if class_name == "Number" => Ok(this.clone()),
        Value::Bool(_) if class_name == "Boolean" => Ok(this.clone()),
        Value::Object(id) => host.slot(*id, "primitive").ok_or_else(|| {
            HostError::type_error(format!(
                "{}.prototype.valueOf requires that 'this' be a {}",
                class_name, class_name
            ))
        }),
        _ => Err(HostError::type_error(format!(
            "{}.prototype.valueOf requires that 'this' be a {}",
            class_name, class_name
        ))),
    }
}

fn install_regexp(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let proto = b.prototype("RegExp", b.object_proto());
    b.method(proto, "toString", |host, this, _| {
        let Value::Object(id) = this else {
            return Err(HostError::illegal_invocation());
        };
        let source = host.get(id, &"source".into())?;
        let flags = host.get(id, &"flags".into())?;
        Ok(Value::string(&format!(
            "/{}/{}",
            host.to_display_string(&source),
            host.to_display_string(&flags)
        )))
    });

    let create = move |host: &Host, args: &[Value]| -> HostResult<Value> {
        let source = match arg(args, 0) {
            Value::Undefined => "(?:)".to_string(),
            other => host.to_display_string(&other),
        };
        let flags = match arg(args, 1) {
            Value::Undefined => String::new(),
            other => host.to_display_string(&other),
        };
        let regexp = host.alloc_object(realm, "RegExp", Some(proto));
        host.define_own_property(regexp, &"source".into(), PropertyDescriptor::frozen(Value::string(&source)))?;
        host.define_own_property(regexp, &"flags".into(), PropertyDescriptor::frozen(Value::string(&flags)))?;
        host.define_own_property(
            regexp,
            &"lastIndex".into(),
            PropertyDescriptor::Data {
                value: Value::Number(0.0),
                writable: true,
                enumerable: false,
                configurable: false,
            },
        )?;
        Ok(Value::Object(regexp))
    };
    b.constructor(
        "RegExp",
        proto,
        native_fn(move |host, _, args| create(host, args)),
        Some(construct_fn(move |host, args| create(host, args))),
    );
}

fn install_error(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let proto = b.prototype("Error", b.object_proto());
    b.value(proto, "name", Value::string("Error"));
    b.value(proto, "message", Value::string(""));
    b.method(proto, "toString", |host, this, _| {
        let Value::Object(id) = this else {
            return Err(HostError::illegal_invocation());
        };
        let name = host.to_display_string(&host.get(id, &"name".into())?);
        let message = host.to_display_string(&host.get(id, &"message".into())?);
        Ok(Value::string(&if message.is_empty() {
            name
        } else {
            format!("{}: {}", name, message)
        }))
    });

    let create = move |host: &Host, args: &[Value]| -> HostResult<Value> {
        let error = host.alloc_object(realm, "Error", Some(proto));
        if let Some(message) = args.first().filter(|m| !m.is_undefined()) {
            host.define_own_property(
                error,
                &"message".into(),
                PropertyDescriptor::builtin(Value::string(&host.to_display_string(message))),
            )?;
        }
        Ok(Value::Object(error))
    };
    b.constructor(
        "Error",
        proto,
        native_fn(move |host, _, args| create(host, args)),
        Some(construct_fn(move |host, args| create(host, args))),
    );
}

fn set_entries(host: &Host, this: &Value) -> HostResult<(ObjectId, ObjectId)> {
    let set = host.this_branded(this, "entries")?;
    match host.slot(set, "entries") {
        Some(Value::Object(entries)) => Ok((set, entries)),
        _ => Err(HostError::illegal_invocation()),
    }
}

fn install_set(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let proto = b.prototype("Set", b.object_proto());

    b.method(proto, "add", |host, this, args| {
        let (_, entries) = set_entries(host, &this)?;
        let value = arg(args, 0);
        if !host.array_elements(entries)?.iter().any(|v| v.same_value(&value)) {
            push_value(host, entries, value)?;
        }
        Ok(this)
    });
    b.method(proto, "has", |host, this, args| {
        let (_, entries) = set_entries(host, &this)?;
        let value = arg(args, 0);
        Ok(Value::Bool(
            host.array_elements(entries)?.iter().any(|v| v.same_value(&value)),
        ))
    });
    b.method(proto, "delete", move |host, this, args| {
        let (set, entries) = set_entries(host, &this)?;
        let value = arg(args, 0);
        let mut values = host.array_elements(entries)?;
        let before = values.len();
        values.retain(|v| !v.same_value(&value));
        if values.len() == before {
            return Ok(Value::Bool(false));
        }
        let replacement = host.create_array(realm, &values);
        host.set_slot(set, "entries", Value::Object(replacement))?;
        Ok(Value::Bool(true))
    });
    b.getter(proto, "size", |host, this, _| {
        let (_, entries) = set_entries(host, &this)?;
        Ok(Value::Number(length_of(host, entries)? as f64))
    });

    b.constructor(
        "Set",
        proto,
        native_fn(|_, _, _| {
            Err(HostError::type_error("Constructor Set requires 'new'"))
        }),
        Some(construct_fn(move |host, args| {
            let set = host.alloc_object(realm, "Set", Some(proto));
            let initial = match arg(args, 0) {
                Value::Object(iterable) => host.array_elements(iterable)?,
                _ => Vec::new(),
            };
            let mut unique: Vec<Value> = Vec::with_capacity(initial.len());
            for value in initial {
                if !unique.iter().any(|v| v.same_value(&value)) {
                    unique.push(value);
                }
            }
            let entries = host.create_array(realm, &unique);
            host.set_slot(set, "entries", Value::Object(entries))?;
            Ok(Value::Object(set))
        })),
    );
}

fn install_typed_arrays(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();

    let buffer_proto = b.prototype("ArrayBuffer", b.object_proto());
    b.getter(buffer_proto, "byteLength", |host, this, _| {
        let buffer = host.this_branded(&this, "byteLength")?;
        Ok(host.slot(buffer, "byteLength").unwrap_or_default())
    });
    b.constructor(
        "ArrayBuffer",
        buffer_proto,
        native_fn(|_, _, _| Err(HostError::type_error("Constructor ArrayBuffer requires 'new'"))),
        Some(construct_fn(move |host, args| {
            let buffer = host.alloc_object(realm, "ArrayBuffer", Some(buffer_proto));
            let len = to_number(&arg(args, 0));
            let len = if len.is_finite() && len > 0.0 { len.trunc() } else { 0.0 };
            host.set_slot(buffer, "byteLength", Value::Number(len))?;
            Ok(Value::Object(buffer))
        })),
    );

    for (name, bytes) in [("Uint8Array", 1.0), ("Int32Array", 4.0), ("Float64Array", 8.0)] {
        let proto = b.prototype(name, b.object_proto());
        b.getter(proto, "length", |host, this, _| {
            let view = host.this_branded(&this, "length")?;
            Ok(host.slot(view, "length").unwrap_or_default())
        });
        let ctor = b.constructor(
            name,
            proto,
            native_fn(move |_, _, _| {
                Err(HostError::type_error(format!("Constructor {} requires 'new'", name)))
            }),
            Some(construct_fn(move |host, args| {
                let values = match arg(args, 0) {
                    Value::Object(source) => host
                        .array_elements(source)?
                        .iter()
                        .map(|v| Value::Number(to_number(v)))
                        .collect(),
                    other => {
                        let len = to_number(&other);
                        let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
                        vec![Value::Number(0.0); len]
                    }
                };
                let view = host.alloc_object(realm, name, Some(proto));
                for (i, value) in values.iter().enumerate() {
                    host.define_own_property(
                        view,
                        &i.into(),
                        PropertyDescriptor::Data {
                            value: value.clone(),
                            writable: true,
                            enumerable: true,
                            configurable: false,
                        },
                    )?;
                }
                host.set_slot(view, "length", Value::Number(values.len() as f64))?;
                Ok(Value::Object(view))
            })),
        );
        b.put(ctor, "BYTES_PER_ELEMENT", PropertyDescriptor::frozen(Value::Number(bytes)));
    }
}

fn install_reflect(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let reflect = b.object("Reflect", Some(b.object_proto()));

    b.method(reflect, "getPrototypeOf", |host, _, args| match arg(args, 0) {
        Value::Object(id) => Ok(host.prototype_of(id).map_or(Value::Null, Value::Object)),
        _ => Err(HostError::type_error("Reflect.getPrototypeOf called on non-object")),
    });
    b.method(reflect, "ownKeys", move |host, _, args| match arg(args, 0) {
        Value::Object(id) => {
            let keys: Vec<Value> = host
                .own_keys(id)
                .into_iter()
                .map(|key| match key {
                    PropertyKey::String(s) => Value::String(s),
                    PropertyKey::Symbol(sym) => Value::Symbol(sym),
                })
                .collect();
            Ok(Value::Object(host.create_array(realm, &keys)))
        }
        _ => Err(HostError::type_error("Reflect.ownKeys called on non-object")),
    });
    b.method(reflect, "has", |host, _, args| match arg(args, 0) {
        Value::Object(id) => {
            let key = host.to_property_key(&arg(args, 1));
            Ok(Value::Bool(host.has_property(id, &key)))
        }
        _ => Err(HostError::type_error("Reflect.has called on non-object")),
    });
    b.method(reflect, "apply", |host, _, args| {
        let list = match arg(args, 2) {
            Value::Object(array) => host.array_elements(array)?,
            _ => {
                return Err(HostError::type_error(
                    "CreateListFromArrayLike called on non-object",
                ))
            }
        };
        host.call(&arg(args, 0), arg(args, 1), &list)
    });
    b.global("Reflect", reflect);
}

fn install_console(b: &mut RealmBuilder<'_>) {
    let proto = b.object("Object", Some(b.object_proto()));
    let console = b.object("console", Some(proto));

    let format = |host: &Host, args: &[Value]| -> String {
        args.iter()
            .map(|v| host.to_display_string(v))
            .collect::<Vec<_>>()
            .join(" ")
    };
    b.method(console, "log", move |host, _, args| {
        host.console_write(format(host, args));
        Ok(Value::Undefined)
    });
    b.method(console, "warn", move |host, _, args| {
        host.console_write(format!("warn: {}", format(host, args)));
        Ok(Value::Undefined)
    });
    b.register("console.__proto__", proto);
    b.global("console", console);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsic(host: &Host, name: &str) -> Value {
        Value::Object(host.realm(host.main_realm()).unwrap().intrinsic(name).unwrap())
    }

    #[test]
    fn test_function_call_and_apply() {
        let host = Host::new();
        let realm = host.main_realm();
        let f = host.create_native_function(realm, "argc", |_, this, args| {
            Ok(Value::Number(args.len() as f64 + if this.is_object() { 10.0 } else { 0.0 }))
        });
        let receiver = Value::Object(host.create_plain_object(realm));
        let f = Value::Object(f);

        let via_call = host
            .invoke(&f, "call", &[receiver.clone(), Value::Null, Value::Null])
            .unwrap();
        assert_eq!(via_call, Value::Number(12.0));

        let list = Value::Object(host.create_array(realm, &[Value::Null]));
        let via_apply = host.invoke(&f, "apply", &[receiver, list]).unwrap();
        assert_eq!(via_apply, Value::Number(11.0));
    }

    #[test]
    fn test_function_to_string_on_natives() {
        let host = Host::new();
        let object = intrinsic(&host, "Object");
        let source = host.invoke(&object, "toString", &[]).unwrap();
        assert_eq!(
            source.as_str(),
            Some("function Object() {\n    [native code]\n}")
        );
    }

    #[test]
    fn test_array_push_and_join() {
        let host = Host::new();
        let array = host.construct(&intrinsic(&host, "Array"), &[]).unwrap();
        host.invoke(&array, "push", &[Value::string("a"), Value::Number(2.0)])
            .unwrap();
        let joined = host.invoke(&array, "join", &[Value::string("-")]).unwrap();
        assert_eq!(joined.as_str(), Some("a-2"));
    }

    #[test]
    fn test_set_add_has_delete() {
        let host = Host::new();
        let set = host.construct(&intrinsic(&host, "Set"), &[]).unwrap();
        host.invoke(&set, "add", &[Value::Number(1.0)]).unwrap();
        host.invoke(&set, "add", &[Value::Number(1.0)]).unwrap();

        let size = host.get(set.as_object().unwrap(), &"size".into()).unwrap();
        assert_eq!(size, Value::Number(1.0));
        assert_eq!(host.invoke(&set, "has", &[Value::Number(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(host.invoke(&set, "delete", &[Value::Number(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(host.invoke(&set, "has", &[Value::Number(1.0)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_typed_array_construction() {
        let host = Host::new();
        let view = host.construct(&intrinsic(&host, "Uint8Array"), &[Value::Number(3.0)]).unwrap();
        let id = view.as_object().unwrap();
        assert_eq!(host.get(id, &"length".into()).unwrap(), Value::Number(3.0));
        assert_eq!(host.get(id, &"2".into()).unwrap(), Value::Number(0.0));
        assert_eq!(host.class_of(&view), "Uint8Array");
    }

    #[test]
    fn test_primitive_conversions() {
        let host = Host::new();
        let number = host
            .call(&intrinsic(&host, "Number"), Value::Undefined, &[Value::string(" 42 ")])
            .unwrap();
        assert_eq!(number, Value::Number(42.0));

        let string = host
            .call(&intrinsic(&host, "String"), Value::Undefined, &[Value::Number(1.5)])
            .unwrap();
        assert_eq!(string.as_str(), Some("1.5"));
        assert_eq!(number_to_string(to_number(&Value::Bool(true))), "1");
    }

    #[test]
    fn test_console_log_writes_output() {
        let host = Host::new();
        let console = intrinsic(&host, "console");
        host.invoke(&console, "log", &[Value::string("hello"), Value::Number(1.0)])
            .unwrap();
        assert_eq!(host.console_output(), vec!["hello 1".to_string()]);
    }
}
