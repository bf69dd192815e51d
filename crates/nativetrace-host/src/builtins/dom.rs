//! Document surface: event targets, nodes, elements, documents, events and
//! the global `Window`
//!
//! Every native here checks its receiver: calling a method with a proxy or a
//! foreign object as `this` fails with "Illegal invocation", and node
//! arguments must be real nodes.

use super::lang::push_value;
use super::{arg, construct_fn, RealmBuilder};
use crate::error::{HostError, HostResult};
use crate::events::Listener;
use crate::host::Host;
use crate::object::{ObjectId, PropertyDescriptor};
use crate::realm::RealmId;
use crate::value::Value;
use std::rc::Rc;

const ELEMENT_NODE: f64 = 1.0;
const DOCUMENT_NODE: f64 = 9.0;

/// Prototypes needed to create elements after the realm is built
#[derive(Clone, Copy)]
struct ElementFactory {
    realm: RealmId,
    html_element: ObjectId,
    div_element: ObjectId,
}

impl ElementFactory {
    fn create(self, host: &Host, tag: &str) -> HostResult<ObjectId> {
        let tag = tag.to_ascii_uppercase();
        let (class_name, proto) = match tag.as_str() {
            "DIV" => ("HTMLDivElement", self.div_element),
            _ => ("HTMLElement", self.html_element),
        };
        let element = host.alloc_object(self.realm, class_name, Some(proto));
        host.set_slot(element, "nodeType", Value::Number(ELEMENT_NODE))?;
        host.set_slot(element, "tagName", Value::string(&tag))?;
        host.set_slot(element, "innerHTML", Value::string(""))?;
        Ok(element)
    }
}

/// Build the DOM interfaces, then the document and the global object
pub(super) fn install(b: &mut RealmBuilder<'_>) -> (ObjectId, ObjectId) {
    let event_target = install_event_target(b);
    let node = install_node(b, event_target);
    let element = install_element(b, node);
    let factory = install_html_elements(b, element);
    let document_proto = install_document(b, node, factory);
    install_events(b);
    let location = install_location(b);

    let host = b.host();
    let document = host.alloc_object(b.realm(), "HTMLDocument", Some(document_proto));
    let body = factory.create(host, "body");
    let _ = host.set_slot(document, "nodeType", Value::Number(DOCUMENT_NODE));
    let _ = host.set_slot(document, "title", Value::string(""));
    if let Ok(body) = body {
        let _ = host.set_slot(document, "body", Value::Object(body));
    }
    let document_location = b.native("get location", move |_, _, _| Ok(Value::Object(location)));
    b.put(
        document,
        "location",
        PropertyDescriptor::Accessor {
            get: Some(document_location),
            set: None,
            enumerable: true,
            configurable: false,
        },
    );

    let global = install_window(b, event_target, document, location);
    (global, document)
}

fn listener_from(host: &Host, args: &[Value], method: &str) -> HostResult<Option<Listener>> {
    let callback = match arg(args, 1) {
        Value::Undefined | Value::Null => return Ok(None),
        Value::Object(callback) if host.is_callable(&Value::Object(callback)) => callback,
        _ => {
            return Err(HostError::type_error(format!(
                "Failed to execute '{}' on 'EventTarget': parameter 2 is not of type 'Object'.",
                method
            )))
        }
    };
    let capture = match arg(args, 2) {
        Value::Object(options) => host.get(options, &"capture".into())?.is_truthy(),
        other => other.is_truthy(),
    };
    Ok(Some(Listener {
        event_type: Rc::from(host.to_display_string(&arg(args, 0))),
        callback,
        capture,
    }))
}

fn install_event_target(b: &mut RealmBuilder<'_>) -> ObjectId {
    let realm = b.realm();
    let proto = b.prototype("EventTargetPrototype", b.object_proto());

    b.method(proto, "addEventListener", |host, this, args| {
        let target = host.this_object(&this)?;
        if let Some(listener) = listener_from(host, args, "addEventListener")? {
            host.listeners().add(target, listener);
        }
        Ok(Value::Undefined)
    });
    b.method(proto, "removeEventListener", |host, this, args| {
        let target = host.this_object(&this)?;
        if let Some(listener) = listener_from(host, args, "removeEventListener")? {
            host.listeners().remove(target, &listener);
        }
        Ok(Value::Undefined)
    });
    b.method(proto, "dispatchEvent", |host, this, args| {
        let target = host.this_object(&this)?;
        let event = match arg(args, 0) {
            Value::Object(event) if !host.is_proxy(event) && host.slot(event, "type").is_some() => event,
            _ => {
                return Err(HostError::type_error(
                    "Failed to execute 'dispatchEvent' on 'EventTarget': parameter 1 is not of type 'Event'.",
                ))
            }
        };
        let event_type = host
            .slot(event, "type")
            .map(|t| host.to_display_string(&t))
            .unwrap_or_default();
        host.set_slot(event, "target", Value::Object(target))?;

        for listener in host.listeners().listeners_for(target, &event_type) {
            let result = host.call(
                &Value::Object(listener.callback),
                Value::Object(target),
                &[Value::Object(event)],
            );
            // listener failures are reported, dispatch continues
            if let Err(err) = result {
                host.console_write(format!("Uncaught {}", err));
            }
        }
        let prevented = host
            .slot(event, "defaultPrevented")
            .is_some_and(|v| v.is_truthy());
        Ok(Value::Bool(!prevented))
    });

    b.interface(
        "EventTarget",
        proto,
        Some(construct_fn(move |host, _| {
            Ok(Value::Object(host.alloc_object(realm, "EventTarget", Some(proto))))
        })),
    );
    proto
}

fn child_list(host: &Host, node: ObjectId) -> HostResult<ObjectId> {
    if let Some(Value::Object(list)) = host.slot(node, "childNodes") {
        return Ok(list);
    }
    let realm = host.realm_of(node).ok_or(HostError::StaleHandle(node))?;
    let list = host.create_array(realm, &[]);
    host.set_slot(node, "childNodes", Value::Object(list))?;
    Ok(list)
}

fn clone_node(host: &Host, node: ObjectId, deep: bool) -> HostResult<ObjectId> {
    let realm = host.realm_of(node).ok_or(HostError::StaleHandle(node))?;
    let class_name = host.class_of(&Value::Object(node));
    let copy = host.alloc_object(realm, &class_name, host.prototype_of(node));
    for slot in ["nodeType", "tagName", "innerHTML", "id", "title", "hidden", "align"] {
        if let Some(value) = host.slot(node, slot) {
            host.set_slot(copy, slot, value)?;
        }
    }
    if deep {
        if let Some(Value::Object(children)) = host.slot(node, "childNodes") {
            for child in host.array_elements(children)? {
                if let Value::Object(child) = child {
                    let child_copy = clone_node(host, child, true)?;
                    push_value(host, child_list(host, copy)?, Value::Object(child_copy))?;
                    host.set_slot(child_copy, "parentNode", Value::Object(copy))?;
                }
            }
        }
    }
    Ok(copy)
}

fn install_node(b: &mut RealmBuilder<'_>, event_target: ObjectId) -> ObjectId {
    let proto = b.prototype("NodePrototype", event_target);

    b.getter(proto, "nodeType", |host, this, _| {
        let node = host.this_branded(&this, "nodeType")?;
        Ok(host.slot(node, "nodeType").unwrap_or_default())
    });
    b.getter(proto, "nodeName", |host, this, _| {
        let node = host.this_branded(&this, "nodeType")?;
        Ok(match host.slot(node, "tagName") {
            Some(tag) => tag,
            None => Value::string("#document"),
        })
    });
    b.getter(proto, "parentNode", |host, this, _| {
        let node = host.this_branded(&this, "nodeType")?;
        Ok(host.slot(node, "parentNode").unwrap_or(Value::Null))
    });
    b.getter(proto, "firstChild", |host, this, _| {
        let node = host.this_branded(&this, "nodeType")?;
        match host.slot(node, "childNodes") {
            Some(Value::Object(children)) => Ok(host
                .array_elements(children)?
                .into_iter()
                .next()
                .unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    });
    b.method(proto, "appendChild", |host, this, args| {
        let parent = host.this_branded(&this, "nodeType")?;
        let child = match arg(args, 0) {
            Value::Object(child) if !host.is_proxy(child) && host.slot(child, "nodeType").is_some() => child,
            _ => {
                return Err(HostError::type_error(
                    "Failed to execute 'appendChild' on 'Node': parameter 1 is not of type 'Node'.",
                ))
            }
        };
        push_value(host, child_list(host, parent)?, Value::Object(child))?;
        host.set_slot(child, "parentNode", Value::Object(parent))?;
        Ok(Value::Object(child))
    });
    b.method(proto, "cloneNode", |host, this, args| {
        let node = host.this_branded(&this, "nodeType")?;
        Ok(Value::Object(clone_node(host, node, arg(args, 0).is_truthy())?))
    });

    b.interface("Node", proto, None);
    proto
}

fn string_slot_accessor(b: &RealmBuilder<'_>, proto: ObjectId, name: &str, slot: &'static str) {
    b.accessor(
        proto,
        name,
        move |host, this, _| {
            let element = host.this_branded(&this, "tagName")?;
            Ok(host.slot(element, slot).unwrap_or_else(|| Value::string("")))
        },
        move |host, this, args| {
            let element = host.this_branded(&this, "tagName")?;
            host.set_slot(element, slot, Value::string(&host.to_display_string(&arg(args, 0))))?;
            Ok(Value::Undefined)
        },
    );
}

fn install_element(b: &mut RealmBuilder<'_>, node: ObjectId) -> ObjectId {
    let proto = b.prototype("ElementPrototype", node);

    string_slot_accessor(b, proto, "innerHTML", "innerHTML");
    string_slot_accessor(b, proto, "id", "id");
    b.getter(proto, "tagName", |host, this, _| {
        let element = host.this_branded(&this, "tagName")?;
        Ok(host.slot(element, "tagName").unwrap_or_default())
    });
    b.getter(proto, "outerHTML", |host, this, _| {
        let element = host.this_branded(&this, "tagName")?;
        // the markup goes through the public innerHTML accessor
        let inner = host.get(element, &"innerHTML".into())?;
        let tag = host
            .slot(element, "tagName")
            .map(|t| host.to_display_string(&t).to_ascii_lowercase())
            .unwrap_or_default();
        Ok(Value::string(&format!(
            "<{}>{}</{}>",
            tag,
            host.to_display_string(&inner),
            tag
        )))
    });
    b.method(proto, "getAttribute", |host, this, args| {
        let element = host.this_branded(&this, "tagName")?;
        let name = host.to_property_key(&arg(args, 0));
        Ok(match host.slot(element, "attributes") {
            Some(Value::Object(attributes)) => host
                .get_own_property(attributes, &name)
                .and_then(|d| d.value().cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
    });
    b.method(proto, "setAttribute", |host, this, args| {
        let element = host.this_branded(&this, "tagName")?;
        let attributes = match host.slot(element, "attributes") {
            Some(Value::Object(attributes)) => attributes,
            _ => {
                let realm = host.realm_of(element).ok_or(HostError::StaleHandle(element))?;
                let attributes = host.alloc_object(realm, "NamedNodeMap", None);
                host.set_slot(element, "attributes", Value::Object(attributes))?;
                attributes
            }
        };
        let name = host.to_property_key(&arg(args, 0));
        let value = Value::string(&host.to_display_string(&arg(args, 1)));
        host.define_own_property(attributes, &name, PropertyDescriptor::data(value))?;
        Ok(Value::Undefined)
    });

    b.interface("Element", proto, None);
    proto
}

fn install_html_elements(b: &mut RealmBuilder<'_>, element: ObjectId) -> ElementFactory {
    let html_element = b.prototype("HTMLElementPrototype", element);
    string_slot_accessor(b, html_element, "title", "title");
    b.accessor(
        html_element,
        "hidden",
        |host, this, _| {
            let element = host.this_branded(&this, "tagName")?;
            Ok(Value::Bool(host.slot(element, "hidden").is_some_and(|v| v.is_truthy())))
        },
        |host, this, args| {
            let element = host.this_branded(&this, "tagName")?;
            host.set_slot(element, "hidden", Value::Bool(arg(args, 0).is_truthy()))?;
            Ok(Value::Undefined)
        },
    );
    b.interface("HTMLElement", html_element, None);

    let div_element = b.prototype("HTMLDivElementPrototype", html_element);
    string_slot_accessor(b, div_element, "align", "align");
    b.interface("HTMLDivElement", div_element, None);

    ElementFactory {
        realm: b.realm(),
        html_element,
        div_element,
    }
}

fn install_document(b: &mut RealmBuilder<'_>, node: ObjectId, factory: ElementFactory) -> ObjectId {
    let realm = b.realm();
    let proto = b.prototype("DocumentPrototype", node);

    b.method(proto, "createElement", move |host, this, args| {
        host.this_branded(&this, "nodeType")?;
        let tag = host.to_display_string(&arg(args, 0));
        Ok(Value::Object(factory.create(host, &tag)?))
    });
    b.getter(proto, "body", |host, this, _| {
        let document = host.this_branded(&this, "nodeType")?;
        Ok(host.slot(document, "body").unwrap_or(Value::Null))
    });
    b.accessor(
        proto,
        "title",
        |host, this, _| {
            let document = host.this_branded(&this, "nodeType")?;
            Ok(host.slot(document, "title").unwrap_or_else(|| Value::string("")))
        },
        |host, this, args| {
            let document = host.this_branded(&this, "nodeType")?;
            host.set_slot(document, "title", Value::string(&host.to_display_string(&arg(args, 0))))?;
            Ok(Value::Undefined)
        },
    );
    b.interface(
        "Document",
        proto,
        Some(construct_fn(move |host, _| {
            let document = host.alloc_object(realm, "Document", Some(proto));
            host.set_slot(document, "nodeType", Value::Number(DOCUMENT_NODE))?;
            Ok(Value::Object(document))
        })),
    );

    let html_document = b.prototype("HTMLDocumentPrototype", proto);
    b.interface("HTMLDocument", html_document, None);
    html_document
}

fn install_events(b: &mut RealmBuilder<'_>) {
    let realm = b.realm();
    let event_proto = b.prototype("EventPrototype", b.object_proto());
    b.getter(event_proto, "type", |host, this, _| {
        let event = host.this_branded(&this, "type")?;
        Ok(host.slot(event, "type").unwrap_or_default())
    });
    b.getter(event_proto, "target", |host, this, _| {
        let event = host.this_branded(&this, "type")?;
        Ok(host.slot(event, "target").unwrap_or(Value::Null))
    });
    b.getter(event_proto, "defaultPrevented", |host, this, _| {
        let event = host.this_branded(&this, "type")?;
        Ok(Value::Bool(host.slot(event, "defaultPrevented").is_some_and(|v| v.is_truthy())))
    });
    b.method(event_proto, "preventDefault", |host, this, _| {
        let event = host.this_branded(&this, "type")?;
        host.set_slot(event, "defaultPrevented", Value::Bool(true))?;
        Ok(Value::Undefined)
    });

    let create_event = move |host: &Host, args: &[Value], class_name: &str, proto: ObjectId| -> HostResult<ObjectId> {
        let Some(event_type) = args.first() else {
            return Err(HostError::type_error(format!(
                "Failed to construct '{}': 1 argument required, but only 0 present.",
                class_name
            )));
        };
        let event = host.alloc_object(realm, class_name, Some(proto));
        host.set_slot(event, "type", Value::string(&host.to_display_string(event_type)))?;
        host.set_slot(event, "target", Value::Null)?;
        host.set_slot(event, "defaultPrevented", Value::Bool(false))?;
        Ok(event)
    };
    b.interface(
        "Event",
        event_proto,
        Some(construct_fn(move |host, args| {
            Ok(Value::Object(create_event(host, args, "Event", event_proto)?))
        })),
    );

    let custom_proto = b.prototype("CustomEventPrototype", event_proto);
    b.getter(custom_proto, "detail", |host, this, _| {
        let event = host.this_branded(&this, "type")?;
        Ok(host.slot(event, "detail").unwrap_or(Value::Null))
    });
    b.interface(
        "CustomEvent",
        custom_proto,
        Some(construct_fn(move |host, args| {
            let event = create_event(host, args, "CustomEvent", custom_proto)?;
            let detail = match arg(args, 1) {
                Value::Object(init) => host.get(init, &"detail".into())?,
                _ => Value::Null,
            };
            host.set_slot(event, "detail", detail)?;
            Ok(Value::Object(event))
        })),
    );
}

fn install_location(b: &mut RealmBuilder<'_>) -> ObjectId {
    let proto = b.prototype("LocationPrototype", b.object_proto());
    b.interface("Location", proto, None);

    let location = b.object("Location", Some(proto));
    let _ = b.host().set_slot(location, "href", Value::string("about:blank"));
    let get_href = b.native("get href", |host, this, _| {
        let location = host.this_branded(&this, "href")?;
        Ok(host.slot(location, "href").unwrap_or_default())
    });
    let set_href = b.native("set href", |host, this, args| {
        let location = host.this_branded(&this, "href")?;
        host.set_slot(location, "href", Value::string(&host.to_display_string(&arg(args, 0))))?;
        Ok(Value::Undefined)
    });
    b.put(
        location,
        "href",
        PropertyDescriptor::Accessor {
            get: Some(get_href),
            set: Some(set_href),
            enumerable: true,
            configurable: false,
        },
    );
    location
}

fn install_window(
    b: &mut RealmBuilder<'_>,
    event_target: ObjectId,
    document: ObjectId,
    location: ObjectId,
) -> ObjectId {
    let proto = b.prototype("WindowPrototype", event_target);
    b.interface("Window", proto, None);

    let global = b.object("Window", Some(proto));
    for (name, value) in b.globals().to_vec() {
        b.value(global, name, Value::Object(value));
    }
    for name in ["window", "self", "top", "parent"] {
        b.put(global, name, PropertyDescriptor::data(Value::Object(global)));
    }

    let get_document = b.native("get document", move |_, _, _| Ok(Value::Object(document)));
    b.put(
        global,
        "document",
        PropertyDescriptor::Accessor {
            get: Some(get_document),
            set: None,
            enumerable: true,
            configurable: false,
        },
    );
    let get_location = b.native("get location", move |_, _, _| Ok(Value::Object(location)));
    let set_location = b.native("set location", move |host, _, args| {
        host.set(location, &"href".into(), arg(args, 0))?;
        Ok(Value::Undefined)
    });
    b.put(
        global,
        "location",
        PropertyDescriptor::Accessor {
            get: Some(get_location),
            set: Some(set_location),
            enumerable: true,
            configurable: false,
        },
    );
    global
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(host: &Host) -> Value {
        Value::Object(host.realm(host.main_realm()).unwrap().document())
    }

    fn create_div(host: &Host) -> Value {
        host.invoke(&document(host), "createElement", &[Value::string("div")])
            .unwrap()
    }

    #[test]
    fn test_create_element_class_and_prototype_chain() {
        let host = Host::new();
        let div = create_div(&host);
        assert_eq!(host.class_of(&div), "HTMLDivElement");

        let realm = host.realm(host.main_realm()).unwrap();
        let element_proto = realm.intrinsic("Element.prototype").unwrap();
        let mut proto = host.prototype_of(div.as_object().unwrap());
        let mut found = false;
        while let Some(p) = proto {
            found |= p == element_proto;
            proto = host.prototype_of(p);
        }
        assert!(found);
    }

    #[test]
    fn test_outer_html_reads_inner_html() {
        let host = Host::new();
        let div = create_div(&host);
        let id = div.as_object().unwrap();
        host.set(id, &"innerHTML".into(), Value::string("hi")).unwrap();

        let outer = host.get(id, &"outerHTML".into()).unwrap();
        assert_eq!(outer.as_str(), Some("<div>hi</div>"));
    }

    #[test]
    fn test_native_method_rejects_proxy_receiver() {
        let host = Host::new();
        let div = create_div(&host);
        let proxy = host
            .create_proxy(div.as_object().unwrap(), Rc::new(crate::proxy::ForwardingHandler))
            .unwrap();

        let err = host.invoke(&Value::Object(proxy), "cloneNode", &[]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Illegal invocation");
    }

    #[test]
    fn test_append_child_rejects_proxy_argument() {
        let host = Host::new();
        let parent = create_div(&host);
        let child = create_div(&host);
        let proxy = host
            .create_proxy(child.as_object().unwrap(), Rc::new(crate::proxy::ForwardingHandler))
            .unwrap();

        assert!(host.invoke(&parent, "appendChild", &[Value::Object(proxy)]).is_err());
        host.invoke(&parent, "appendChild", &[child.clone()]).unwrap();
        let first = host.get(parent.as_object().unwrap(), &"firstChild".into()).unwrap();
        assert_eq!(first, child);
    }

    #[test]
    fn test_clone_node_deep_copies_children() {
        let host = Host::new();
        let parent = create_div(&host);
        let child = create_div(&host);
        host.invoke(&parent, "appendChild", &[child.clone()]).unwrap();

        let shallow = host.invoke(&parent, "cloneNode", &[]).unwrap();
        let deep = host.invoke(&parent, "cloneNode", &[Value::Bool(true)]).unwrap();
        assert_ne!(shallow, parent);
        assert_eq!(host.get(shallow.as_object().unwrap(), &"firstChild".into()).unwrap(), Value::Null);
        let copied = host.get(deep.as_object().unwrap(), &"firstChild".into()).unwrap();
        assert!(copied.is_object());
        assert_ne!(copied, child);
    }

    #[test]
    fn test_dispatch_event_runs_listeners_in_order() {
        let host = Host::new();
        let realm = host.main_realm();
        let target = create_div(&host);
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = Rc::clone(&seen);
            let callback = host.create_script_function(realm, label, "function () {}", move |_, _, _| {
                seen.borrow_mut().push(label);
                Ok(Value::Undefined)
            });
            host.invoke(&target, "addEventListener", &[Value::string("ping"), Value::Object(callback)])
                .unwrap();
        }

        let event_ctor = host.realm(realm).unwrap().intrinsic("Event").unwrap();
        let event = host.construct(&Value::Object(event_ctor), &[Value::string("ping")]).unwrap();
        host.invoke(&target, "dispatchEvent", &[event.clone()]).unwrap();

        assert_eq!(*seen.borrow(), vec!["first", "second"]);
        assert_eq!(host.get(event.as_object().unwrap(), &"target".into()).unwrap(), target);
    }

    #[test]
    fn test_custom_event_detail() {
        let host = Host::new();
        let realm = host.main_realm();
        let ctor = host.realm(realm).unwrap().intrinsic("CustomEvent").unwrap();
        let init = host.create_plain_object(realm);
        host.set(init, &"detail".into(), Value::Number(5.0)).unwrap();

        let event = host
            .construct(&Value::Object(ctor), &[Value::string("x"), Value::Object(init)])
            .unwrap();
        assert_eq!(host.get(event.as_object().unwrap(), &"detail".into()).unwrap(), Value::Number(5.0));
        assert!(host.construct(&Value::Object(ctor), &[]).is_err());
    }

    #[test]
    fn test_global_bindings() {
        let host = Host::new();
        let realm = host.realm(host.main_realm()).unwrap();
        let global = realm.global();

        assert_eq!(host.get(global, &"window".into()).unwrap(), Value::Object(global));
        assert_eq!(host.get(global, &"document".into()).unwrap(), Value::Object(realm.document()));
        let document_desc = host.get_own_property(global, &"document".into()).unwrap();
        assert!(!document_desc.configurable());
        assert_eq!(host.class_of(&Value::Object(global)), "Window");
        assert_eq!(host.class_of(&Value::Object(realm.document())), "HTMLDocument");
    }
}
