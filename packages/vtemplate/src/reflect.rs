//! Member lookup and type instantiation.
//!
//! This is the only place that inspects the shape of a [`Value`] by member
//! name. Expressions and tags call into it and never match on host objects
//! themselves.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::RenderError;
use crate::value::Value;

/// Builds a fresh instance of a registered type.
pub type TypeConstructor = Arc<dyn Fn() -> Value + Send + Sync>;

/// Named constructors that `<vt:property type="...">` can instantiate.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: IndexMap<String, TypeConstructor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn create_instance(&self, name: &str) -> Result<Value, RenderError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| RenderError::UnknownType(name.to_string()))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

/// Field or property lookup. `None` when `instance` has no such member.
pub fn get_property_value(instance: &Value, name: &str) -> Option<Value> {
    match instance {
        Value::Map(map) => map.get(name).cloned().or_else(|| builtin(instance, name)),
        Value::Object(obj) => obj.get_property(name),
        _ => builtin(instance, name),
    }
}

/// Zero-argument method call. `None` when `instance` has no such method.
pub fn call_method(instance: &Value, name: &str) -> Option<Value> {
    match instance {
        Value::Object(obj) => obj.call_method(name),
        _ => builtin(instance, name),
    }
}

/// Resolve one accessor of a member chain. A null instance yields null.
pub fn get_member(instance: &Value, name: &str, is_method: bool) -> Result<Value, RenderError> {
    if instance.is_null() {
        return Ok(Value::Null);
    }
    let found = if is_method {
        call_method(instance, name)
    } else {
        get_property_value(instance, name)
    };
    found.ok_or_else(|| RenderError::MissingMember {
        member: name.to_string(),
        type_name: instance.type_name().to_string(),
    })
}

fn builtin(instance: &Value, name: &str) -> Option<Value> {
    match (instance, name) {
        (Value::String(s), "len") => Some(Value::from(s.chars().count())),
        (Value::String(s), "upper") => Some(Value::from(s.to_uppercase())),
        (Value::String(s), "lower") => Some(Value::from(s.to_lowercase())),
        (Value::String(s), "trim") => Some(Value::from(s.trim())),
        (Value::List(items), "len") => Some(Value::from(items.len())),
        (Value::List(items), "first") => Some(items.first().cloned().unwrap_or_default()),
        (Value::List(items), "last") => Some(items.last().cloned().unwrap_or_default()),
        (Value::Map(map), "len") => Some(Value::from(map.len())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::HostObject;

    #[derive(Debug)]
    struct Clock;

    impl HostObject for Clock {
        fn type_name(&self) -> &str {
            "Clock"
        }

        fn get_property(&self, name: &str) -> Option<Value> {
            (name == "Now").then(|| Value::from("12:00"))
        }

        fn call_method(&self, name: &str) -> Option<Value> {
            (name == "tick").then(|| Value::from(1))
        }
    }

    #[test]
    fn test_object_members() {
        let clock = Value::object(Clock);
        assert_eq!(get_member(&clock, "Now", false).unwrap(), Value::from("12:00"));
        assert_eq!(get_member(&clock, "tick", true).unwrap(), Value::from(1));
        assert_eq!(
            get_member(&clock, "Later", false),
            Err(RenderError::MissingMember {
                member: "Later".to_string(),
                type_name: "Clock".to_string(),
            })
        );
    }

    #[test]
    fn test_null_instance_short_circuits() {
        assert_eq!(get_member(&Value::Null, "anything", false).unwrap(), Value::Null);
    }

    #[test]
    fn test_builtin_members() {
        let name = Value::from(" Ada ");
        assert_eq!(get_member(&name, "trim", true).unwrap(), Value::from("Ada"));
        assert_eq!(get_member(&name, "len", false).unwrap(), Value::from(5));
        let list = Value::from(vec!["a", "b"]);
        assert_eq!(get_member(&list, "last", false).unwrap(), Value::from("b"));
        assert!(get_member(&Value::from(3), "len", false).is_err());
    }

    #[test]
    fn test_map_keys_shadow_builtins() {
        let mut map = IndexMap::new();
        map.insert("len".to_string(), Value::from("custom"));
        let value = Value::Map(map);
        assert_eq!(get_property_value(&value, "len"), Some(Value::from("custom")));
    }

    #[test]
    fn test_type_registry() {
        let mut types = TypeRegistry::new();
        types.register("Clock", || Value::object(Clock));
        assert!(types.contains("Clock"));
        assert_eq!(types.create_instance("Clock").unwrap().type_name(), "Clock");
        assert_eq!(
            types.create_instance("Calendar"),
            Err(RenderError::UnknownType("Calendar".to_string()))
        );
        assert_eq!(format!("{:?}", types), "{\"Clock\"}");
    }
}
