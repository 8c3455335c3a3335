//! Scopes over the data graph.
//!
//! A scope is the data value in effect for a node. It is either an
//! addressable location inside a data source (writable by controls), a
//! computed value that only lives for the current pass, or undefined.
//!
//! ## Lookup rules
//!
//! 1. Objects are indexed by member name.
//! 2. Arrays are indexed by canonical decimal index (`"01"` misses).
//! 3. Arrays and strings expose a read-only `length` member.
//! 4. A `null` member counts as missing: the lookup is undefined.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{BindError, Result};
use crate::path::VarSpec;
use crate::value::{kind_name, scale};

/// The host-owned data graph. Controls write into it in place.
pub type DataSource = Rc<RefCell<Value>>;

pub fn data_source(value: Value) -> DataSource {
    Rc::new(RefCell::new(value))
}

#[derive(Debug, Clone)]
pub enum Scope {
    Undefined,
    Live { root: DataSource, path: Vec<String> },
    Detached(Rc<Value>),
}

impl Scope {
    pub fn root(source: &DataSource) -> Self {
        Scope::Live {
            root: Rc::clone(source),
            path: Vec::new(),
        }
    }

    pub fn detached(value: Value) -> Self {
        Scope::Detached(Rc::new(value))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Scope::Undefined)
    }

    /// Location of a live scope, relative to its data source root.
    pub fn path(&self) -> Option<&[String]> {
        match self {
            Scope::Live { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Evaluates `spec` against this scope. Any missing segment yields
    /// `Undefined`; a scale turns the result into a detached value.
    pub fn narrow(&self, spec: &VarSpec) -> Scope {
        match self {
            Scope::Undefined => Scope::Undefined,
            Scope::Live { root, path } => {
                let mut full = path.clone();
                full.extend(spec.segments.iter().cloned());

                let data = root.borrow();
                let Some(found) = resolve(&data, &full) else {
                    return Scope::Undefined;
                };
                match spec.scale {
                    Some(factor) => scaled(&found, factor),
                    None => Scope::Live {
                        root: Rc::clone(root),
                        path: full,
                    },
                }
            }
            Scope::Detached(value) => match resolve(value, &spec.segments) {
                None => Scope::Undefined,
                Some(found) => match spec.scale {
                    Some(factor) => scaled(&found, factor),
                    None => Scope::detached(found.into_owned()),
                },
            },
        }
    }

    /// Borrows the value this scope currently resolves to.
    ///
    /// The data source stays borrowed while `f` runs; `f` must not write
    /// into it.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        match self {
            Scope::Undefined => f(None),
            Scope::Live { root, path } => {
                let data = root.borrow();
                let found = resolve(&data, path);
                let result = f(found.as_deref());
                result
            }
            Scope::Detached(value) => f(Some(value.as_ref())),
        }
    }

    pub fn value(&self) -> Option<Value> {
        self.with_value(|value| value.cloned())
    }

    /// Splits a live scope into its container and its member name there.
    pub fn split_location(&self) -> Option<(Scope, String)> {
        match self {
            Scope::Live { root, path } => {
                let (last, rest) = path.split_last()?;
                Some((
                    Scope::Live {
                        root: Rc::clone(root),
                        path: rest.to_vec(),
                    },
                    last.clone(),
                ))
            }
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Scope::Undefined => "undefined".to_string(),
            Scope::Live { path, .. } if path.is_empty() => "<root>".to_string(),
            Scope::Live { path, .. } => path.join("."),
            Scope::Detached(_) => "<computed>".to_string(),
        }
    }

    /// Writes `new_value` into member `variable` of the container this scope
    /// points at, returning the previous member value.
    pub fn assign(&self, variable: &str, new_value: Value) -> Result<Option<Value>> {
        let path = self.describe();
        let variable_name = || variable.to_string();

        let (root, location) = match self {
            Scope::Undefined => {
                return Err(BindError::UndefinedContainer {
                    path,
                    variable: variable_name(),
                })
            }
            Scope::Detached(_) => {
                return Err(BindError::Detached {
                    path,
                    variable: variable_name(),
                })
            }
            Scope::Live {
                root,
                path: location,
            } => (root, location),
        };

        let mut data = root.borrow_mut();
        let Some(container) = resolve_mut(&mut data, location) else {
            return Err(BindError::UndefinedContainer {
                path,
                variable: variable_name(),
            });
        };

        match container {
            Value::Object(members) => Ok(members.insert(variable_name(), new_value)),
            Value::Array(items) => {
                let Some(index) = array_index(variable) else {
                    return Err(BindError::NotAnIndex {
                        path,
                        variable: variable_name(),
                    });
                };
                if index < items.len() {
                    Ok(Some(std::mem::replace(&mut items[index], new_value)))
                } else if index == items.len() {
                    items.push(new_value);
                    Ok(None)
                } else {
                    Err(BindError::IndexOutOfRange {
                        path,
                        index: variable_name(),
                        len: items.len(),
                    })
                }
            }
            other => Err(BindError::NotAContainer {
                path,
                variable: variable_name(),
                kind: kind_name(other),
            }),
        }
    }
}

fn scaled(value: &Value, factor: f64) -> Scope {
    scale(value, factor)
        .map(Scope::detached)
        .unwrap_or(Scope::Undefined)
}

fn array_index(name: &str) -> Option<usize> {
    let index: usize = name.parse().ok()?;
    (index.to_string() == name).then_some(index)
}

fn member<'v>(value: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
    let found = match value {
        Value::Object(members) => members.get(name).map(Cow::Borrowed),
        Value::Array(items) => match array_index(name) {
            Some(index) => items.get(index).map(Cow::Borrowed),
            None if name == "length" => Some(Cow::Owned(Value::from(items.len()))),
            None => None,
        },
        Value::String(s) if name == "length" => {
            Some(Cow::Owned(Value::from(s.encode_utf16().count())))
        }
        _ => None,
    };
    found.filter(|v| !v.is_null())
}

pub(crate) fn resolve<'v>(value: &'v Value, segments: &[String]) -> Option<Cow<'v, Value>> {
    let mut current = Cow::Borrowed(value);
    for segment in segments {
        current = match current {
            Cow::Borrowed(v) => member(v, segment)?,
            Cow::Owned(v) => Cow::Owned(member(&v, segment)?.into_owned()),
        };
    }
    Some(current)
}

fn resolve_mut<'v>(value: &'v mut Value, segments: &[String]) -> Option<&'v mut Value> {
    let mut current = value;
    for segment in segments {
        current = match current {
            Value::Object(members) => members.get_mut(segment)?,
            Value::Array(items) => items.get_mut(array_index(segment)?)?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn narrow(scope: &Scope, spec: &str) -> Scope {
        scope.narrow(&VarSpec::parse(spec))
    }

    #[test]
    fn test_nested_lookup() {
        let data = data_source(json!({"user": {"name": "Ada", "tags": ["x", "y"]}}));
        let root = Scope::root(&data);

        assert_eq!(narrow(&root, "user.name").value(), Some(json!("Ada")));
        assert_eq!(narrow(&root, "user.tags.1").value(), Some(json!("y")));
        assert_eq!(narrow(&root, "").value(), root.value());
        assert_eq!(
            narrow(&root, "user.name").path().unwrap(),
            &["user".to_string(), "name".to_string()]
        );
    }

    #[test]
    fn test_any_missing_segment_is_undefined() {
        let data = data_source(json!({"a": {"b": 1}, "n": null, "list": [1]}));
        let root = Scope::root(&data);

        for spec in ["x", "a.c", "a.b.c", "x.y.z", "n", "n.deeper", "list.1", "list.01"] {
            assert!(narrow(&root, spec).is_undefined(), "{} should miss", spec);
        }
        assert!(narrow(&Scope::Undefined, "").is_undefined());
        assert!(narrow(&Scope::Undefined, "a").is_undefined());
    }

    #[test]
    fn test_length_member() {
        let data = data_source(json!({"items": [1, 2, 3], "word": "héllo"}));
        let root = Scope::root(&data);
        assert_eq!(narrow(&root, "items.length").value(), Some(json!(3)));
        assert_eq!(narrow(&root, "word.length").value(), Some(json!(5)));
    }

    #[test]
    fn test_scale_detaches() {
        let data = data_source(json!({"ratio": 0.25}));
        let scoped = narrow(&Scope::root(&data), "ratio*100");
        assert!(matches!(scoped, Scope::Detached(_)));
        assert_eq!(scoped.value(), Some(json!(25.0)));
    }

    #[test]
    fn test_detached_narrowing() {
        let wrapped = Scope::detached(json!(["only"]));
        assert_eq!(narrow(&wrapped, "0").value(), Some(json!("only")));
        assert!(narrow(&wrapped, "1").is_undefined());
    }

    #[test]
    fn test_live_scope_sees_later_writes() {
        let data = data_source(json!({"x": 1}));
        let x = narrow(&Scope::root(&data), "x");
        data.borrow_mut()["x"] = json!(2);
        assert_eq!(x.value(), Some(json!(2)));
    }

    #[test]
    fn test_assign_object_member() {
        let data = data_source(json!({"form": {"name": "old"}}));
        let form = narrow(&Scope::root(&data), "form");

        let old = form.assign("name", json!("new")).unwrap();
        assert_eq!(old, Some(json!("old")));
        let old = form.assign("extra", json!(true)).unwrap();
        assert_eq!(old, None);
        assert_eq!(*data.borrow(), json!({"form": {"name": "new", "extra": true}}));
    }

    #[test]
    fn test_assign_array_slot() {
        let data = data_source(json!({"names": ["a", "b"]}));
        let names = narrow(&Scope::root(&data), "names");

        assert_eq!(names.assign("1", json!("B")).unwrap(), Some(json!("b")));
        assert_eq!(names.assign("2", json!("c")).unwrap(), None);
        assert!(matches!(
            names.assign("9", json!("z")),
            Err(BindError::IndexOutOfRange { len: 3, .. })
        ));
        assert!(matches!(
            names.assign("first", json!("z")),
            Err(BindError::NotAnIndex { .. })
        ));
        assert_eq!(*data.borrow(), json!({"names": ["a", "B", "c"]}));
    }

    #[test]
    fn test_assign_failures_leave_data_alone() {
        let data = data_source(json!({"count": 3}));
        let root = Scope::root(&data);

        assert!(matches!(
            narrow(&root, "missing").assign("x", json!(1)),
            Err(BindError::UndefinedContainer { .. })
        ));
        assert!(matches!(
            narrow(&root, "count").assign("x", json!(1)),
            Err(BindError::NotAContainer { kind: "number", .. })
        ));
        assert!(matches!(
            narrow(&root, "*2").assign("x", json!(1)),
            Err(BindError::Detached { .. })
        ));
        assert_eq!(*data.borrow(), json!({"count": 3}));
    }

    #[test]
    fn test_split_location() {
        let data = data_source(json!({"list": ["a"]}));
        let item = narrow(&Scope::root(&data), "list.0");
        let (container, member) = item.split_location().unwrap();
        assert_eq!(container.path().unwrap(), &["list".to_string()]);
        assert_eq!(member, "0");

        assert!(Scope::root(&data).split_location().is_none());
        assert!(Scope::detached(json!(1)).split_location().is_none());
    }
}
