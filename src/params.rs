//! Parameter bookkeeping for a logical query and its subqueries.
//!
//! One registry is shared across a query tree, so positional names
//! (`param_0`, `param_1`, ...) are unique per logical query regardless of
//! which builder registered them. A parameter is either bound to a value or
//! pending; the content query's `ids` parameter stays pending until the id
//! query has executed.

use crate::value::Value;
use hashbrown::HashMap;

/// One parameter of the rendered query, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub name: String,
    /// `None` while the parameter is pending.
    pub value: Option<Value>,
}

impl ParameterBinding {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ParameterRegistry {
    params: Vec<ParameterBinding>,
    index: HashMap<String, usize>,
    positional: usize,
}

impl ParameterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the next positional parameter bound to `value` and returns
    /// its generated name.
    pub(crate) fn add_positional(&mut self, value: Value) -> String {
        let name = format!("param_{}", self.positional);
        self.positional += 1;
        self.index.insert(name.clone(), self.params.len());
        self.params.push(ParameterBinding {
            name: name.clone(),
            value: Some(value),
        });
        name
    }

    /// Registers a named parameter as pending if it is not known yet.
    pub(crate) fn register_named(&mut self, name: &str) {
        if !self.index.contains_key(name) {
            self.index.insert(name.to_owned(), self.params.len());
            self.params.push(ParameterBinding {
                name: name.to_owned(),
                value: None,
            });
        }
    }

    /// Binds a value to a named parameter, registering it first if needed.
    pub(crate) fn bind(&mut self, name: &str, value: Value) {
        self.register_named(name);
        let slot = self.index[name];
        self.params[slot].value = Some(value);
    }

    pub(crate) fn bindings(&self) -> Vec<ParameterBinding> {
        self.params.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_names_count_up() {
        let mut registry = ParameterRegistry::new();
        assert_eq!(registry.add_positional(Value::Int(1)), "param_0");
        assert_eq!(registry.add_positional(Value::Int(2)), "param_1");
    }

    #[test]
    fn named_parameters_stay_pending_until_bound() {
        let mut registry = ParameterRegistry::new();
        registry.register_named("age");
        assert!(registry.bindings()[0].is_pending());
        registry.bind("age", Value::Int(30));
        assert_eq!(registry.bindings()[0].value, Some(Value::Int(30)));
    }

    #[test]
    fn binding_twice_overwrites() {
        let mut registry = ParameterRegistry::new();
        registry.bind("age", Value::Int(1));
        registry.bind("age", Value::Int(2));
        let bindings = registry.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].value, Some(Value::Int(2)));
    }
}
