use super::parse::Node;
use super::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Names a payload defines while it runs.
///
/// Outlives the interpreter so the harness can inspect what the payload left
/// behind. Procedures defined here shadow builtins and mock operations of
/// the same name.
#[derive(Debug, Default)]
pub struct Namespace {
    vars: BTreeMap<String, Value>,
    procs: BTreeMap<String, Rc<[Node]>>,
}

impl Namespace {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    pub fn define(&mut self, name: &str, body: Rc<[Node]>) {
        self.procs.insert(name.to_string(), body);
    }

    pub fn procedure(&self, name: &str) -> Option<Rc<[Node]>> {
        self.procs.get(name).cloned()
    }

    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procs.keys().map(String::as_str)
    }
}
