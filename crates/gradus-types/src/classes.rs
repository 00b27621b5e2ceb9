//! The class table: the seam through which the engine sees the catalogue
//! of known classes.
//!
//! The full library catalogue is supplied by the host. The table records,
//! per class, its parent, the methods it declares (optionally with a
//! signature) and whether it belongs to the standard library. Nominal
//! subtyping, structural checks and several heuristics consult it.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::sig::MethodTy;

/// Root of every hierarchy.
pub const ROOT_CLASS: &str = "BasicObject";
/// Implicit parent of classes declared without one.
pub const OBJECT_CLASS: &str = "Object";

/// What the table knows about one class.
#[derive(Clone, Debug, Default)]
pub struct ClassInfo {
    /// `None` only for the hierarchy root.
    pub parent: Option<String>,
    /// Declared methods, keyed by name. The signature is optional: many
    /// catalogue entries only record that a method exists.
    pub methods: FxHashMap<String, Option<MethodTy>>,
    /// Part of the standard library rather than user code.
    pub library: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ClassTable {
    classes: FxHashMap<String, ClassInfo>,
}

/// (class, parent, methods) for the minimal built-in core.
const BUILTINS: &[(&str, Option<&str>, &[&str])] = &[
    ("BasicObject", None, &["==", "!", "equal?"]),
    ("Object", Some("BasicObject"), &["to_s", "inspect", "hash", "class", "nil?", "freeze"]),
    ("Nil", Some("Object"), &["to_a", "to_h"]),
    ("Numeric", Some("Object"), &["+", "-", "*", "/", "<", ">", "abs", "zero?"]),
    ("Int", Some("Numeric"), &["times", "succ", "even?", "odd?", "to_i"]),
    ("Float", Some("Numeric"), &["round", "floor", "ceil", "nan?", "to_f"]),
    ("String", Some("Object"), &["length", "size", "upcase", "downcase", "+", "split", "strip", "empty?", "gsub", "to_sym", "to_str"]),
    ("Symbol", Some("Object"), &["to_proc", "length", "size", "upcase", "to_sym"]),
    ("True", Some("Object"), &["&", "|", "^"]),
    ("False", Some("Object"), &["&", "|", "^"]),
    ("Array", Some("Object"), &["each", "map", "size", "length", "first", "last", "<<", "push", "empty?", "include?", "[]", "to_a"]),
    ("Hash", Some("Object"), &["each", "keys", "values", "[]", "[]=", "key?", "fetch", "size", "empty?", "to_h"]),
    ("Proc", Some("Object"), &["call", "arity", "to_proc"]),
    ("Range", Some("Object"), &["each", "first", "last", "include?", "to_a"]),
];

impl ClassTable {
    /// An empty table. Unknown classes still descend from `Object`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded with the built-in core classes.
    pub fn with_builtins() -> Self {
        let mut table = ClassTable::new();
        for (name, parent, methods) in BUILTINS {
            let info = table.classes.entry((*name).to_string()).or_default();
            info.parent = parent.map(str::to_string);
            info.library = true;
            for m in *methods {
                info.methods.insert((*m).to_string(), None);
            }
        }
        table
    }

    /// Declare (or re-parent) a class. A missing parent means `Object`.
    pub fn define(&mut self, name: &str, parent: Option<&str>) -> &mut ClassInfo {
        let parent = if name == ROOT_CLASS {
            None
        } else {
            Some(parent.unwrap_or(OBJECT_CLASS).to_string())
        };
        let info = self.classes.entry(name.to_string()).or_default();
        info.parent = parent;
        info
    }

    /// Record that `class` declares `method`, declaring the class if needed.
    pub fn define_method(&mut self, class: &str, method: &str, sig: Option<MethodTy>) {
        if !self.classes.contains_key(class) {
            self.define(class, None);
        }
        if let Some(info) = self.classes.get_mut(class) {
            info.methods.insert(method.to_string(), sig);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_library(&self, name: &str) -> bool {
        self.classes.get(name).map_or(false, |c| c.library)
    }

    /// `name` followed by its ancestors, nearest first.
    ///
    /// Unknown classes are assumed to inherit from `Object`. Cycles in a
    /// malformed table are cut at the first repeated class.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(name.to_string());
        while let Some(class) = current {
            if !seen.insert(class.clone()) {
                break;
            }
            current = match self.classes.get(&class) {
                Some(info) => info.parent.clone(),
                None if class == ROOT_CLASS => None,
                None if class == OBJECT_CLASS => Some(ROOT_CLASS.to_string()),
                None => Some(OBJECT_CLASS.to_string()),
            };
            chain.push(class);
        }
        chain
    }

    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.ancestors(sub).iter().any(|a| a == sup)
    }

    /// Whether instances of `class` respond to `method`, looking through
    /// the ancestor chain.
    pub fn responds_to(&self, class: &str, method: &str) -> bool {
        self.ancestors(class).iter().any(|a| {
            self.classes
                .get(a)
                .map_or(false, |info| info.methods.contains_key(method))
        })
    }

    /// The declared signature of `class#method`, if any ancestor records one.
    pub fn method_sig(&self, class: &str, method: &str) -> Option<&MethodTy> {
        for a in self.ancestors(class) {
            if let Some(Some(sig)) = self.classes.get(&a).and_then(|info| info.methods.get(method)) {
                return Some(sig);
            }
        }
        None
    }

    /// Every known class that responds to all of `methods`, sorted by name.
    pub fn classes_responding_to<'a, I>(&self, methods: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let mut found: Vec<String> = self
            .classes
            .keys()
            .filter(|class| methods.clone().into_iter().all(|m| self.responds_to(class, m)))
            .cloned()
            .collect();
        found.sort();
        found
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ancestry() {
        let table = ClassTable::with_builtins();
        assert_eq!(table.ancestors("Int"), vec!["Int", "Numeric", "Object", "BasicObject"]);
        assert!(table.is_subclass("Float", "Numeric"));
        assert!(!table.is_subclass("String", "Numeric"));
        assert!(table.is_library("Hash"));
    }

    #[test]
    fn unknown_classes_descend_from_object() {
        let table = ClassTable::new();
        assert_eq!(table.ancestors("Widget"), vec!["Widget", "Object", "BasicObject"]);
        assert!(table.is_subclass("Widget", "Object"));
    }

    #[test]
    fn user_classes_inherit_methods() {
        let mut table = ClassTable::with_builtins();
        table.define("Account", None);
        table.define_method("Account", "balance", None);
        table.define("Savings", Some("Account"));
        assert!(table.responds_to("Savings", "balance"));
        assert!(table.responds_to("Savings", "to_s"));
        assert!(!table.is_library("Savings"));
    }

    #[test]
    fn classes_responding_to_all_methods() {
        let mut table = ClassTable::with_builtins();
        table.define_method("Account", "balance", None);
        table.define_method("Account", "deposit", None);
        table.define_method("Ledger", "balance", None);
        assert_eq!(
            table.classes_responding_to(["balance", "deposit"]),
            vec!["Account".to_string()]
        );
        assert_eq!(table.classes_responding_to(["balance"]).len(), 2);
    }

    #[test]
    fn cyclic_parents_terminate() {
        let mut table = ClassTable::new();
        table.define("A", Some("B"));
        table.define("B", Some("A"));
        assert_eq!(table.ancestors("A"), vec!["A", "B"]);
    }
}
