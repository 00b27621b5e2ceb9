//! Heuristic registry: ordered guessing rules for overly general variables.
//!
//! A rule looks at one variable (its name, owner and bounds) and may
//! propose a single type. The oracle slot is privileged: it proposes a
//! ranked list obtained from the session's similarity oracle. Rules run in
//! registration order and the first accepted guess wins.

use std::fmt;

use gradus_types::{ClassTable, Ty, TyVar};

use crate::bounds::VarInfo;

/// What a rule sees when asked for a guess.
pub struct RuleCtx<'a> {
    pub var: TyVar,
    pub info: &'a VarInfo,
    pub classes: &'a ClassTable,
}

impl RuleCtx<'_> {
    /// The variable's name without instance/class variable sigils.
    pub fn base_name(&self) -> &str {
        self.info.name.trim_start_matches('@')
    }
}

/// A rule's answer.
#[derive(Clone, Debug, PartialEq)]
pub enum Guess {
    None,
    One(Ty),
    /// Best first. Only the oracle answers this way.
    Ranked(Vec<Ty>),
}

pub type GuessFn = Box<dyn Fn(&RuleCtx<'_>) -> Option<Ty>>;

pub struct NamedRule {
    pub name: String,
    guess: GuessFn,
}

impl NamedRule {
    pub fn new(name: impl Into<String>, guess: impl Fn(&RuleCtx<'_>) -> Option<Ty> + 'static) -> Self {
        NamedRule {
            name: name.into(),
            guess: Box::new(guess),
        }
    }

    pub fn guess(&self, ctx: &RuleCtx<'_>) -> Option<Ty> {
        (self.guess)(ctx)
    }
}

impl fmt::Debug for NamedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedRule").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Rule {
    Named(NamedRule),
    /// Ask the session's similarity oracle.
    Oracle,
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::Named(rule) => &rule.name,
            Rule::Oracle => "oracle",
        }
    }

    pub fn is_oracle(&self) -> bool {
        matches!(self, Rule::Oracle)
    }
}

/// Ordered rule list.
#[derive(Default, Debug)]
pub struct HeuristicRegistry {
    rules: Vec<Rule>,
}

impl HeuristicRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in naming rules followed by the oracle slot.
    pub fn with_defaults() -> Self {
        let mut registry = HeuristicRegistry::new();
        registry.register_named("struct_to_nominal", struct_to_nominal);
        registry.register_named("predicate_method", predicate_method);
        registry.register_named("int_names", int_names);
        registry.register_named("int_array_name", int_array_name);
        registry.register_named("string_name", string_name);
        registry.register_named("is_model", is_model);
        registry.register(Rule::Oracle);
        registry
    }

    pub fn register(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn register_named(
        &mut self,
        name: impl Into<String>,
        guess: impl Fn(&RuleCtx<'_>) -> Option<Ty> + 'static,
    ) {
        self.register(Rule::Named(NamedRule::new(name, guess)));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Built-in rules ─────────────────────────────────────────────────────

/// A structural upper bound answered by exactly one known class.
fn struct_to_nominal(ctx: &RuleCtx<'_>) -> Option<Ty> {
    let mut methods: Vec<&str> = Vec::new();
    for ub in ctx.info.upper_tys() {
        let structural = match ub {
            Ty::Structural(ms) => Some(ms),
            Ty::Intersection(members) => members.iter().find_map(|m| match m {
                Ty::Structural(ms) => Some(ms),
                _ => None,
            }),
            _ => None,
        };
        if let Some(ms) = structural {
            methods.extend(ms.keys().map(String::as_str));
        }
    }
    if methods.is_empty() {
        return None;
    }
    methods.sort_unstable();
    methods.dedup();
    match ctx.classes.classes_responding_to(methods.iter().copied()).as_slice() {
        [only] => Some(Ty::nominal(only.clone())),
        _ => None,
    }
}

fn predicate_method(ctx: &RuleCtx<'_>) -> Option<Ty> {
    ctx.base_name().ends_with('?').then(Ty::bool)
}

fn int_names(ctx: &RuleCtx<'_>) -> Option<Ty> {
    let name = ctx.base_name();
    let exact = matches!(name, "id" | "count" | "size" | "len" | "length" | "index");
    let affixed = name.ends_with("_id")
        || name.ends_with("_count")
        || name.ends_with("_num")
        || name.starts_with("num_");
    (exact || affixed).then(Ty::int)
}

fn int_array_name(ctx: &RuleCtx<'_>) -> Option<Ty> {
    ctx.base_name()
        .ends_with("_ids")
        .then(|| Ty::array(Ty::int()))
}

fn string_name(ctx: &RuleCtx<'_>) -> Option<Ty> {
    let name = ctx.base_name();
    let exact = matches!(name, "name" | "title" | "msg" | "message" | "text" | "path");
    let affixed = name.ends_with("_name") || name.ends_with("_str");
    (exact || affixed).then(Ty::string)
}

/// The camel-cased name is a known user class (`line_item` -> `LineItem`).
fn is_model(ctx: &RuleCtx<'_>) -> Option<Ty> {
    let class = camelize(ctx.base_name());
    if class.is_empty() || !ctx.classes.contains(&class) || ctx.classes.is_library(&class) {
        return None;
    }
    Some(Ty::nominal(class))
}

fn camelize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
