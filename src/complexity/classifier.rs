use super::{suggestions, ComplexityReport, FunctionComplexity, GrowthClass};
use crate::core::ast::{function_definitions, named_children, node_line, PythonSource};
use tracing::debug;
use tree_sitter::Node;

const MODULE_ENTRY: &str = "<module>";
const COMPREHENSIONS: [&str; 4] = [
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];
const HASH_CONSTRUCTORS: [&str; 6] = [
    "dict",
    "set",
    "frozenset",
    "Counter",
    "defaultdict",
    "OrderedDict",
];

/// Classify every function in a fragment. Never fails: unparsable input
/// yields [`ComplexityReport::unknown`].
pub fn analyze(code: &str) -> ComplexityReport {
    match PythonSource::parse(code) {
        Ok(parsed) => analyze_source(&parsed),
        Err(err) => {
            debug!(error = %err, "complexity analysis skipped");
            ComplexityReport::unknown()
        }
    }
}

pub fn analyze_source(source: &PythonSource) -> ComplexityReport {
    let mut functions: Vec<FunctionComplexity> = function_definitions(source.root())
        .into_iter()
        .map(|func| classify_function(source, func))
        .collect();

    if let Some(module_entry) = classify_module(source) {
        functions.insert(0, module_entry);
    }

    ComplexityReport::from_functions(functions)
}

fn classify_function(source: &PythonSource, func: Node<'_>) -> FunctionComplexity {
    let name = func
        .child_by_field_name("name")
        .and_then(|n| source.text(n).ok())
        .unwrap_or("<anonymous>");

    let mut walker = FunctionWalker::new(source, name);
    if let Some(body) = func.child_by_field_name("body") {
        walker.walk(body, LoopContext::default());
    }

    build_entry(name, node_line(func), &walker.facts)
}

/// Loops at module level form their own entry.
fn classify_module(source: &PythonSource) -> Option<FunctionComplexity> {
    let mut walker = FunctionWalker::new(source, MODULE_ENTRY);
    walker.walk(source.root(), LoopContext::default());

    let facts = &walker.facts;
    (facts.max_depth > 0 || facts.sort_outside_loop).then(|| build_entry(MODULE_ENTRY, 1, facts))
}

fn build_entry(name: &str, line: usize, facts: &Facts) -> FunctionComplexity {
    // A recursion estimate replaces the loop-based class outright.
    let complexity = recursion_class(facts).unwrap_or_else(|| loop_class(facts));

    let mut hints: Vec<String> = suggestions::for_class(complexity)
        .iter()
        .map(|hint| hint.to_string())
        .collect();
    if facts.max_linear_depth >= 2 && !facts.uses_hash_lookup {
        hints.push(suggestions::nested_loop_without_lookup(name));
    }
    if facts.sort_inside_loop {
        hints.push(suggestions::sort_inside_loop(name));
    }

    FunctionComplexity {
        name: name.to_string(),
        line,
        complexity,
        max_loop_depth: facts.max_depth,
        has_recursion: facts.self_calls > 0,
        suggestions: hints,
    }
}

/// Class implied by loops and sorting, ignoring recursion.
fn loop_class(facts: &Facts) -> GrowthClass {
    let mut class = GrowthClass::from_loop_depth(facts.max_linear_depth);
    if facts.max_linear_depth == 1 && facts.nested_log {
        class = GrowthClass::Linearithmic;
    }
    if facts.max_linear_depth == 0 && facts.has_log_loop {
        class = GrowthClass::Logarithmic;
    }
    if facts.sort_outside_loop {
        class = class.max(GrowthClass::Linearithmic);
    }
    class
}

fn recursion_class(facts: &Facts) -> Option<GrowthClass> {
    if facts.self_calls == 0 {
        return None;
    }

    let divides = facts.self_call_divides || facts.halving_anywhere;
    let multi_branch = facts.self_calls >= 2 || facts.self_call_in_loop;
    // Partition-then-recurse (quicksort shape): linear work, recursion outside loops.
    let partitions = facts.max_linear_depth > 0 && !facts.self_call_in_loop;

    let class = if facts.permutation_shape {
        GrowthClass::Factorial
    } else if multi_branch {
        if divides || partitions {
            GrowthClass::Linearithmic
        } else {
            GrowthClass::Exponential
        }
    } else if divides {
        GrowthClass::Logarithmic
    } else {
        GrowthClass::Linear
    };
    Some(class)
}

#[derive(Debug, Default)]
struct Facts {
    max_depth: usize,
    max_linear_depth: usize,
    has_log_loop: bool,
    nested_log: bool,
    sort_outside_loop: bool,
    sort_inside_loop: bool,
    self_calls: usize,
    self_call_in_loop: bool,
    self_call_divides: bool,
    permutation_shape: bool,
    halving_anywhere: bool,
    uses_hash_lookup: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct LoopContext {
    depth: usize,
    linear: usize,
    in_log: bool,
}

struct FunctionWalker<'s> {
    source: &'s PythonSource,
    name: &'s str,
    facts: Facts,
}

impl<'s> FunctionWalker<'s> {
    fn new(source: &'s PythonSource, name: &'s str) -> Self {
        Self {
            source,
            name,
            facts: Facts::default(),
        }
    }

    /// Visit every node below `root`. Facts only accumulate, so the
    /// explicit stack may visit siblings in any order.
    fn walk(&mut self, root: Node<'_>, ctx: LoopContext) {
        let mut pending = Vec::new();
        push_children(&mut pending, root, ctx);
        while let Some((node, ctx)) = pending.pop() {
            self.visit(node, ctx, &mut pending);
        }
    }

    fn visit<'t>(
        &mut self,
        node: Node<'t>,
        ctx: LoopContext,
        pending: &mut Vec<(Node<'t>, LoopContext)>,
    ) {
        let kind = node.kind();
        if matches!(
            kind,
            "dictionary" | "set" | "dictionary_comprehension" | "set_comprehension"
        ) {
            self.facts.uses_hash_lookup = true;
        }

        match kind {
            // Nested definitions are classified on their own.
            "function_definition" | "class_definition" | "decorated_definition" => {}
            "for_statement" => {
                let inner = self.enter_loop(ctx, false);
                let iterable = node.child_by_field_name("right").map(|right| right.id());
                for child in named_children(node) {
                    let is_iterable = iterable == Some(child.id());
                    pending.push((child, if is_iterable { ctx } else { inner }));
                }
            }
            "while_statement" => {
                let inner = self.enter_loop(ctx, self.is_log_loop(node));
                push_children(pending, node, inner);
            }
            k if COMPREHENSIONS.contains(&k) => {
                let clauses = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "for_in_clause")
                    .count();
                let inner = (0..clauses).fold(ctx, |acc, _| self.enter_loop(acc, false));
                push_children(pending, node, inner);
            }
            "call" => {
                self.visit_call(node, ctx);
                push_children(pending, node, ctx);
            }
            "binary_operator" | "augmented_assignment" => {
                if self.is_halving(node) {
                    self.facts.halving_anywhere = true;
                }
                push_children(pending, node, ctx);
            }
            _ => push_children(pending, node, ctx),
        }
    }

    fn enter_loop(&mut self, ctx: LoopContext, logarithmic: bool) -> LoopContext {
        let depth = ctx.depth + 1;
        self.facts.max_depth = self.facts.max_depth.max(depth);

        if logarithmic {
            self.facts.has_log_loop = true;
            if ctx.linear > 0 {
                self.facts.nested_log = true;
            }
            return LoopContext {
                depth,
                linear: ctx.linear,
                in_log: true,
            };
        }

        if ctx.in_log {
            self.facts.nested_log = true;
        }
        let linear = ctx.linear + 1;
        self.facts.max_linear_depth = self.facts.max_linear_depth.max(linear);
        LoopContext {
            depth,
            linear,
            in_log: ctx.in_log,
        }
    }

    fn visit_call(&mut self, call: Node<'_>, ctx: LoopContext) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        let callee = self.callee(function);

        match callee {
            Callee::Plain("sorted") | Callee::Method(_, "sort") => {
                if ctx.linear > 0 {
                    self.facts.sort_inside_loop = true;
                } else {
                    self.facts.sort_outside_loop = true;
                }
            }
            Callee::Plain(name) if HASH_CONSTRUCTORS.contains(&name) => {
                self.facts.uses_hash_lookup = true;
            }
            _ => {}
        }

        let is_self_call = match callee {
            Callee::Plain(name) => name == self.name,
            Callee::Method(receiver, name) => {
                matches!(receiver, "self" | "cls") && name == self.name
            }
            Callee::Other => false,
        };
        if !is_self_call {
            return;
        }

        self.facts.self_calls += 1;
        if ctx.depth > 0 {
            self.facts.self_call_in_loop = true;
        }
        if let Some(args) = call.child_by_field_name("arguments") {
            if any_descendant(args, |n| n.kind() == "slice" || self.is_halving(n)) {
                self.facts.self_call_divides = true;
            }
            if ctx.depth > 0 && any_descendant(args, |n| self.is_slice_concat(n)) {
                self.facts.permutation_shape = true;
            }
        }
    }

    fn callee<'t>(&self, function: Node<'t>) -> Callee<'s> {
        match function.kind() {
            "identifier" => self
                .source
                .text(function)
                .map(Callee::Plain)
                .unwrap_or(Callee::Other),
            "attribute" => {
                let object = function
                    .child_by_field_name("object")
                    .and_then(|n| self.source.text(n).ok());
                let attribute = function
                    .child_by_field_name("attribute")
                    .and_then(|n| self.source.text(n).ok());
                match (object, attribute) {
                    (Some(object), Some(attribute)) => Callee::Method(object, attribute),
                    _ => Callee::Other,
                }
            }
            _ => Callee::Other,
        }
    }

    /// A `while` loop whose condition or own body halves or doubles a value.
    fn is_log_loop(&self, while_node: Node<'_>) -> bool {
        named_children(while_node)
            .into_iter()
            .any(|child| any_descendant_in_loop_scope(child, |n| self.is_halving(n)))
    }

    /// Division or shift by a constant, or scaling by 2 or 0.5.
    fn is_halving(&self, node: Node<'_>) -> bool {
        let operator = node
            .child_by_field_name("operator")
            .and_then(|op| self.source.text(op).ok());
        let left = node.child_by_field_name("left");
        let right = node.child_by_field_name("right");

        match (node.kind(), operator) {
            ("binary_operator", Some("/" | "//" | ">>" | "<<"))
            | ("augmented_assignment", Some("/=" | "//=" | ">>=" | "<<=")) => {
                right.is_some_and(is_numeric_literal)
            }
            ("binary_operator", Some("*")) => {
                left.is_some_and(|n| self.is_scaling_literal(n))
                    || right.is_some_and(|n| self.is_scaling_literal(n))
            }
            ("augmented_assignment", Some("*=")) => {
                right.is_some_and(|n| self.is_scaling_literal(n))
            }
            _ => false,
        }
    }

    fn is_scaling_literal(&self, node: Node<'_>) -> bool {
        is_numeric_literal(node)
            && self
                .source
                .text(node)
                .is_ok_and(|text| matches!(text, "2" | "0.5" | ".5"))
    }

    /// `xs[:i] + xs[i + 1:]`, the argument shape of permutation search.
    fn is_slice_concat(&self, node: Node<'_>) -> bool {
        node.kind() == "binary_operator"
            && node
                .child_by_field_name("operator")
                .and_then(|op| self.source.text(op).ok())
                == Some("+")
            && ["left", "right"].iter().all(|field| {
                node.child_by_field_name(field)
                    .is_some_and(|side| side.kind() == "subscript")
            })
    }
}

fn push_children<'t>(
    pending: &mut Vec<(Node<'t>, LoopContext)>,
    node: Node<'t>,
    ctx: LoopContext,
) {
    pending.extend(named_children(node).into_iter().map(|child| (child, ctx)));
}

fn any_descendant(root: Node<'_>, predicate: impl Fn(Node<'_>) -> bool) -> bool {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if predicate(node) {
            return true;
        }
        stack.extend(named_children(node));
    }
    false
}

/// Like [`any_descendant`] but stops at nested loops and definitions.
fn any_descendant_in_loop_scope(root: Node<'_>, predicate: impl Fn(Node<'_>) -> bool) -> bool {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let kind = node.kind();
        if matches!(
            kind,
            "for_statement" | "while_statement" | "function_definition" | "class_definition"
        ) || COMPREHENSIONS.contains(&kind)
        {
            continue;
        }
        if predicate(node) {
            return true;
        }
        stack.extend(named_children(node));
    }
    false
}

#[derive(Debug, Clone, Copy)]
enum Callee<'a> {
    Plain(&'a str),
    Method(&'a str, &'a str),
    Other,
}

fn is_numeric_literal(node: Node<'_>) -> bool {
    matches!(node.kind(), "integer" | "float")
}
