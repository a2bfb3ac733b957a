//! Best-effort translation of function bodies and expressions.
//!
//! Constructs without a rule are emitted as an `// unsupported` comment (or
//! a `default!` placeholder inside expressions) and reported as a warning.
//! Translation of the rest of the body continues.

use crate::diagnostics::Diagnostics;
use crate::emit::EmissionBuffer;
use crate::model::TypeModel;
use crate::names::{Needs, builtin_type, result_type, sanitize, target_type};
use crate::model::params_of;
use crate::parse::{field_children, first_named, has_token, named_children, text};
use crate::structs::{param_list, zero_value};
use tree_sitter::Node;

const TASKS: &str = "System.Threading.Tasks";

pub struct BodyEmitter<'a> {
    source: &'a str,
    model: &'a TypeModel,
    buffer: &'a mut EmissionBuffer,
    diagnostics: &'a mut Diagnostics,
    named_results: Vec<String>,
    iota: Option<usize>,
    indent: usize,
}

impl<'a> BodyEmitter<'a> {
    pub fn new(
        source: &'a str,
        model: &'a TypeModel,
        buffer: &'a mut EmissionBuffer,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            source,
            model,
            buffer,
            diagnostics,
            named_results: Vec::new(),
            iota: None,
            indent: 0,
        }
    }

    /// Names of the enclosing function's named results (for bare `return`).
    pub fn with_named_results(mut self, names: Vec<String>) -> Self {
        self.named_results = names;
        self
    }

    /// Value substituted for `iota` inside constant expressions.
    pub fn set_iota(&mut self, iota: Option<usize>) {
        self.iota = iota;
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        text(node, self.source)
    }

    fn unsupported(&mut self, node: Node<'_>, what: &str) {
        self.diagnostics
            .warn_at(node, format!("unsupported {} `{}`", what, node.kind()));
    }

    fn line(&mut self, indent: usize, line: &str) {
        self.buffer.line(indent, line);
    }

    fn map_type(&mut self, node: Node<'_>) -> String {
        let mut needs = Needs::new();
        let mapped = target_type(node, self.source, &mut needs);
        for ns in needs {
            self.buffer.require(ns);
        }
        mapped
    }

    /// Emit a `block` node as a braced block at `indent`.
    pub fn block(&mut self, block: Node<'_>, indent: usize) {
        self.line(indent, "{");
        self.statements(block, indent + 1);
        self.line(indent, "}");
    }

    /// Emit the statements of a block, without braces.
    pub fn statements(&mut self, block: Node<'_>, indent: usize) {
        for stmt in named_children(block) {
            if stmt.kind() == "statement_list" {
                self.statements(stmt, indent);
            } else {
                self.statement(stmt, indent);
            }
        }
    }

    /// Declare named results as locals at the top of a body.
    pub fn declare_named_results(&mut self, result: Node<'_>, indent: usize) {
        for param in named_children(result) {
            let Some(ty) = param.child_by_field_name("type") else {
                continue;
            };
            let mapped = self.map_type(ty);
            for name in field_children(param, "name") {
                let name = sanitize(self.text(name));
                let zero = zero_value(&mapped, self.model);
                self.line(indent, &format!("{} {} = {};", mapped, name, zero));
            }
        }
    }

    fn statement(&mut self, stmt: Node<'_>, indent: usize) {
        self.indent = indent;
        match stmt.kind() {
            "comment" => {
                let comment = self.text(stmt).to_string();
                for line in comment.lines() {
                    self.line(indent, line.trim_end());
                }
            }
            "empty_statement" => {}
            "expression_statement"
            | "short_var_declaration"
            | "assignment_statement"
            | "inc_statement"
            | "dec_statement" => {
                if let Some(simple) = self.simple_statement(stmt) {
                    self.line(indent, &format!("{};", simple));
                }
            }
            "send_statement" => {
                let channel = stmt
                    .child_by_field_name("channel")
                    .map(|c| self.expr(c))
                    .unwrap_or_default();
                let value = stmt
                    .child_by_field_name("value")
                    .map(|v| self.expr(v))
                    .unwrap_or_default();
                self.line(indent, &format!("{}.Send({});", channel, value));
            }
            "return_statement" => self.return_statement(stmt, indent),
            "if_statement" => self.if_statement(stmt, indent, ""),
            "for_statement" => self.for_statement(stmt, indent),
            "block" => self.block(stmt, indent),
            "var_declaration" | "const_declaration" => self.local_declaration(stmt, indent),
            "defer_statement" => {
                let call = first_named(stmt).map(|c| self.expr(c)).unwrap_or_default();
                self.line(indent, &format!("defer(() => {});", call));
            }
            "go_statement" => {
                self.buffer.require(TASKS);
                let call = first_named(stmt).map(|c| self.expr(c)).unwrap_or_default();
                self.line(indent, &format!("Task.Run(() => {});", call));
            }
            "break_statement" | "continue_statement" => {
                let keyword = if stmt.kind() == "break_statement" {
                    "break"
                } else {
                    "continue"
                };
                if first_named(stmt).is_some() {
                    self.unsupported(stmt, "labeled jump");
                }
                self.line(indent, &format!("{};", keyword));
            }
            _ => {
                self.unsupported(stmt, "statement");
                let kind = stmt.kind();
                self.line(indent, &format!("// unsupported: {}", kind));
            }
        }
    }

    /// A statement usable inline (no trailing semicolon), e.g. in `for` clauses.
    fn simple_statement(&mut self, stmt: Node<'_>) -> Option<String> {
        match stmt.kind() {
            "expression_statement" => first_named(stmt).map(|e| self.expr(e)),
            "short_var_declaration" => {
                let left = self.expr_list(stmt.child_by_field_name("left"));
                let right = self.expr_list(stmt.child_by_field_name("right"));
                Some(match (left.len(), right.len()) {
                    (1, 1) => format!("var {} = {}", left[0], right[0]),
                    (_, 1) => format!("var ({}) = {}", left.join(", "), right[0]),
                    _ => format!("var ({}) = ({})", left.join(", "), right.join(", ")),
                })
            }
            "assignment_statement" => {
                let left = self.expr_list(stmt.child_by_field_name("left"));
                let right = self.expr_list(stmt.child_by_field_name("right"));
                let op = stmt
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("=");
                if op == "&^=" {
                    return Some(format!("{} &= ~({})", left.join(", "), right.join(", ")));
                }
                Some(match (left.len(), right.len()) {
                    (1, 1) => format!("{} {} {}", left[0], op, right[0]),
                    (_, 1) => format!("({}) {} {}", left.join(", "), op, right[0]),
                    _ => format!("({}) {} ({})", left.join(", "), op, right.join(", ")),
                })
            }
            "inc_statement" => first_named(stmt).map(|e| format!("{}++", self.expr(e))),
            "dec_statement" => first_named(stmt).map(|e| format!("{}--", self.expr(e))),
            _ => {
                self.unsupported(stmt, "simple statement");
                None
            }
        }
    }

    fn expr_list(&mut self, list: Option<Node<'_>>) -> Vec<String> {
        let Some(list) = list else {
            return Vec::new();
        };
        if list.kind() != "expression_list" {
            return vec![self.expr(list)];
        }
        named_children(list)
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .map(|n| self.expr(n))
            .collect()
    }

    fn return_statement(&mut self, stmt: Node<'_>, indent: usize) {
        let values = self.expr_list(first_named(stmt));
        let values = if values.is_empty() {
            self.named_results.clone()
        } else {
            values
        };
        let line = match values.len() {
            0 => "return;".to_string(),
            1 => format!("return {};", values[0]),
            _ => format!("return ({});", values.join(", ")),
        };
        self.line(indent, &line);
    }

    fn if_statement(&mut self, stmt: Node<'_>, indent: usize, prefix: &str) {
        if let Some(init) = stmt.child_by_field_name("initializer") {
            if !prefix.is_empty() {
                self.line(indent, prefix.trim_end());
            }
            self.line(indent, "{");
            if let Some(simple) = self.simple_statement(init) {
                self.line(indent + 1, &format!("{};", simple));
            }
            self.if_chain(stmt, indent + 1, "");
            self.line(indent, "}");
        } else {
            self.if_chain(stmt, indent, prefix);
        }
    }

    fn if_chain(&mut self, stmt: Node<'_>, indent: usize, prefix: &str) {
        let condition = stmt
            .child_by_field_name("condition")
            .map(|c| self.expr(c))
            .unwrap_or_else(|| "true".into());
        self.line(indent, &format!("{}if ({})", prefix, condition));
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            self.block(consequence, indent);
        }
        match stmt.child_by_field_name("alternative") {
            Some(alt) if alt.kind() == "if_statement" => self.if_statement(alt, indent, "else "),
            Some(alt) => {
                self.line(indent, "else");
                self.block(alt, indent);
            }
            None => {}
        }
    }

    fn for_statement(&mut self, stmt: Node<'_>, indent: usize) {
        let body = stmt.child_by_field_name("body");
        let header = named_children(stmt)
            .into_iter()
            .find(|n| Some(*n) != body && n.kind() != "comment");

        let line = match header {
            None => "while (true)".to_string(),
            Some(clause) if clause.kind() == "for_clause" => {
                let init = clause
                    .child_by_field_name("initializer")
                    .and_then(|i| self.simple_statement(i))
                    .unwrap_or_default();
                let cond = clause
                    .child_by_field_name("condition")
                    .map(|c| self.expr(c))
                    .unwrap_or_default();
                let update = clause
                    .child_by_field_name("update")
                    .and_then(|u| self.simple_statement(u))
                    .unwrap_or_default();
                format!("for ({}; {}; {})", init, cond, update)
            }
            Some(clause) if clause.kind() == "range_clause" => self.range_header(clause),
            Some(cond) => format!("while ({})", self.expr(cond)),
        };

        self.line(indent, &line);
        match body {
            Some(body) => self.block(body, indent),
            None => self.line(indent, "{ }"),
        }
    }

    fn range_header(&mut self, clause: Node<'_>) -> String {
        let right = clause
            .child_by_field_name("right")
            .map(|r| self.expr(r))
            .unwrap_or_default();
        let left = self.expr_list(clause.child_by_field_name("left"));
        if !left.is_empty() && !has_token(clause, ":=") {
            self.unsupported(clause, "range assignment to existing variables");
        }
        match left.len() {
            0 => format!("foreach (var _ in {})", right),
            1 => format!("foreach (var ({}, _) in {})", left[0], right),
            _ => format!("foreach (var ({}, {}) in {})", left[0], left[1], right),
        }
    }

    fn local_declaration(&mut self, decl: Node<'_>, indent: usize) {
        for spec in specs(decl) {
            let names: Vec<String> = field_children(spec, "name")
                .into_iter()
                .map(|n| sanitize(self.text(n)))
                .collect();
            let ty = spec.child_by_field_name("type").map(|t| self.map_type(t));
            let values = self.expr_list(spec.child_by_field_name("value"));

            if names.len() > 1 && values.len() == 1 {
                self.line(indent, &format!("var ({}) = {};", names.join(", "), values[0]));
                continue;
            }
            for (i, name) in names.iter().enumerate() {
                let line = match (&ty, values.get(i)) {
                    (Some(ty), Some(value)) => format!("{} {} = {};", ty, name, value),
                    (Some(ty), None) => format!("{} {} = {};", ty, name, zero_value(ty, self.model)),
                    (None, Some(value)) => format!("var {} = {};", name, value),
                    (None, None) => {
                        self.unsupported(spec, "untyped declaration without value");
                        format!("// unsupported: {}", name)
                    }
                };
                self.line(indent, &line);
            }
        }
    }

    /// Translate an expression.
    pub fn expr(&mut self, node: Node<'_>) -> String {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                match (name, self.iota) {
                    ("iota", Some(value)) => value.to_string(),
                    _ => sanitize(name),
                }
            }
            "iota" => match self.iota {
                Some(value) => value.to_string(),
                None => {
                    self.unsupported(node, "iota outside constant declaration");
                    "0".into()
                }
            },
            "field_identifier" | "package_identifier" => sanitize(self.text(node)),
            "true" | "false" | "nil" => node.kind().to_string(),
            "int_literal" => int_literal(self.text(node)),
            "float_literal" | "rune_literal" | "interpreted_string_literal" => {
                self.text(node).to_string()
            }
            "raw_string_literal" => {
                let raw = self.text(node).trim_matches('`');
                format!("@\"{}\"", raw.replace('"', "\"\""))
            }
            "parenthesized_expression" => {
                let inner = first_named(node).map(|e| self.expr(e)).unwrap_or_default();
                format!("({})", inner)
            }
            "binary_expression" => {
                let left = node
                    .child_by_field_name("left")
                    .map(|l| self.expr(l))
                    .unwrap_or_default();
                let right = node
                    .child_by_field_name("right")
                    .map(|r| self.expr(r))
                    .unwrap_or_default();
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("?");
                if op == "&^" {
                    format!("{} & ~({})", left, right)
                } else {
                    format!("{} {} {}", left, op, right)
                }
            }
            "unary_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.expr(o))
                    .unwrap_or_default();
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                match op {
                    "&" => format!("addr({})", operand),
                    "*" => format!("{}.val", operand),
                    "<-" => format!("{}.Receive()", operand),
                    "^" => format!("~{}", operand),
                    _ => format!("{}{}", op, operand),
                }
            }
            "selector_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.expr(o))
                    .unwrap_or_default();
                let field = node
                    .child_by_field_name("field")
                    .map(|f| sanitize(self.text(f)))
                    .unwrap_or_default();
                format!("{}.{}", operand, field)
            }
            "index_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.expr(o))
                    .unwrap_or_default();
                let index = node
                    .child_by_field_name("index")
                    .map(|i| self.expr(i))
                    .unwrap_or_default();
                format!("{}[{}]", operand, index)
            }
            "slice_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.expr(o))
                    .unwrap_or_default();
                let start = node
                    .child_by_field_name("start")
                    .map(|s| self.expr(s))
                    .unwrap_or_default();
                let end = node
                    .child_by_field_name("end")
                    .map(|e| self.expr(e))
                    .unwrap_or_default();
                if node.child_by_field_name("capacity").is_some() {
                    self.unsupported(node, "full slice expression");
                }
                format!("{}[{}..{}]", operand, start, end)
            }
            "type_assertion_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.expr(o))
                    .unwrap_or_default();
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| self.map_type(t))
                    .unwrap_or_default();
                format!("{}._<{}>()", operand, ty)
            }
            "call_expression" => self.call(node),
            "composite_literal" => self.composite(node),
            "func_literal" => self.func_literal(node),
            "expression_list" => self.expr_list(Some(node)).join(", "),
            "type_identifier" | "qualified_type" | "pointer_type" | "slice_type" | "array_type"
            | "map_type" | "channel_type" | "function_type" | "generic_type" => self.map_type(node),
            _ => {
                self.unsupported(node, "expression");
                format!("default! /* {} */", node.kind())
            }
        }
    }

    fn call(&mut self, node: Node<'_>) -> String {
        let function = node.child_by_field_name("function");
        let args: Vec<Node<'_>> = node
            .child_by_field_name("arguments")
            .map(|a| {
                named_children(a)
                    .into_iter()
                    .filter(|n| n.kind() != "comment")
                    .collect()
            })
            .unwrap_or_default();

        if let Some(function) = function
            && matches!(function.kind(), "identifier" | "parenthesized_expression")
        {
            let name = self.text(function);
            match name {
                "new" if args.len() == 1 => {
                    let ty = self.map_type(args[0]);
                    let zero = zero_value(&ty, self.model);
                    return format!("new ptr<{}>({})", ty, zero);
                }
                "make" if !args.is_empty() => {
                    let ty = self.map_type(args[0]);
                    let rest: Vec<String> = args[1..].iter().map(|a| self.expr(*a)).collect();
                    return format!("make<{}>({})", ty, rest.join(", "));
                }
                _ => {}
            }
            let is_conversion = builtin_type(name).is_some()
                || (self.model.declares(name) && !self.model.is_struct(name));
            if is_conversion && args.len() == 1 {
                let ty = self.map_type(function);
                let value = self.expr(args[0]);
                return format!("({})({})", ty, value);
            }
        }

        let callee = function.map(|f| self.expr(f)).unwrap_or_default();
        let rendered: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
        format!("{}({})", callee, rendered.join(", "))
    }

    fn composite(&mut self, node: Node<'_>) -> String {
        let ty = node.child_by_field_name("type");
        let body = node.child_by_field_name("body");
        match (ty, body) {
            (Some(ty), Some(body)) => self.literal_value(ty, body),
            _ => {
                self.unsupported(node, "composite literal");
                "default!".into()
            }
        }
    }

    fn literal_value(&mut self, ty: Node<'_>, body: Node<'_>) -> String {
        let elements: Vec<Node<'_>> = named_children(body)
            .into_iter()
            .filter(|n| n.kind() != "comment")
            .collect();

        match ty.kind() {
            "slice_type" | "array_type" | "implicit_length_array_type" => {
                let elem = ty.child_by_field_name("element");
                let elem_text = elem.map(|e| self.map_type(e)).unwrap_or_else(|| "object".into());
                let values: Vec<String> = elements
                    .iter()
                    .map(|e| self.element(*e, elem))
                    .collect();
                let container = if ty.kind() == "slice_type" { "slice" } else { "array" };
                format!(
                    "new {}<{}>(new {}[] {{ {} }})",
                    container,
                    elem_text,
                    elem_text,
                    values.join(", ")
                )
            }
            "map_type" => {
                let mapped = self.map_type(ty);
                let value_type = ty.child_by_field_name("value");
                let mut entries = Vec::new();
                for element in &elements {
                    let parts = named_children(*element);
                    if element.kind() != "keyed_element" || parts.len() < 2 {
                        self.unsupported(*element, "map literal element");
                        continue;
                    }
                    let key = self.element(parts[0], ty.child_by_field_name("key"));
                    let value = self.element(parts[parts.len() - 1], value_type);
                    entries.push(format!("{{ {}, {} }}", key, value));
                }
                format!("new {} {{ {} }}", mapped, entries.join(", "))
            }
            _ => self.struct_literal(ty, &elements),
        }
    }

    fn struct_literal(&mut self, ty: Node<'_>, elements: &[Node<'_>]) -> String {
        let mapped = self.map_type(ty);
        if elements.is_empty() {
            return format!("new {}(nil)", mapped);
        }

        let keyed = elements.iter().all(|e| e.kind() == "keyed_element");
        let decl = if ty.kind() == "type_identifier" {
            self.model.struct_decl(self.text(ty)).cloned()
        } else {
            None
        };

        if !keyed {
            let values: Vec<String> = elements.iter().map(|e| self.element(*e, None)).collect();
            return format!("new {}({})", mapped, values.join(", "));
        }

        let mut provided = Vec::new();
        for element in elements {
            let parts = named_children(*element);
            let (Some(key), Some(value)) = (parts.first(), parts.last()) else {
                continue;
            };
            let key = unwrap_element(*key);
            let name = self.text(key).to_string();
            let value = self.element(*value, None);
            provided.push((name, value));
        }

        match decl {
            Some(decl) => {
                let args: Vec<String> = decl
                    .fields
                    .iter()
                    .map(|f| {
                        provided
                            .iter()
                            .find(|(name, _)| *name == f.name)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_else(|| {
                                let zero = zero_value(&f.type_text, self.model);
                                if f.embedded && f.pointer {
                                    format!("new ptr<{}>({})", f.type_text, zero)
                                } else {
                                    zero
                                }
                            })
                    })
                    .collect();
                format!("new {}({})", mapped, args.join(", "))
            }
            None => {
                let args: Vec<String> = provided
                    .into_iter()
                    .map(|(name, value)| format!("{}: {}", sanitize(&name), value))
                    .collect();
                format!("new {}({})", mapped, args.join(", "))
            }
        }
    }

    /// One element of a literal value; elided composite types come from `elem`.
    fn element(&mut self, node: Node<'_>, elem: Option<Node<'_>>) -> String {
        let node = unwrap_element(node);
        if node.kind() == "literal_value" {
            return match elem {
                Some(ty) => self.literal_value(ty, node),
                None => {
                    self.unsupported(node, "literal with elided type");
                    "default!".into()
                }
            };
        }
        self.expr(node)
    }

    fn func_literal(&mut self, node: Node<'_>) -> String {
        let mut needs = Needs::new();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| params_of(p, self.source, &mut needs))
            .unwrap_or_default();
        if let Some(result) = node.child_by_field_name("result") {
            result_type(result, self.source, &mut needs);
        }
        for ns in needs {
            self.buffer.require(ns);
        }

        let indent = self.indent;
        let mut inner = EmissionBuffer::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut nested = BodyEmitter::new(self.source, self.model, &mut inner, &mut *self.diagnostics);
            nested.statements(body, indent + 1);
        }
        let required: Vec<String> = inner.required().map(str::to_string).collect();
        for ns in required {
            self.buffer.require(ns);
        }

        let pad = "    ".repeat(indent);
        format!(
            "({}) =>\n{}{{\n{}{}}}",
            param_list(&params),
            pad,
            inner.finalize(),
            pad
        )
    }
}

fn unwrap_element(node: Node<'_>) -> Node<'_> {
    if node.kind() == "literal_element" {
        first_named(node).unwrap_or(node)
    } else {
        node
    }
}

/// `var_spec` / `const_spec` nodes of a declaration, flattening spec lists.
pub fn specs(decl: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "var_spec" | "const_spec" => out.push(child),
            "var_spec_list" | "const_spec_list" => out.extend(
                named_children(child)
                    .into_iter()
                    .filter(|s| matches!(s.kind(), "var_spec" | "const_spec")),
            ),
            _ => {}
        }
    }
    out
}

/// Rewrite Go integer literal syntax C# lacks (octal).
fn int_literal(literal: &str) -> String {
    let digits = literal.replace('_', "");
    let octal = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
        .or_else(|| {
            (digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit()))
                .then(|| &digits[1..])
        });
    match octal.and_then(|o| u64::from_str_radix(o, 8).ok()) {
        Some(value) => value.to_string(),
        None => literal.to_string(),
    }
}
