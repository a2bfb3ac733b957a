//! Per-file conversion: a [`Listener`] that emits one target file.
//!
//! Only the children of `source_file` are visited. Each top-level
//! declaration is translated wholesale when entered and its subtree is
//! skipped, so the file is walked exactly once.

use crate::body::{BodyEmitter, specs};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emit::{DeferredMarker, EmissionBuffer};
use crate::model::{TypeModel, params_of, receiver_of, struct_decl};
use crate::names::{
    Needs, assumed_package_name, builtin_type, is_exported, namespace_for, package_class, qualified_package_class,
    result_type, sanitize, target_type,
};
use crate::parse::{ParsedSource, field_children, first_named, named_children, text, unquote};
use crate::promotion::promote;
use crate::scope::{ScopeKind, ScopeTracker};
use crate::structs::{
    InterfaceMethod, emit_interface, emit_named, emit_struct, param_list, zero_value,
};
use crate::walk::{Listener, Visit, walk};
use crate::{GENERATOR, GENERATOR_VERSION};
use tree_sitter::Node;

/// Where the file being translated lives.
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    /// Name used in diagnostics and the generated header.
    pub file_name: String,
    /// Import path of the file's package (`a/b/c`), if known.
    pub package_path: Option<String>,
}

impl FileContext {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            package_path: None,
        }
    }

    pub fn with_package_path(mut self, package_path: impl Into<String>) -> Self {
        self.package_path = Some(package_path.into());
        self
    }
}

/// Result of translating one file.
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub package_name: Option<String>,
    /// Import paths in declaration order.
    pub imports: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Translate a parsed file against its package's type model.
pub fn translate(parsed: &ParsedSource, model: &TypeModel, context: &FileContext) -> Translation {
    let mut converter = Converter::new(parsed.source(), model, context);
    for error in parsed.syntax_errors() {
        converter
            .diagnostics
            .warn(error.line, error.column, error.message);
    }
    walk(parsed.tree(), &mut converter);
    let translation = converter.finish();
    tracing::debug!(
        file = %context.file_name,
        imports = translation.imports.len(),
        warnings = translation.diagnostics.len(),
        "translated"
    );
    translation
}

pub struct Converter<'a> {
    source: &'a str,
    model: &'a TypeModel,
    context: &'a FileContext,
    buffer: EmissionBuffer,
    scopes: ScopeTracker,
    diagnostics: Diagnostics,
    package_name: Option<String>,
    imports: Vec<String>,
    header_written: bool,
    pending_comments: Vec<String>,
    members: usize,
}

impl<'a> Converter<'a> {
    pub fn new(source: &'a str, model: &'a TypeModel, context: &'a FileContext) -> Self {
        Self {
            source,
            model,
            context,
            buffer: EmissionBuffer::new(),
            scopes: ScopeTracker::new(),
            diagnostics: Diagnostics::new(context.file_name.clone()),
            package_name: None,
            imports: Vec::new(),
            header_written: false,
            pending_comments: Vec::new(),
            members: 0,
        }
    }

    /// Close owed scopes and resolve deferred markers.
    pub fn finish(mut self) -> Translation {
        self.open_scopes();
        self.flush_comments();
        self.scopes.close_all(&mut self.buffer);
        Translation {
            text: self.buffer.finalize(),
            package_name: self.package_name,
            imports: self.imports,
            diagnostics: self.diagnostics.into_vec(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        text(node, self.source)
    }

    fn require(&mut self, needs: Needs) {
        for ns in needs {
            self.buffer.require(ns);
        }
    }

    fn write_header(&mut self) {
        if self.header_written {
            return;
        }
        self.header_written = true;
        let rule = "//---------------------------------------------------------";
        self.buffer.line(0, rule);
        self.buffer.line(0, "// <auto-generated>");
        self.buffer.line(0, "//     This code was generated by a tool. Changes to this");
        self.buffer.line(0, "//     file may cause incorrect behavior and will be lost");
        self.buffer.line(0, "//     if the code is regenerated.");
        self.buffer.line(0, "//");
        self.buffer.line(
            0,
            &format!(
                "//     Converted by {} {} from {}",
                GENERATOR, GENERATOR_VERSION, self.context.file_name
            ),
        );
        self.buffer.line(0, "// </auto-generated>");
        self.buffer.push_str(rule);
        self.buffer.defer(DeferredMarker::Usings);
        self.buffer.blank();
        self.buffer.line(0, "using static go.builtin;");
    }

    /// Open the namespace and package class on the first declaration.
    fn open_scopes(&mut self) {
        self.write_header();
        if self.scopes.is_open() {
            return;
        }
        let namespace = namespace_for(self.context.package_path.as_deref());
        let class = package_class(self.package_name.as_deref().unwrap_or("main"));
        self.buffer.blank();
        self.scopes
            .open(&mut self.buffer, ScopeKind::Namespace, &format!("namespace {}", namespace));
        self.scopes.open(
            &mut self.buffer,
            ScopeKind::Container,
            &format!("public static partial class {}", class),
        );
    }

    fn flush_comments(&mut self) {
        let depth = self.scopes.depth();
        for comment in std::mem::take(&mut self.pending_comments) {
            for line in comment.lines() {
                self.buffer.line(depth, line.trim_end());
            }
        }
    }

    /// Prepare for one top-level member inside the package class.
    fn begin_member(&mut self) -> usize {
        self.open_scopes();
        if self.members > 0 {
            self.buffer.blank();
        }
        self.members += 1;
        self.flush_comments();
        self.scopes.depth()
    }

    fn package_clause(&mut self, node: Node<'_>) {
        let name = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "package_identifier")
            .map(|n| self.text(n).to_string());
        self.package_name = name;
        self.write_header();
        self.flush_comments();
    }

    fn import_declaration(&mut self, node: Node<'_>) {
        self.write_header();
        let mut import_specs = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "import_spec" => import_specs.push(child),
                "import_spec_list" => import_specs.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|s| s.kind() == "import_spec"),
                ),
                _ => {}
            }
        }
        for spec in import_specs {
            self.import_spec(spec);
        }
    }

    fn import_spec(&mut self, spec: Node<'_>) {
        let Some(path) = spec.child_by_field_name("path") else {
            return;
        };
        let path = unquote(self.text(path)).to_string();
        if path.is_empty() {
            self.diagnostics.warn_at(spec, "empty import path");
            return;
        }
        let class = qualified_package_class(&path);
        let line = match spec.child_by_field_name("name") {
            Some(name) if name.kind() == "dot" => format!("using static {};", class),
            Some(name) if name.kind() == "blank_identifier" => {
                format!("// import _ \"{}\" (initialization only)", path)
            }
            Some(name) => format!("using {} = {};", sanitize(self.text(name)), class),
            None => format!(
                "using {} = {};",
                sanitize(&assumed_package_name(&path)),
                class
            ),
        };
        self.buffer.line(0, &line);
        if !self.imports.contains(&path) {
            self.imports.push(path);
        }
    }

    fn type_declaration(&mut self, node: Node<'_>) {
        for spec in named_children(node) {
            match spec.kind() {
                "type_spec" => self.type_spec(spec),
                "type_alias" => {
                    let indent = self.begin_member();
                    let name = spec
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let mut needs = Needs::new();
                    let target = spec
                        .child_by_field_name("type")
                        .map(|t| target_type(t, self.source, &mut needs))
                        .unwrap_or_default();
                    self.buffer
                        .line(indent, &format!("// type {} = {}", name, target));
                    self.diagnostics.warn_at(
                        spec,
                        format!("type alias `{}` has no target equivalent; emitted as comment", name),
                    );
                }
                "comment" => {
                    let comment = self.text(spec).to_string();
                    self.pending_comments.push(comment);
                }
                _ => {}
            }
        }
    }

    fn type_spec(&mut self, spec: Node<'_>) {
        let (Some(name), Some(ty)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            return;
        };
        let name = self.text(name);
        if spec.child_by_field_name("type_parameters").is_some() {
            self.diagnostics
                .warn_at(spec, format!("type parameters of `{}` are not translated", name));
        }

        let indent = self.begin_member();
        match ty.kind() {
            "struct_type" => {
                let decl = struct_decl(name, ty, self.source);
                let promotion = promote(self.model, name);
                for ambiguous in &promotion.ambiguous {
                    tracing::debug!(outer = name, member = %ambiguous, "ambiguous promotion");
                }
                emit_struct(&mut self.buffer, indent, &decl, self.model, &promotion);
            }
            "interface_type" => self.interface(name, ty, indent),
            _ => {
                let mut needs = Needs::new();
                let underlying = target_type(ty, self.source, &mut needs);
                self.require(needs);
                emit_named(&mut self.buffer, indent, name, &underlying);
            }
        }
    }

    fn interface(&mut self, name: &str, ty: Node<'_>, indent: usize) {
        let mut needs = Needs::new();
        let mut bases = Vec::new();
        let mut methods = Vec::new();
        for elem in named_children(ty) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(method_name) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    let params = elem
                        .child_by_field_name("parameters")
                        .map(|p| params_of(p, self.source, &mut needs))
                        .unwrap_or_default();
                    let result = elem
                        .child_by_field_name("result")
                        .map(|r| result_type(r, self.source, &mut needs))
                        .unwrap_or_else(|| "void".into());
                    methods.push(InterfaceMethod {
                        name: self.text(method_name).to_string(),
                        params,
                        result,
                    });
                }
                "type_elem" | "constraint_elem" => {
                    if let Some(base) = first_named(elem) {
                        bases.push(target_type(base, self.source, &mut needs));
                    }
                }
                "interface_type_name" => {
                    let base = first_named(elem).unwrap_or(elem);
                    bases.push(target_type(base, self.source, &mut needs));
                }
                "type_identifier" | "qualified_type" => {
                    bases.push(target_type(elem, self.source, &mut needs));
                }
                "comment" => {}
                other => self
                    .diagnostics
                    .warn_at(elem, format!("unsupported interface element `{}`", other)),
            }
        }
        self.require(needs);
        emit_interface(&mut self.buffer, indent, name, &bases, &methods);
    }

    fn visibility(name: &str) -> &'static str {
        if is_exported(name) { "public" } else { "private" }
    }

    fn function_declaration(&mut self, node: Node<'_>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let mut needs = Needs::new();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| params_of(p, self.source, &mut needs))
            .unwrap_or_default();
        let result = node.child_by_field_name("result");
        let result_text = result
            .map(|r| result_type(r, self.source, &mut needs))
            .unwrap_or_else(|| "void".into());
        self.require(needs);

        let signature = if name == "main" && params.is_empty() && result.is_none() {
            "private static void Main()".to_string()
        } else {
            format!(
                "{} static {} {}({})",
                Self::visibility(name),
                result_text,
                sanitize(name),
                param_list(&params)
            )
        };
        let indent = self.begin_member();
        self.buffer.line(indent, &signature);
        self.function_body(node, result, indent);
    }

    fn method_declaration(&mut self, node: Node<'_>) {
        let (Some(name_node), Some((receiver_type, pointer))) =
            (node.child_by_field_name("name"), receiver_of(node, self.source))
        else {
            self.diagnostics.warn_at(node, "method without a receiver type");
            return;
        };
        let name = self.text(name_node);
        let receiver_name = node
            .child_by_field_name("receiver")
            .and_then(first_named)
            .and_then(|p| p.child_by_field_name("name"))
            .map(|n| sanitize(self.text(n)))
            .unwrap_or_else(|| "_".into());

        let mut needs = Needs::new();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| params_of(p, self.source, &mut needs))
            .unwrap_or_default();
        let result = node.child_by_field_name("result");
        let result_text = result
            .map(|r| result_type(r, self.source, &mut needs))
            .unwrap_or_else(|| "void".into());
        self.require(needs);

        let receiver = format!(
            "this {}{} {}",
            if pointer { "ref " } else { "" },
            sanitize(&receiver_type),
            receiver_name
        );
        let all_params = if params.is_empty() {
            receiver
        } else {
            format!("{}, {}", receiver, param_list(&params))
        };
        let signature = format!(
            "{} static {} {}({})",
            Self::visibility(name),
            result_text,
            sanitize(name),
            all_params
        );
        let indent = self.begin_member();
        self.buffer.line(indent, &signature);
        self.function_body(node, result, indent);
    }

    fn function_body(&mut self, node: Node<'_>, result: Option<Node<'_>>, indent: usize) {
        let Some(body) = node.child_by_field_name("body") else {
            self.diagnostics
                .warn_at(node, "function without a body (external implementation)");
            self.buffer.line(indent, "{");
            self.buffer.line(indent + 1, "// unsupported: external implementation");
            self.buffer.line(indent, "}");
            return;
        };

        let named_results: Vec<String> = result
            .filter(|r| r.kind() == "parameter_list")
            .map(|r| {
                named_children(r)
                    .into_iter()
                    .flat_map(|p| field_children(p, "name"))
                    .map(|n| sanitize(self.text(n)))
                    .collect()
            })
            .unwrap_or_default();

        self.buffer.line(indent, "{");
        let mut emitter = BodyEmitter::new(
            self.source,
            self.model,
            &mut self.buffer,
            &mut self.diagnostics,
        )
        .with_named_results(named_results.clone());
        if let Some(result) = result
            && !named_results.is_empty()
        {
            emitter.declare_named_results(result, indent + 1);
        }
        emitter.statements(body, indent + 1);
        self.buffer.line(indent, "}");
    }

    fn const_declaration(&mut self, node: Node<'_>) {
        let indent = self.begin_member();
        let mut previous: Option<(Option<Node<'_>>, Node<'_>)> = None;
        for (iota, spec) in specs(node).into_iter().enumerate() {
            let ty = spec.child_by_field_name("type");
            let value = spec.child_by_field_name("value");
            let (ty, value) = match value {
                Some(value) => {
                    previous = Some((ty, value));
                    (ty, value)
                }
                None => match previous {
                    Some((prev_ty, prev_value)) => (ty.or(prev_ty), prev_value),
                    None => {
                        self.diagnostics.warn_at(spec, "constant without a value");
                        continue;
                    }
                },
            };

            let names = field_children(spec, "name");
            let values: Vec<Node<'_>> = if value.kind() == "expression_list" {
                named_children(value)
            } else {
                vec![value]
            };
            let mut needs = Needs::new();
            let declared = ty.map(|t| target_type(t, self.source, &mut needs));
            self.require(needs);

            for (i, name) in names.into_iter().enumerate() {
                let name = self.text(name);
                let Some(value) = values.get(i).copied() else {
                    self.diagnostics
                        .warn_at(spec, format!("constant `{}` has no matching value", name));
                    continue;
                };
                let mapped = declared.clone().unwrap_or_else(|| self.literal_type(value));
                let mut emitter = BodyEmitter::new(
                    self.source,
                    self.model,
                    &mut self.buffer,
                    &mut self.diagnostics,
                );
                emitter.set_iota(Some(iota));
                let rendered = emitter.expr(value);
                let storage = if is_const_type(&mapped) {
                    "const"
                } else {
                    "static readonly"
                };
                self.buffer.line(
                    indent,
                    &format!(
                        "{} {} {} {} = {};",
                        Self::visibility(name),
                        storage,
                        mapped,
                        sanitize(name),
                        rendered
                    ),
                );
            }
        }
    }

    fn var_declaration(&mut self, node: Node<'_>) {
        let indent = self.begin_member();
        for spec in specs(node) {
            let names = field_children(spec, "name");
            let mut needs = Needs::new();
            let declared = spec
                .child_by_field_name("type")
                .map(|t| target_type(t, self.source, &mut needs));
            self.require(needs);
            let values: Vec<Node<'_>> = spec
                .child_by_field_name("value")
                .map(|v| {
                    if v.kind() == "expression_list" {
                        named_children(v)
                    } else {
                        vec![v]
                    }
                })
                .unwrap_or_default();
            if names.len() > 1 && values.len() == 1 {
                self.diagnostics
                    .warn_at(spec, "multi-value package variable initializer is unsupported");
                continue;
            }

            for (i, name) in names.into_iter().enumerate() {
                let name = self.text(name);
                let value = values.get(i).copied();
                let mapped = match (&declared, value) {
                    (Some(declared), _) => declared.clone(),
                    (None, Some(value)) => self.literal_type(value),
                    (None, None) => "object".into(),
                };
                let rendered = match value {
                    Some(value) => BodyEmitter::new(
                        self.source,
                        self.model,
                        &mut self.buffer,
                        &mut self.diagnostics,
                    )
                    .expr(value),
                    None => zero_value(&mapped, self.model),
                };
                self.buffer.line(
                    indent,
                    &format!(
                        "{} static {} {} = {};",
                        Self::visibility(name),
                        mapped,
                        sanitize(name),
                        rendered
                    ),
                );
            }
        }
    }

    /// Best guess at the type of an untyped initializer.
    fn literal_type(&mut self, value: Node<'_>) -> String {
        match value.kind() {
            "interpreted_string_literal" | "raw_string_literal" => "@string".into(),
            "float_literal" => "double".into(),
            "rune_literal" => "rune".into(),
            "true" | "false" => "bool".into(),
            "int_literal" | "iota" => "nint".into(),
            "identifier" if self.text(value) == "iota" => "nint".into(),
            "composite_literal" => {
                let mut needs = Needs::new();
                let ty = value
                    .child_by_field_name("type")
                    .map(|t| target_type(t, self.source, &mut needs))
                    .unwrap_or_else(|| "object".into());
                self.require(needs);
                ty
            }
            "unary_expression" | "binary_expression" | "parenthesized_expression" => {
                let operand = value
                    .child_by_field_name("operand")
                    .or_else(|| value.child_by_field_name("left"))
                    .or_else(|| first_named(value));
                let pointer = value
                    .child_by_field_name("operator")
                    .is_some_and(|op| self.text(op) == "&");
                match operand {
                    Some(operand) if pointer => format!("ptr<{}>", self.literal_type(operand)),
                    Some(operand) => self.literal_type(operand),
                    None => "object".into(),
                }
            }
            "call_expression" => {
                let name = value
                    .child_by_field_name("function")
                    .map(|f| self.text(f))
                    .unwrap_or_default();
                match builtin_type(name) {
                    Some(builtin) => builtin.to_string(),
                    None if self.model.declares(name) => sanitize(name),
                    None => self.inferred_object(value),
                }
            }
            _ => self.inferred_object(value),
        }
    }

    fn inferred_object(&mut self, value: Node<'_>) -> String {
        self.diagnostics
            .warn_at(value, "initializer type could not be inferred; using object");
        "object".into()
    }
}

fn is_const_type(ty: &str) -> bool {
    matches!(
        ty,
        "bool" | "sbyte" | "byte" | "short" | "ushort" | "int" | "uint" | "long" | "ulong"
            | "nint" | "nuint" | "float" | "double"
    )
}

impl Listener for Converter<'_> {
    fn enter(&mut self, node: Node<'_>) -> Visit {
        match node.kind() {
            "source_file" => return Visit::Children,
            "package_clause" => self.package_clause(node),
            "import_declaration" => self.import_declaration(node),
            "type_declaration" => self.type_declaration(node),
            "function_declaration" => self.function_declaration(node),
            "method_declaration" => self.method_declaration(node),
            "const_declaration" => self.const_declaration(node),
            "var_declaration" => self.var_declaration(node),
            "comment" => {
                let comment = self.text(node).to_string();
                self.pending_comments.push(comment);
            }
            // Reported through syntax errors.
            "ERROR" => {}
            kind if node.is_named() => {
                self.diagnostics
                    .warn_at(node, format!("unsupported top-level construct `{}`", kind));
            }
            _ => {}
        }
        Visit::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    fn convert(src: &str) -> Translation {
        let parsed = parse_source(src).unwrap();
        let model = TypeModel::collect(&parsed);
        translate(&parsed, &model, &FileContext::new("test.go"))
    }

    #[test]
    fn test_header_and_wrappers() {
        let out = convert("package main\n\nfunc main() {}\n");
        assert!(out.text.starts_with("//----"));
        assert!(out.text.contains("using static go.builtin;"));
        assert!(out.text.contains("namespace go\n{"));
        assert!(out.text.contains("    public static partial class main_package"));
        assert!(out.text.contains("        private static void Main()"));
        assert_eq!(out.package_name.as_deref(), Some("main"));
    }

    #[test]
    fn test_imports_recorded_and_aliased() {
        let out = convert(
            "package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n\t. \"math\"\n\t_ \"net/http/pprof\"\n)\n",
        );
        assert_eq!(out.imports, vec!["fmt", "strings", "math", "net/http/pprof"]);
        assert!(out.text.contains("using fmt = go.fmt_package;"));
        assert!(out.text.contains("using str = go.strings_package;"));
        assert!(out.text.contains("using static go.math_package;"));
        assert!(out.text.contains("// import _ \"net/http/pprof\""));
    }

    #[test]
    fn test_versioned_import_uses_package_name() {
        let out = convert(
            "package main\n\nimport (\n\t\"gopkg.in/yaml.v2\"\n\t\"example.com/mod/v3\"\n)\n",
        );
        assert!(out.text.contains("using yaml = go.gopkg_in.yaml_package;"));
        assert!(out.text.contains("using mod = go.example_com.mod.mod_package;"));
        assert_eq!(out.imports, vec!["gopkg.in/yaml.v2", "example.com/mod/v3"]);
    }

    #[test]
    fn test_methods_use_extension_receivers() {
        let out = convert(
            "package p\n\ntype C struct { n int }\n\nfunc (c *C) Inc() { c.n++ }\n\nfunc (c C) Get() int { return c.n }\n",
        );
        assert!(out.text.contains("public static void Inc(this ref C c)"));
        assert!(out.text.contains("public static nint Get(this C c)"));
        assert!(out.text.contains("c.n++;"));
    }

    #[test]
    fn test_tuple_results_require_system() {
        let out = convert("package p\n\nfunc div(a, b int) (q, r int) {\n\tq = a / b\n\tr = a % b\n\treturn\n}\n");
        assert!(out.text.contains("private static (nint q, nint r) div(nint a, nint b)"));
        assert!(out.text.contains("nint q = default!;"));
        assert!(out.text.contains("return (q, r);"));
        assert!(out.text.contains("\nusing System;\n"));
    }

    #[test]
    fn test_iota_expansion() {
        let out = convert("package p\n\nconst (\n\tA = iota\n\tB\n\tC\n)\n");
        assert!(out.text.contains("public const nint A = 0;"));
        assert!(out.text.contains("public const nint B = 1;"));
        assert!(out.text.contains("public const nint C = 2;"));
    }

    #[test]
    fn test_type_alias_warns() {
        let out = convert("package p\n\ntype A = int\n");
        assert!(out.text.contains("// type A = nint"));
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_interface_with_base() {
        let out = convert(
            "package p\n\ntype Reader interface { Read(p []byte) (int, error) }\n\ntype RC interface {\n\tReader\n\tClose() error\n}\n",
        );
        assert!(out.text.contains("public partial interface Reader"));
        assert!(out.text.contains("(nint, error) Read(slice<byte> p);"));
        assert!(out.text.contains("public partial interface RC : Reader"));
        assert!(out.text.contains("error Close();"));
    }
}
