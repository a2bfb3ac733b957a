//! Identifier escaping and Go to C# type mapping.

use crate::parse::{field_children, first_named, named_children, text};
use std::collections::BTreeSet;
use tree_sitter::Node;

/// Target namespaces a piece of translated text depends on.
pub type Needs = BTreeSet<&'static str>;

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Escape a Go identifier that collides with a C# keyword.
pub fn sanitize(ident: &str) -> String {
    if CSHARP_KEYWORDS.contains(&ident) {
        format!("@{}", ident)
    } else {
        ident.to_string()
    }
}

/// Whether a Go identifier is exported (starts with an uppercase letter).
pub fn is_exported(ident: &str) -> bool {
    ident.chars().next().is_some_and(char::is_uppercase)
}

/// Map a predeclared Go type name to its shim name.
pub fn builtin_type(name: &str) -> Option<&'static str> {
    Some(match name {
        "string" => "@string",
        "int" => "nint",
        "uint" | "uintptr" => "nuint",
        "any" => "object",
        "bool" => "bool",
        "byte" => "byte",
        "rune" => "rune",
        "error" => "error",
        "int8" => "sbyte",
        "int16" => "short",
        "int32" => "int",
        "int64" => "long",
        "uint8" => "byte",
        "uint16" => "ushort",
        "uint32" => "uint",
        "uint64" => "ulong",
        "float32" => "float",
        "float64" => "double",
        "complex64" => "complex64",
        "complex128" => "complex128",
        _ => return None,
    })
}

/// C# namespace path for a package import path: `a/b/c` -> `go.a.b`.
pub fn namespace_for(package_path: Option<&str>) -> String {
    let mut namespace = String::from("go");
    if let Some(path) = package_path {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some((_, parents)) = segments.split_last() {
            for segment in parents {
                namespace.push('.');
                namespace.push_str(&segment_name(segment));
            }
        }
    }
    namespace
}

/// Package class name: `fmt` -> `fmt_package`.
pub fn package_class(package_name: &str) -> String {
    format!("{}_package", segment_name(package_name))
}

/// Fully-qualified class for an import path: `a/b/c` -> `go.a.b.c_package`.
pub fn qualified_package_class(import_path: &str) -> String {
    format!(
        "{}.{}",
        namespace_for(Some(import_path)),
        package_class(&assumed_package_name(import_path))
    )
}

/// Package name Go code uses for an unaliased import.
///
/// A trailing major-version segment (`mod/v2`) names its parent, a `go-`
/// prefix is dropped, and the name ends at the first character that cannot
/// appear in an identifier, so `gopkg.in/yaml.v2` is `yaml`.
pub fn assumed_package_name(import_path: &str) -> String {
    let segments: Vec<&str> = import_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut base = match segments.as_slice() {
        [.., parent, last] if is_major_version(last) => *parent,
        [.., last] => *last,
        [] => import_path,
    };
    base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(base.len());
    if end == 0 {
        segment_name(base)
    } else {
        base[..end].to_string()
    }
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

fn segment_name(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Map a Go type node to C# text, recording namespaces the text needs.
pub fn target_type(node: Node<'_>, source: &str, needs: &mut Needs) -> String {
    match node.kind() {
        "type_identifier" | "identifier" => {
            let name = text(node, source);
            builtin_type(name)
                .map(str::to_string)
                .unwrap_or_else(|| sanitize(name))
        }
        "qualified_type" => {
            let package = node
                .child_by_field_name("package")
                .map(|n| text(n, source))
                .unwrap_or("");
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, source))
                .unwrap_or("");
            format!("{}.{}", sanitize(package), sanitize(name))
        }
        "pointer_type" => format!("ptr<{}>", inner(node, source, needs)),
        "slice_type" => format!("slice<{}>", element(node, source, needs)),
        "array_type" => format!("array<{}>", element(node, source, needs)),
        "channel_type" => {
            let value = node
                .child_by_field_name("value")
                .map(|v| target_type(v, source, needs))
                .unwrap_or_else(|| "object".into());
            format!("channel<{}>", value)
        }
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .map(|k| target_type(k, source, needs))
                .unwrap_or_else(|| "object".into());
            let value = node
                .child_by_field_name("value")
                .map(|v| target_type(v, source, needs))
                .unwrap_or_else(|| "object".into());
            format!("map<{}, {}>", key, value)
        }
        "generic_type" => {
            let base = node
                .child_by_field_name("type")
                .map(|t| target_type(t, source, needs))
                .unwrap_or_default();
            let args = node
                .child_by_field_name("type_arguments")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .map(|a| target_type(unwrap_type_elem(a), source, needs))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}<{}>", base, args)
        }
        "function_type" => function_type(node, source, needs),
        "interface_type" => "object".into(),
        "struct_type" => "object".into(),
        "parenthesized_type" => first_named(node)
            .map(|t| target_type(t, source, needs))
            .unwrap_or_else(|| "object".into()),
        _ => sanitize(text(node, source)),
    }
}

fn unwrap_type_elem(node: Node<'_>) -> Node<'_> {
    if node.kind() == "type_elem" {
        first_named(node).unwrap_or(node)
    } else {
        node
    }
}

fn inner(node: Node<'_>, source: &str, needs: &mut Needs) -> String {
    first_named(node)
        .map(|t| target_type(t, source, needs))
        .unwrap_or_else(|| "object".into())
}

fn element(node: Node<'_>, source: &str, needs: &mut Needs) -> String {
    node.child_by_field_name("element")
        .map(|t| target_type(t, source, needs))
        .unwrap_or_else(|| "object".into())
}

fn function_type(node: Node<'_>, source: &str, needs: &mut Needs) -> String {
    needs.insert("System");
    let mut args: Vec<String> = node
        .child_by_field_name("parameters")
        .map(|p| parameter_types(p, source, needs))
        .unwrap_or_default();
    match node.child_by_field_name("result") {
        Some(result) => {
            args.push(result_type(result, source, needs));
            format!("Func<{}>", args.join(", "))
        }
        None if args.is_empty() => "Action".into(),
        None => format!("Action<{}>", args.join(", ")),
    }
}

/// Types of every parameter in a `parameter_list`, one per declared name.
pub fn parameter_types(list: Node<'_>, source: &str, needs: &mut Needs) -> Vec<String> {
    let mut types = Vec::new();
    for param in named_children(list) {
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let mapped = target_type(ty, source, needs);
        let mapped = if param.kind() == "variadic_parameter_declaration" {
            format!("{}[]", mapped)
        } else {
            mapped
        };
        let count = field_children(param, "name").len().max(1);
        types.extend(std::iter::repeat_n(mapped, count));
    }
    types
}

/// Result type of a function: a single type, `void`, or a tuple.
pub fn result_type(result: Node<'_>, source: &str, needs: &mut Needs) -> String {
    if result.kind() != "parameter_list" {
        return target_type(result, source, needs);
    }

    let mut parts = Vec::new();
    for param in named_children(result) {
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let mapped = target_type(ty, source, needs);
        let names = field_children(param, "name");
        if names.is_empty() {
            parts.push(mapped);
        } else {
            for name in names {
                parts.push(format!("{} {}", mapped, sanitize(text(name, source))));
            }
        }
    }

    match parts.len() {
        0 => "void".into(),
        1 => parts[0]
            .split_once(' ')
            .map(|(ty, _)| ty.to_string())
            .unwrap_or_else(|| parts[0].clone()),
        _ => {
            needs.insert("System");
            format!("({})", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    fn field_type(decl: &str) -> (String, Needs) {
        let src = format!("package p\n\ntype T struct {{ f {} }}\n", decl);
        let parsed = parse_source(src.clone()).unwrap();
        let mut needs = Needs::new();
        let mut found = None;
        let mut cursor = parsed.tree().walk();
        loop {
            let node = cursor.node();
            if node.kind() == "field_declaration" {
                found = node.child_by_field_name("type");
                break;
            }
            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                assert!(cursor.goto_parent(), "no field declaration");
            }
        }
        let ty = target_type(found.unwrap(), parsed.source(), &mut needs);
        (ty, needs)
    }

    #[test]
    fn test_builtin_and_composite_types() {
        assert_eq!(field_type("string").0, "@string");
        assert_eq!(field_type("int").0, "nint");
        assert_eq!(field_type("*Node").0, "ptr<Node>");
        assert_eq!(field_type("[]byte").0, "slice<byte>");
        assert_eq!(field_type("[4]int32").0, "array<int>");
        assert_eq!(field_type("map[string]int").0, "map<@string, nint>");
        assert_eq!(field_type("chan int").0, "channel<nint>");
        assert_eq!(field_type("io.Reader").0, "io.Reader");
    }

    #[test]
    fn test_function_types_need_system() {
        let (ty, needs) = field_type("func(int) string");
        assert_eq!(ty, "Func<nint, @string>");
        assert!(needs.contains("System"));
        assert_eq!(field_type("func()").0, "Action");
    }

    #[test]
    fn test_sanitize_keywords() {
        assert_eq!(sanitize("string"), "@string");
        assert_eq!(sanitize("base"), "@base");
        assert_eq!(sanitize("name"), "name");
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(namespace_for(None), "go");
        assert_eq!(namespace_for(Some("fmt")), "go");
        assert_eq!(namespace_for(Some("a/b/c")), "go.a.b");
        assert_eq!(qualified_package_class("a/b/c"), "go.a.b.c_package");
        assert_eq!(
            qualified_package_class("github.com/x/y"),
            "go.github_com.x.y_package"
        );
        assert_eq!(qualified_package_class("gopkg.in/yaml.v2"), "go.gopkg_in.yaml_package");
    }

    #[test]
    fn test_assumed_package_names() {
        assert_eq!(assumed_package_name("fmt"), "fmt");
        assert_eq!(assumed_package_name("gopkg.in/yaml.v2"), "yaml");
        assert_eq!(assumed_package_name("example.com/mod/v2"), "mod");
        assert_eq!(assumed_package_name("github.com/mattn/go-isatty"), "isatty");
        assert_eq!(assumed_package_name("example.com/x/v"), "v");
    }
}
