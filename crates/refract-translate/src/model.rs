//! Declared types of a package, as needed for struct promotion.
//!
//! Collection is a shallow scan of top-level `type` and method
//! declarations; it never emits text.

use crate::names::{Needs, result_type, sanitize, target_type};
use crate::parse::{ParsedSource, field_children, has_token, named_children, text};
use std::collections::HashMap;
use tree_sitter::Node;

/// A named struct field, or an embedded (anonymous) one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name; for embedded fields, the embedded type's simple name.
    pub name: String,
    /// Target type text. For embedded fields, the element type of the cell.
    pub type_text: String,
    pub embedded: bool,
    /// Embedded through a pointer (`*T`).
    pub pointer: bool,
    /// Embedded from another package (`pkg.T`).
    pub qualified: bool,
}

/// An anonymous field relation: `outer` embeds `embedded` at `ordinal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedTypeRelation {
    pub outer: String,
    pub embedded: String,
    /// Position among the outer type's embedded fields, starting at 0.
    pub ordinal: usize,
    pub pointer: bool,
    pub qualified: bool,
    pub type_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    /// Embedded fields in declaration order.
    pub fn embeddings(&self) -> Vec<EmbeddedTypeRelation> {
        self.fields
            .iter()
            .filter(|f| f.embedded)
            .enumerate()
            .map(|(ordinal, f)| EmbeddedTypeRelation {
                outer: self.name.clone(),
                embedded: f.name.clone(),
                ordinal,
                pointer: f.pointer,
                qualified: f.qualified,
                type_text: f.type_text.clone(),
            })
            .collect()
    }

    pub fn named_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| !f.embedded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_text: String,
    pub variadic: bool,
}

/// A method declared on a named type of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub receiver: String,
    pub name: String,
    pub params: Vec<Param>,
    pub result: String,
    pub pointer_receiver: bool,
}

/// Struct and method declarations of one package.
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    structs: HashMap<String, StructDecl>,
    methods: HashMap<String, Vec<MethodDecl>>,
    named: HashMap<String, String>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect declarations from one parsed file.
    pub fn collect(parsed: &ParsedSource) -> Self {
        let mut model = Self::new();
        model.add_file(parsed);
        model
    }

    /// Add one file's declarations. Earlier declarations of a name win.
    pub fn add_file(&mut self, parsed: &ParsedSource) {
        let source = parsed.source();
        for decl in named_children(parsed.root()) {
            match decl.kind() {
                "type_declaration" => {
                    for spec in named_children(decl) {
                        if spec.kind() == "type_spec" {
                            self.add_type_spec(spec, source);
                        }
                    }
                }
                "method_declaration" => {
                    if let Some(method) = method_decl(decl, source) {
                        let methods = self.methods.entry(method.receiver.clone()).or_default();
                        if !methods.iter().any(|m| m.name == method.name) {
                            methods.push(method);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn add_type_spec(&mut self, spec: Node<'_>, source: &str) {
        let Some(name) = spec.child_by_field_name("name").map(|n| text(n, source)) else {
            return;
        };
        let Some(ty) = spec.child_by_field_name("type") else {
            return;
        };
        if ty.kind() == "struct_type" {
            if !self.structs.contains_key(name) {
                let decl = struct_decl(name, ty, source);
                self.structs.insert(name.to_string(), decl);
            }
        } else {
            let mut needs = Needs::new();
            let underlying = target_type(ty, source, &mut needs);
            self.named.entry(name.to_string()).or_insert(underlying);
        }
    }

    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        self.structs.get(name)
    }

    pub fn methods_of(&self, type_name: &str) -> &[MethodDecl] {
        self.methods
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `name` is declared as any type in the package.
    pub fn declares(&self, name: &str) -> bool {
        self.structs.contains_key(name) || self.named.contains_key(name)
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.structs.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a struct declaration from a `struct_type` node.
pub fn struct_decl(name: &str, ty: Node<'_>, source: &str) -> StructDecl {
    let mut fields = Vec::new();
    let mut needs = Needs::new();
    for list in named_children(ty) {
        if list.kind() != "field_declaration_list" {
            continue;
        }
        for field in named_children(list) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(field_type) = field.child_by_field_name("type") else {
                continue;
            };
            let names = field_children(field, "name");
            if names.is_empty() {
                fields.push(embedded_field(field, field_type, source, &mut needs));
            } else {
                let type_text = target_type(field_type, source, &mut needs);
                for n in names {
                    fields.push(FieldDecl {
                        name: text(n, source).to_string(),
                        type_text: type_text.clone(),
                        embedded: false,
                        pointer: false,
                        qualified: false,
                    });
                }
            }
        }
    }
    StructDecl {
        name: name.to_string(),
        fields,
    }
}

fn embedded_field(field: Node<'_>, ty: Node<'_>, source: &str, needs: &mut Needs) -> FieldDecl {
    let mut pointer = has_token(field, "*");
    let mut ty = ty;
    // Some grammar versions wrap `*T` in a pointer_type node instead.
    if ty.kind() == "pointer_type"
        && let Some(inner) = named_children(ty).into_iter().next()
    {
        pointer = true;
        ty = inner;
    }
    let base = if ty.kind() == "generic_type" {
        ty.child_by_field_name("type").unwrap_or(ty)
    } else {
        ty
    };
    let (name, qualified) = match base.kind() {
        "qualified_type" => (
            base.child_by_field_name("name")
                .map(|n| text(n, source))
                .unwrap_or_default(),
            true,
        ),
        _ => (text(base, source), false),
    };
    FieldDecl {
        name: name.to_string(),
        type_text: target_type(ty, source, needs),
        embedded: true,
        pointer,
        qualified,
    }
}

/// Receiver type name and whether the receiver is a pointer.
pub fn receiver_of(method: Node<'_>, source: &str) -> Option<(String, bool)> {
    let receiver = method.child_by_field_name("receiver")?;
    let param = named_children(receiver).into_iter().next()?;
    let mut ty = param.child_by_field_name("type")?;
    let mut pointer = false;
    if ty.kind() == "pointer_type" {
        pointer = true;
        ty = named_children(ty).into_iter().next()?;
    }
    if ty.kind() == "generic_type" {
        ty = ty.child_by_field_name("type")?;
    }
    Some((text(ty, source).to_string(), pointer))
}

/// Parameters of a `parameter_list`, one entry per declared name.
pub fn params_of(list: Node<'_>, source: &str, needs: &mut Needs) -> Vec<Param> {
    let mut params = Vec::new();
    let mut unnamed = 0;
    for param in named_children(list) {
        let Some(ty) = param.child_by_field_name("type") else {
            continue;
        };
        let variadic = param.kind() == "variadic_parameter_declaration";
        let type_text = target_type(ty, source, needs);
        let names = field_children(param, "name");
        if names.is_empty() {
            params.push(Param {
                name: format!("_p{}", unnamed),
                type_text,
                variadic,
            });
            unnamed += 1;
        } else {
            for n in names {
                params.push(Param {
                    name: sanitize(text(n, source)),
                    type_text: type_text.clone(),
                    variadic,
                });
            }
        }
    }
    params
}

fn method_decl(node: Node<'_>, source: &str) -> Option<MethodDecl> {
    let (receiver, pointer_receiver) = receiver_of(node, source)?;
    let name = text(node.child_by_field_name("name")?, source).to_string();
    let mut needs = Needs::new();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| params_of(p, source, &mut needs))
        .unwrap_or_default();
    let result = node
        .child_by_field_name("result")
        .map(|r| result_type(r, source, &mut needs))
        .unwrap_or_else(|| "void".into());
    Some(MethodDecl {
        receiver,
        name,
        params,
        result,
        pointer_receiver,
    })
}
