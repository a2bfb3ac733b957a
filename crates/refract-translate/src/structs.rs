//! Emission of struct, named and interface type declarations.
//!
//! A struct that embeds `T1..Tn` owns one indirection cell per embedded
//! value (`Ref<T>`, or `ptr<T>` for `*T`). Promoted members forward through
//! those cells, so writes through the outer struct land in the same storage
//! as the embedded value. Every struct gets a zero constructor taking
//! `NilType`, and nil comparisons are defined as equality with that zero
//! value in both operand orders. Equality compares named fields and the
//! values held by the cells, so two zero values are equal even though each
//! owns fresh cells.

use crate::emit::EmissionBuffer;
use crate::model::{FieldDecl, Param, StructDecl, TypeModel};
use crate::names::sanitize;
use crate::promotion::{MemberKind, PromotedMember, Promotion};
use crate::{GENERATOR, GENERATOR_VERSION};

const CODEDOM: &str = "System.CodeDom.Compiler";
const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";

fn generated_code_attribute() -> String {
    format!("[GeneratedCode(\"{}\", \"{}\")]", GENERATOR, GENERATOR_VERSION)
}

fn cell_name(field: &FieldDecl) -> String {
    format!("m_{}Ref", field.name)
}

fn cell_type(field: &FieldDecl) -> String {
    if field.pointer {
        format!("ptr<{}>", field.type_text)
    } else {
        format!("Ref<{}>", field.type_text)
    }
}

/// Zero value expression for a field type.
pub fn zero_value(type_text: &str, model: &TypeModel) -> String {
    if model.is_struct(type_text) {
        format!("new {}(nil)", type_text)
    } else {
        "default!".into()
    }
}

/// Zero value of an embedding cell. Cells are never null, including for
/// embedded pointers.
fn embedded_zero(field: &FieldDecl, model: &TypeModel) -> String {
    let value = zero_value(&field.type_text, model);
    format!("new {}({})", cell_type(field), value)
}

/// Render a C# parameter list.
pub fn param_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            if p.variadic {
                format!("params {}[] {}", p.type_text, p.name)
            } else {
                format!("{} {}", p.type_text, p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn argument_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| p.name.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Emit a struct declaration with its promotion machinery.
pub fn emit_struct(
    buffer: &mut EmissionBuffer,
    indent: usize,
    decl: &StructDecl,
    model: &TypeModel,
    promotion: &Promotion,
) {
    buffer.require(CODEDOM);
    buffer.require(COMPILER_SERVICES);

    let name = &decl.name;
    buffer.line(indent, &generated_code_attribute());
    for embed in decl.embeddings() {
        buffer.line(indent, &format!("[PromotedStruct(typeof({}))]", embed.type_text));
    }
    buffer.line(indent, &format!("public partial struct {} : EmptyInterface", name));
    buffer.line(indent, "{");
    let body = indent + 1;

    let named: Vec<&FieldDecl> = decl.named_fields().collect();
    if !named.is_empty() {
        for field in &named {
            buffer.line(body, &format!("public {} {};", field.type_text, sanitize(&field.name)));
        }
        buffer.blank();
    }

    for field in decl.fields.iter().filter(|f| f.embedded) {
        emit_embedding(buffer, body, field, promotion);
    }

    buffer.line(body, "// Constructors");
    buffer.line(body, &format!("public {}(NilType _)", name));
    buffer.line(body, "{");
    for field in &decl.fields {
        if field.embedded {
            buffer.line(
                body + 1,
                &format!("this.{} = {};", cell_name(field), embedded_zero(field, model)),
            );
        } else {
            buffer.line(
                body + 1,
                &format!(
                    "this.{} = {};",
                    sanitize(&field.name),
                    zero_value(&field.type_text, model)
                ),
            );
        }
    }
    buffer.line(body, "}");

    if !decl.fields.is_empty() {
        let params: Vec<String> = decl
            .fields
            .iter()
            .map(|f| {
                let ty = if f.embedded && f.pointer {
                    cell_type(f)
                } else {
                    f.type_text.clone()
                };
                format!("{} {}", ty, sanitize(&f.name))
            })
            .collect();
        buffer.blank();
        buffer.line(body, &format!("public {}({})", name, params.join(", ")));
        buffer.line(body, "{");
        for field in &decl.fields {
            let arg = sanitize(&field.name);
            let line = match (field.embedded, field.pointer) {
                (true, true) => format!("this.{} = {};", cell_name(field), arg),
                (true, false) => {
                    format!("this.{} = new {}({});", cell_name(field), cell_type(field), arg)
                }
                _ => format!("this.{} = {};", arg, arg),
            };
            buffer.line(body + 1, &line);
        }
        buffer.line(body, "}");
    }

    buffer.blank();
    emit_equality(buffer, body, decl);
    buffer.blank();
    emit_nil_comparisons(buffer, body, name);
    buffer.line(indent, "}");
}

/// Operands compared by value equality: named fields and the values held
/// by embedding cells.
fn equality_operands(decl: &StructDecl) -> Vec<String> {
    decl.fields
        .iter()
        .map(|field| {
            if field.embedded {
                format!("{}.Value", cell_name(field))
            } else {
                format!("this.{}", sanitize(&field.name))
            }
        })
        .collect()
}

fn emit_equality(buffer: &mut EmissionBuffer, indent: usize, decl: &StructDecl) {
    let name = &decl.name;
    let operands = equality_operands(decl);

    buffer.line(indent, &format!("// Value equality for {} struct", name));
    if operands.is_empty() {
        buffer.line(indent, &format!("public bool Equals({} other) => true;", name));
    } else {
        buffer.line(indent, &format!("public bool Equals({} other) =>", name));
        let last = operands.len() - 1;
        for (i, operand) in operands.iter().enumerate() {
            let other = operand.strip_prefix("this.").unwrap_or(operand);
            let end = if i == last { ";" } else { " &&" };
            buffer.line(
                indent + 1,
                &format!("Equals({}, other.{}){}", operand, other, end),
            );
        }
    }
    buffer.blank();
    buffer.line(
        indent,
        &format!(
            "public override bool Equals(object? obj) => obj is {} other && Equals(other);",
            name
        ),
    );
    buffer.blank();
    if operands.is_empty() {
        buffer.line(indent, "public override int GetHashCode() => 0;");
        return;
    }
    buffer.line(indent, "public override int GetHashCode()");
    buffer.line(indent, "{");
    buffer.line(indent + 1, "var hash = new System.HashCode();");
    for operand in &operands {
        buffer.line(indent + 1, &format!("hash.Add({});", operand));
    }
    buffer.line(indent + 1, "return hash.ToHashCode();");
    buffer.line(indent, "}");
}

fn emit_embedding(
    buffer: &mut EmissionBuffer,
    indent: usize,
    field: &FieldDecl,
    promotion: &Promotion,
) {
    let cell = cell_name(field);
    let source = if field.pointer { "pointer" } else { "value copy" };
    buffer.line(
        indent,
        &format!("// {} structure promotion - sourced from {}", field.type_text, source),
    );
    buffer.line(indent, &format!("private readonly {} {};", cell_type(field), cell));
    buffer.blank();
    if field.pointer {
        buffer.line(
            indent,
            &format!("public {} {} => {};", cell_type(field), sanitize(&field.name), cell),
        );
    } else {
        buffer.line(
            indent,
            &format!(
                "public ref {} {} => ref {}.Value;",
                field.type_text,
                sanitize(&field.name),
                cell
            ),
        );
    }
    buffer.blank();

    for member in promotion.through(&field.name) {
        emit_forwarder(buffer, indent, &cell, member);
        buffer.blank();
    }
}

fn emit_forwarder(buffer: &mut EmissionBuffer, indent: usize, cell: &str, member: &PromotedMember) {
    let name = sanitize(&member.name);
    match member.kind {
        MemberKind::Field => buffer.line(
            indent,
            &format!(
                "public ref {} {} => ref {}.Value.{};",
                member.type_text, name, cell, name
            ),
        ),
        MemberKind::Method => buffer.line(
            indent,
            &format!(
                "public {} {}({}) => {}.Value.{}({});",
                member.type_text,
                name,
                param_list(&member.params),
                cell,
                name,
                argument_list(&member.params)
            ),
        ),
    }
}

fn emit_nil_comparisons(buffer: &mut EmissionBuffer, indent: usize, name: &str) {
    let inline = "[MethodImpl(MethodImplOptions.AggressiveInlining)]";
    buffer.line(indent, &format!("// Enable comparisons between nil and {} struct", name));
    buffer.line(indent, inline);
    buffer.line(
        indent,
        &format!(
            "public static bool operator ==({} value, NilType nil) => value.Equals(new {}(nil));",
            name, name
        ),
    );
    buffer.blank();
    buffer.line(indent, inline);
    buffer.line(
        indent,
        &format!(
            "public static bool operator !=({} value, NilType nil) => !(value == nil);",
            name
        ),
    );
    buffer.blank();
    buffer.line(indent, inline);
    buffer.line(
        indent,
        &format!(
            "public static bool operator ==(NilType nil, {} value) => value == nil;",
            name
        ),
    );
    buffer.blank();
    buffer.line(indent, inline);
    buffer.line(
        indent,
        &format!(
            "public static bool operator !=(NilType nil, {} value) => value != nil;",
            name
        ),
    );
    buffer.blank();
    buffer.line(indent, inline);
    buffer.line(
        indent,
        &format!(
            "public static implicit operator {}(NilType nil) => new {}(nil);",
            name, name
        ),
    );
}

/// Emit `type Name Underlying` for a non-struct underlying type.
pub fn emit_named(buffer: &mut EmissionBuffer, indent: usize, name: &str, underlying: &str) {
    buffer.require(CODEDOM);
    buffer.line(indent, &generated_code_attribute());
    buffer.line(indent, &format!("public partial struct {}", name));
    buffer.line(indent, "{");
    let body = indent + 1;
    buffer.line(body, &format!("public {} m_value;", underlying));
    buffer.blank();
    buffer.line(
        body,
        &format!("public {}({} value) => m_value = value;", name, underlying),
    );
    buffer.blank();
    buffer.line(
        body,
        &format!(
            "public static implicit operator {}({} value) => new {}(value);",
            name, underlying, name
        ),
    );
    buffer.blank();
    buffer.line(
        body,
        &format!(
            "public static implicit operator {}({} value) => value.m_value;",
            underlying, name
        ),
    );
    buffer.line(indent, "}");
}

/// One method of an interface declaration.
#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub result: String,
}

/// Emit an interface; embedded interfaces become base interfaces.
pub fn emit_interface(
    buffer: &mut EmissionBuffer,
    indent: usize,
    name: &str,
    bases: &[String],
    methods: &[InterfaceMethod],
) {
    buffer.require(CODEDOM);
    buffer.line(indent, &generated_code_attribute());
    if bases.is_empty() {
        buffer.line(indent, &format!("public partial interface {}", name));
    } else {
        buffer.line(
            indent,
            &format!("public partial interface {} : {}", name, bases.join(", ")),
        );
    }
    buffer.line(indent, "{");
    for method in methods {
        buffer.line(
            indent + 1,
            &format!(
                "{} {}({});",
                method.result,
                sanitize(&method.name),
                param_list(&method.params)
            ),
        );
    }
    buffer.line(indent, "}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;
    use crate::promotion::promote;

    fn emit(src: &str, name: &str) -> String {
        let model = TypeModel::collect(&parse_source(format!("package p\n\n{}", src)).unwrap());
        let decl = model.struct_decl(name).unwrap().clone();
        let promotion = promote(&model, name);
        let mut buffer = EmissionBuffer::new();
        emit_struct(&mut buffer, 0, &decl, &model, &promotion);
        buffer.finalize()
    }

    #[test]
    fn test_cells_and_forwarders() {
        let out = emit(
            "type Person struct { name string; age int32 }\n\
             type Employee struct { position string }\n\
             type Record struct { Person; Employee }\n",
            "Record",
        );
        assert!(out.contains("[PromotedStruct(typeof(Person))]"));
        assert!(out.contains("private readonly Ref<Person> m_PersonRef;"));
        assert!(out.contains("public ref @string name => ref m_PersonRef.Value.name;"));
        assert!(out.contains("public ref int age => ref m_PersonRef.Value.age;"));
        assert!(out.contains("public ref @string position => ref m_EmployeeRef.Value.position;"));
        assert!(out.contains("this.m_PersonRef = new Ref<Person>(new Person(nil));"));
        assert!(out.contains("public Record(Person Person, Employee Employee)"));
        assert!(out.contains("this.m_EmployeeRef = new Ref<Employee>(Employee);"));
    }

    #[test]
    fn test_ambiguous_field_has_no_accessor() {
        let out = emit(
            "type P struct { v int }\ntype Q struct { v int }\ntype O struct { P; Q }\n",
            "O",
        );
        assert!(!out.contains(" v => "));
        assert!(out.contains("private readonly Ref<P> m_PRef;"));
        assert!(out.contains("private readonly Ref<Q> m_QRef;"));
    }

    #[test]
    fn test_nil_comparisons_are_symmetric() {
        let out = emit("type P struct { v int }\ntype O struct { P }\n", "O");
        assert!(out.contains("public static bool operator ==(O value, NilType nil) => value.Equals(new O(nil));"));
        assert!(out.contains("public static bool operator ==(NilType nil, O value) => value == nil;"));
        assert!(out.contains("public static bool operator !=(NilType nil, O value) => value != nil;"));
        assert!(out.contains("public static implicit operator O(NilType nil) => new O(nil);"));
    }

    #[test]
    fn test_equality_compares_fields_and_cell_values() {
        let out = emit("type P struct { v int }\ntype O struct { P; w int }\n", "O");
        assert!(out.contains(
            "    public bool Equals(O other) =>\n        \
             Equals(m_PRef.Value, other.m_PRef.Value) &&\n        \
             Equals(this.w, other.w);\n"
        ));
        assert!(out.contains("public override bool Equals(object? obj) => obj is O other && Equals(other);"));
        assert!(out.contains("        hash.Add(m_PRef.Value);\n        hash.Add(this.w);\n"));
        assert!(out.contains("        return hash.ToHashCode();"));
    }

    #[test]
    fn test_empty_struct_equality() {
        let model = TypeModel::collect(&parse_source("package p\ntype A struct{}\n").unwrap());
        let decl = model.struct_decl("A").unwrap().clone();
        let mut buffer = EmissionBuffer::new();
        emit_struct(&mut buffer, 0, &decl, &model, &Promotion::default());
        let out = buffer.finalize();
        assert!(out.contains("public bool Equals(A other) => true;"));
        assert!(out.contains("public override int GetHashCode() => 0;"));
    }

    #[test]
    fn test_pointer_embedding_uses_ptr_cell() {
        let out = emit("type P struct { v int }\ntype O struct { *P }\n", "O");
        assert!(out.contains("private readonly ptr<P> m_PRef;"));
        assert!(out.contains("this.m_PRef = new ptr<P>(new P(nil));"));
        assert!(out.contains("Equals(m_PRef.Value, other.m_PRef.Value);"));
        assert!(out.contains("public O(ptr<P> P)"));
        assert!(out.contains("// P structure promotion - sourced from pointer"));
    }

    #[test]
    fn test_requires_attribute_namespaces() {
        let model = TypeModel::collect(&parse_source("package p\ntype A struct{}\n").unwrap());
        let decl = model.struct_decl("A").unwrap().clone();
        let mut buffer = EmissionBuffer::new();
        emit_struct(&mut buffer, 1, &decl, &model, &Promotion::default());
        let required: Vec<_> = buffer.required().collect();
        assert_eq!(required, vec![CODEDOM, COMPILER_SERVICES]);
        // No fields: only the zero constructor.
        assert!(!buffer.as_str().contains("public A()"));
    }
}
