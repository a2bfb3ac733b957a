//! Field and method promotion through embedded structs.
//!
//! Members are searched breadth-first by embedding depth and, within one
//! depth, in declaration order. The shallowest depth that offers a name
//! decides it: exactly one candidate there is promoted, two or more make
//! the name ambiguous. Either way deeper candidates for that name are
//! dropped. Names declared directly on the outer type are never promoted.

use crate::model::{EmbeddedTypeRelation, Param, TypeModel};
use std::collections::{HashMap, HashSet};

/// Embedding chains longer than this are not followed.
const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

/// A member reachable on the outer type through one of its embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedMember {
    pub name: String,
    pub kind: MemberKind,
    /// The outer type's own embedded field the access is forwarded through.
    pub via: String,
    /// The type that declares the member.
    pub owner: String,
    /// 1 for members of a direct embedding.
    pub depth: usize,
    /// Field type, or method result type.
    pub type_text: String,
    pub params: Vec<Param>,
}

/// Promotion result for one outer type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Promotion {
    pub members: Vec<PromotedMember>,
    /// Names offered by several embeddings at their shallowest depth.
    pub ambiguous: Vec<String>,
    /// Embedded types whose members are unknown (other packages, undeclared).
    pub unresolved: Vec<String>,
}

impl Promotion {
    /// Promoted members forwarded through one direct embedding.
    pub fn through<'a>(&'a self, via: &'a str) -> impl Iterator<Item = &'a PromotedMember> + 'a {
        self.members.iter().filter(move |m| m.via == via)
    }

    pub fn get(&self, name: &str) -> Option<&PromotedMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

struct Frontier {
    relation: EmbeddedTypeRelation,
    via: String,
    path: Vec<String>,
}

/// Compute the promoted members of `outer`.
pub fn promote(model: &TypeModel, outer: &str) -> Promotion {
    let mut promotion = Promotion::default();
    let Some(decl) = model.struct_decl(outer) else {
        return promotion;
    };

    let mut claimed: HashSet<String> = decl.fields.iter().map(|f| f.name.clone()).collect();
    claimed.extend(model.methods_of(outer).iter().map(|m| m.name.clone()));

    let mut frontier: Vec<Frontier> = decl
        .embeddings()
        .into_iter()
        .map(|relation| Frontier {
            via: relation.embedded.clone(),
            path: vec![outer.to_string(), relation.embedded.clone()],
            relation,
        })
        .collect();

    let mut depth = 1;
    while !frontier.is_empty() && depth <= MAX_DEPTH {
        let mut order: Vec<String> = Vec::new();
        let mut candidates: HashMap<String, Vec<PromotedMember>> = HashMap::new();
        let mut next = Vec::new();

        for entry in &frontier {
            let embedded = &entry.relation.embedded;
            let mut offer = |member: PromotedMember| {
                if !candidates.contains_key(&member.name) {
                    order.push(member.name.clone());
                }
                candidates.entry(member.name.clone()).or_default().push(member);
            };

            let known = !entry.relation.qualified
                && (model.declares(embedded) || !model.methods_of(embedded).is_empty());
            if !known {
                if depth == 1 {
                    promotion.unresolved.push(entry.relation.type_text.clone());
                }
                continue;
            }

            if let Some(inner) = model.struct_decl(embedded) {
                for field in &inner.fields {
                    offer(PromotedMember {
                        name: field.name.clone(),
                        kind: MemberKind::Field,
                        via: entry.via.clone(),
                        owner: embedded.clone(),
                        depth,
                        type_text: field.type_text.clone(),
                        params: Vec::new(),
                    });
                }
                for relation in inner.embeddings() {
                    if entry.path.contains(&relation.embedded) {
                        continue;
                    }
                    let mut path = entry.path.clone();
                    path.push(relation.embedded.clone());
                    next.push(Frontier {
                        via: entry.via.clone(),
                        path,
                        relation,
                    });
                }
            }
            for method in model.methods_of(embedded) {
                offer(PromotedMember {
                    name: method.name.clone(),
                    kind: MemberKind::Method,
                    via: entry.via.clone(),
                    owner: embedded.clone(),
                    depth,
                    type_text: method.result.clone(),
                    params: method.params.clone(),
                });
            }
        }

        for name in order {
            if !claimed.insert(name.clone()) {
                continue;
            }
            let mut offered = candidates.remove(&name).unwrap_or_default();
            if offered.len() == 1 {
                promotion.members.extend(offered.pop());
            } else {
                promotion.ambiguous.push(name);
            }
        }

        frontier = next;
        depth += 1;
    }

    promotion
}
