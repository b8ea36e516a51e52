//! The dataflow type lattice.
//!
//! Every base type carries a nullability bit; a nullable type emits as
//! `Option<T>`. Tuples are the row types flowing through operators, and
//! Z-sets are `User` specializations with a fixed name, so the lattice stays
//! a closed sum type with a handful of constructors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IrError;
use crate::node::{NodeMeta, Origin};
use crate::printer::Printer;

/// Type name of the Z-set container expected by the dataflow host.
pub const ZSET_NAME: &str = "ZSetHashMap";
/// Type name of the opaque weight supplied by the dataflow host.
pub const WEIGHT_NAME: &str = "Weight";

/// Width of a signed integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// A dataflow type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    pub meta: NodeMeta,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeKind {
    Bool {
        nullable: bool,
    },
    Signed {
        width: IntWidth,
        nullable: bool,
    },
    /// 32-bit floating point.
    Float {
        nullable: bool,
    },
    /// 64-bit floating point.
    Double {
        nullable: bool,
    },
    String {
        nullable: bool,
    },
    /// Ordered, unnamed elements. A tuple of arity 1 emits as its sole
    /// element.
    Tuple {
        elements: Vec<Type>,
        nullable: bool,
    },
    /// Named fields with unique names. Never nullable.
    Struct {
        name: String,
        fields: Vec<(String, Type)>,
    },
    /// A stream of elements; not independently nullable.
    Stream {
        element: Box<Type>,
    },
    /// Reference to a type the dataflow host supplies, possibly generic.
    User {
        name: String,
        args: Vec<Type>,
        nullable: bool,
    },
}

impl Type {
    fn new(kind: TypeKind) -> Self {
        Self {
            meta: NodeMeta::default(),
            kind,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.meta.origin = origin;
        self
    }

    pub fn boolean(nullable: bool) -> Self {
        Self::new(TypeKind::Bool { nullable })
    }

    pub fn signed(width: IntWidth, nullable: bool) -> Self {
        Self::new(TypeKind::Signed { width, nullable })
    }

    pub fn float32(nullable: bool) -> Self {
        Self::new(TypeKind::Float { nullable })
    }

    pub fn float64(nullable: bool) -> Self {
        Self::new(TypeKind::Double { nullable })
    }

    pub fn string(nullable: bool) -> Self {
        Self::new(TypeKind::String { nullable })
    }

    pub fn tuple(elements: Vec<Type>) -> Self {
        Self::new(TypeKind::Tuple {
            elements,
            nullable: false,
        })
    }

    /// Builds a struct type; field names must be unique.
    pub fn structure(
        name: impl Into<String>,
        fields: Vec<(String, Type)>,
    ) -> Result<Self, IrError> {
        let name = name.into();
        for (i, (field, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(prior, _)| prior == field) {
                return Err(IrError::Invariant(format!(
                    "field name '{field}' is duplicated in struct '{name}'"
                )));
            }
        }
        Ok(Self::new(TypeKind::Struct { name, fields }))
    }

    pub fn stream(element: Type) -> Self {
        Self::new(TypeKind::Stream {
            element: Box::new(element),
        })
    }

    pub fn user(name: impl Into<String>, args: Vec<Type>, nullable: bool) -> Self {
        Self::new(TypeKind::User {
            name: name.into(),
            args,
            nullable,
        })
    }

    /// The fixed weight type of the dataflow host.
    pub fn weight() -> Self {
        Self::user(WEIGHT_NAME, Vec::new(), false)
    }

    /// A Z-set over `element`, weighted by [`Type::weight`].
    pub fn zset(element: Type) -> Self {
        Self::user(ZSET_NAME, vec![element, Type::weight()], false)
    }

    pub fn nullable(&self) -> bool {
        match &self.kind {
            TypeKind::Bool { nullable }
            | TypeKind::Signed { nullable, .. }
            | TypeKind::Float { nullable }
            | TypeKind::Double { nullable }
            | TypeKind::String { nullable }
            | TypeKind::Tuple { nullable, .. }
            | TypeKind::User { nullable, .. } => *nullable,
            TypeKind::Struct { .. } => false,
            TypeKind::Stream { element } => element.nullable(),
        }
    }

    /// Returns an equal-except-for-nullability copy. Idempotent: setting the
    /// bit a type already has returns a plain copy.
    pub fn set_nullable(&self, nullable: bool) -> Result<Type, IrError> {
        if self.nullable() == nullable {
            return Ok(self.clone());
        }
        let kind = match &self.kind {
            TypeKind::Bool { .. } => TypeKind::Bool { nullable },
            TypeKind::Signed { width, .. } => TypeKind::Signed {
                width: *width,
                nullable,
            },
            TypeKind::Float { .. } => TypeKind::Float { nullable },
            TypeKind::Double { .. } => TypeKind::Double { nullable },
            TypeKind::String { .. } => TypeKind::String { nullable },
            TypeKind::Tuple { elements, .. } => TypeKind::Tuple {
                elements: elements.clone(),
                nullable,
            },
            TypeKind::User { name, args, .. } => TypeKind::User {
                name: name.clone(),
                args: args.clone(),
                nullable,
            },
            TypeKind::Struct { .. } => {
                return Err(IrError::Unsupported("nullable struct types".into()));
            }
            TypeKind::Stream { .. } => {
                return Err(IrError::Invariant(
                    "stream types have no nullability of their own".into(),
                ));
            }
        };
        Ok(Type {
            meta: NodeMeta::new(self.meta.origin.clone()),
            kind,
        })
    }

    /// Structural equality, ignoring node metadata.
    pub fn same(&self, other: &Type) -> bool {
        use TypeKind::*;
        match (&self.kind, &other.kind) {
            (Bool { nullable: a }, Bool { nullable: b })
            | (Float { nullable: a }, Float { nullable: b })
            | (Double { nullable: a }, Double { nullable: b })
            | (String { nullable: a }, String { nullable: b }) => a == b,
            (
                Signed {
                    width: wa,
                    nullable: a,
                },
                Signed {
                    width: wb,
                    nullable: b,
                },
            ) => wa == wb && a == b,
            (
                Tuple {
                    elements: ea,
                    nullable: a,
                },
                Tuple {
                    elements: eb,
                    nullable: b,
                },
            ) => {
                a == b
                    && ea.len() == eb.len()
                    && ea.iter().zip(eb).all(|(x, y)| x.same(y))
            }
            (
                Struct {
                    name: na,
                    fields: fa,
                },
                Struct {
                    name: nb,
                    fields: fb,
                },
            ) => {
                na == nb
                    && fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb)
                        .all(|((fna, ta), (fnb, tb))| fna == fnb && ta.same(tb))
            }
            (Stream { element: ea }, Stream { element: eb }) => ea.same(eb),
            (
                User {
                    name: na,
                    args: aa,
                    nullable: a,
                },
                User {
                    name: nb,
                    args: ab,
                    nullable: b,
                },
            ) => {
                na == nb
                    && a == b
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| x.same(y))
            }
            _ => false,
        }
    }

    pub fn is_zset(&self) -> bool {
        matches!(&self.kind, TypeKind::User { name, .. } if name == ZSET_NAME)
    }

    pub fn write(&self, p: &mut Printer) {
        match &self.kind {
            TypeKind::Bool { nullable } => wrap_option(p, "bool", *nullable),
            TypeKind::Signed { width, nullable } => {
                wrap_option(p, &format!("i{}", width.bits()), *nullable)
            }
            TypeKind::Float { nullable } => wrap_option(p, "f32", *nullable),
            TypeKind::Double { nullable } => wrap_option(p, "f64", *nullable),
            TypeKind::String { nullable } => wrap_option(p, "String", *nullable),
            TypeKind::Tuple { elements, .. } => {
                if elements.len() == 1 {
                    elements[0].write(p);
                    return;
                }
                p.append("(");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        p.append(", ");
                    }
                    element.write(p);
                }
                p.append(")");
            }
            TypeKind::Struct { name, fields } => {
                p.append(name).append("{");
                for (i, (field, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        p.append(", ");
                    }
                    p.append(field).append(": ");
                    ty.write(p);
                }
                p.append("}");
            }
            TypeKind::Stream { element } => {
                // The first parameter is the circuit type, left inferred.
                p.append("Stream<_, ");
                element.write(p);
                p.append(">");
            }
            TypeKind::User {
                name,
                args,
                nullable,
            } => {
                let mut inner = Printer::new();
                inner.append(name);
                if !args.is_empty() {
                    inner.append("<");
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            inner.append(", ");
                        }
                        arg.write(&mut inner);
                    }
                    inner.append(">");
                }
                wrap_option(p, &inner.finish(), *nullable);
            }
        }
    }

    pub fn to_rust(&self) -> String {
        let mut p = Printer::new();
        self.write(&mut p);
        p.finish()
    }
}

fn wrap_option(p: &mut Printer, inner: &str, nullable: bool) {
    if nullable {
        p.append("Option<").append(inner).append(">");
    } else {
        p.append(inner);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust())
    }
}
