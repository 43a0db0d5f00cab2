//! Type system for the Quartz C compiler
//!
//! The `TypeRegistry` owns every type value for the duration of a
//! translation unit and hands out copyable `TypeRef` handles into its
//! arena. Void, arithmetic, and pointer types are interned, so handle
//! equality is identity for them; arrays, functions, records, and enums
//! get a fresh identity per construction site. Forward references
//! (a struct containing a pointer to itself) work because the pointer's
//! pointee handle exists before the record is completed.

pub mod arith;
pub mod record;

pub use arith::{combine_spec, spec, spec_to_string, usual_arithmetic, ArithKind};
pub use record::{Member, MemberDecl, Record};

use qcc_common::{CompilerError, SourceLocation};
use record::{compute_layout, LayoutInput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Handle into the type registry arena
pub type TypeRef = u32;

/// Errors raised while forming or completing types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("{location}: invalid type specifier combination `{spec}`")]
    InvalidTypeSpec {
        spec: String,
        location: SourceLocation,
    },

    #[error("{location}: incomplete type `{type_name}` where a complete type is required")]
    IncompleteType {
        type_name: String,
        location: SourceLocation,
    },

    #[error("{location}: type mismatch: expected {expected}, found `{found}`")]
    TypeMismatch {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("{location}: duplicate member `{name}`")]
    DuplicateMember {
        name: String,
        location: SourceLocation,
    },
}

impl From<TypeError> for CompilerError {
    fn from(err: TypeError) -> Self {
        let location = match &err {
            TypeError::InvalidTypeSpec { location, .. }
            | TypeError::IncompleteType { location, .. }
            | TypeError::TypeMismatch { location, .. }
            | TypeError::DuplicateMember { location, .. } => location.clone(),
        };
        CompilerError::type_error(err.to_string(), location)
    }
}

/// Round `offset` up to the next multiple of `align`
pub fn align_to(offset: u64, align: u64) -> u64 {
    debug_assert!(align > 0, "alignment must be positive");
    offset.div_ceil(align) * align
}

/// Type qualifiers ({const, restrict, volatile, _Atomic})
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_restrict: bool,
    pub is_volatile: bool,
    pub is_atomic: bool,
}

impl Qualifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn const_only() -> Self {
        Self {
            is_const: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Union of two qualifier sets
    pub fn merged(self, other: Qualifiers) -> Qualifiers {
        Qualifiers {
            is_const: self.is_const || other.is_const,
            is_restrict: self.is_restrict || other.is_restrict,
            is_volatile: self.is_volatile || other.is_volatile,
            is_atomic: self.is_atomic || other.is_atomic,
        }
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for (set, name) in [
            (self.is_const, "const"),
            (self.is_restrict, "restrict"),
            (self.is_volatile, "volatile"),
            (self.is_atomic, "_Atomic"),
        ] {
            if set {
                write!(f, "{}{}", sep, name)?;
                sep = " ";
            }
        }
        Ok(())
    }
}

/// A named constant of an enumerated type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// A function signature (return type, ordered parameter types, flags)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncSig {
    pub return_type: TypeRef,
    pub params: Vec<TypeRef>,
    pub variadic: bool,
    pub is_inline: bool,
    pub is_noreturn: bool,
}

/// The closed set of type variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Void,
    Arith(ArithKind),
    Pointer { pointee: TypeRef },
    Array { element: TypeRef, len: Option<u64> },
    Function(FuncSig),
    Record(Record),
    Enum {
        underlying: TypeRef,
        members: Vec<EnumMember>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct TypeEntry {
    kind: TypeKind,
    quals: Qualifiers,
    complete: bool,
}

/// Owner of all type values for one translation unit
#[derive(Debug)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    arith_cache: HashMap<(ArithKind, Qualifiers), TypeRef>,
    pointer_cache: HashMap<(TypeRef, Qualifiers), TypeRef>,
    void_ty: TypeRef,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            arith_cache: HashMap::new(),
            pointer_cache: HashMap::new(),
            void_ty: 0,
        };
        registry.void_ty = registry.alloc(TypeKind::Void, Qualifiers::none(), false);
        registry
    }

    fn alloc(&mut self, kind: TypeKind, quals: Qualifiers, complete: bool) -> TypeRef {
        let ty = self.entries.len() as TypeRef;
        self.entries.push(TypeEntry {
            kind,
            quals,
            complete,
        });
        ty
    }

    fn entry(&self, ty: TypeRef) -> &TypeEntry {
        &self.entries[ty as usize]
    }

    /// The single interned `void` handle
    pub fn void_type(&self) -> TypeRef {
        self.void_ty
    }

    /// Interned arithmetic type for a canonical kind
    pub fn arith(&mut self, kind: ArithKind) -> TypeRef {
        self.arith_qualified(kind, Qualifiers::none())
    }

    pub fn arith_qualified(&mut self, kind: ArithKind, quals: Qualifiers) -> TypeRef {
        if let Some(&ty) = self.arith_cache.get(&(kind, quals)) {
            return ty;
        }
        let ty = self.alloc(TypeKind::Arith(kind), quals, true);
        self.arith_cache.insert((kind, quals), ty);
        ty
    }

    /// Canonicalize a specifier bitset and intern the resulting kind
    pub fn arith_from_spec(
        &mut self,
        bits: u32,
        location: &SourceLocation,
    ) -> Result<TypeRef, TypeError> {
        let kind = ArithKind::from_spec(bits, location)?;
        Ok(self.arith(kind))
    }

    /// Interned pointer type, keyed on the identity of the pointee
    pub fn pointer_to(&mut self, pointee: TypeRef) -> TypeRef {
        self.pointer_qualified(pointee, Qualifiers::none())
    }

    pub fn pointer_qualified(&mut self, pointee: TypeRef, quals: Qualifiers) -> TypeRef {
        if let Some(&ty) = self.pointer_cache.get(&(pointee, quals)) {
            return ty;
        }
        let ty = self.alloc(TypeKind::Pointer { pointee }, quals, true);
        self.pointer_cache.insert((pointee, quals), ty);
        ty
    }

    /// Array types are never interned: each declaration site gets its
    /// own identity and completion timing. Arrays are const-qualified.
    pub fn array_of(&mut self, element: TypeRef, len: Option<u64>) -> TypeRef {
        let complete = matches!(len, Some(n) if n > 0);
        self.alloc(
            TypeKind::Array { element, len },
            Qualifiers::const_only(),
            complete,
        )
    }

    /// Set the length of an array declared without one, completing it
    pub fn complete_array(&mut self, ty: TypeRef, len: u64) {
        let entry = &mut self.entries[ty as usize];
        match &mut entry.kind {
            TypeKind::Array { len: slot, .. } => {
                *slot = Some(len);
                entry.complete = len > 0;
            }
            other => unreachable!("complete_array on non-array type {:?}", other),
        }
    }

    pub fn function(&mut self, sig: FuncSig) -> TypeRef {
        self.alloc(TypeKind::Function(sig), Qualifiers::none(), false)
    }

    /// Fresh, incomplete struct or union type
    pub fn record(&mut self, is_struct: bool, has_tag: bool) -> TypeRef {
        self.alloc(
            TypeKind::Record(Record::new(is_struct, has_tag)),
            Qualifiers::none(),
            false,
        )
    }

    /// Enumerated type; the underlying type is `int`. Fresh identity
    /// per declaration site; constants are added as the parser reads
    /// the enumerator list.
    pub fn enumeration(&mut self) -> TypeRef {
        let underlying = self.arith(ArithKind::Int);
        self.alloc(
            TypeKind::Enum {
                underlying,
                members: Vec::new(),
            },
            Qualifiers::none(),
            true,
        )
    }

    /// Record a named constant on an enumerated type
    pub fn add_enumerator(
        &mut self,
        ty: TypeRef,
        name: &str,
        value: i64,
        location: &SourceLocation,
    ) -> Result<(), TypeError> {
        let members = match self.kind(ty) {
            TypeKind::Enum { members, .. } => members,
            other => unreachable!("add_enumerator on non-enum type {:?}", other),
        };
        if members.iter().any(|m| m.name == name) {
            return Err(TypeError::DuplicateMember {
                name: name.to_string(),
                location: location.clone(),
            });
        }
        match &mut self.entries[ty as usize].kind {
            TypeKind::Enum { members, .. } => members.push(EnumMember {
                name: name.to_string(),
                value,
            }),
            _ => unreachable!(),
        }
        Ok(())
    }

    /// The declared constants of an enumerated type
    pub fn enum_members(&self, ty: TypeRef) -> Option<&[EnumMember]> {
        match self.kind(ty) {
            TypeKind::Enum { members, .. } => Some(members),
            _ => None,
        }
    }

    /// The value of a named enumerator, if the type declares it
    pub fn enumerator_value(&self, ty: TypeRef, name: &str) -> Option<i64> {
        self.enum_members(ty)?
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value)
    }

    pub fn kind(&self, ty: TypeRef) -> &TypeKind {
        &self.entry(ty).kind
    }

    pub fn quals(&self, ty: TypeRef) -> Qualifiers {
        self.entry(ty).quals
    }

    pub fn is_complete(&self, ty: TypeRef) -> bool {
        self.entry(ty).complete
    }

    /// Storage size in bytes; `None` for incomplete and function types
    pub fn width(&self, ty: TypeRef) -> Option<u64> {
        match self.kind(ty) {
            TypeKind::Void => Some(0),
            TypeKind::Arith(kind) => Some(kind.width()),
            TypeKind::Pointer { .. } => Some(8),
            TypeKind::Array { element, len } => {
                let len = (*len)?;
                if len == 0 {
                    return None;
                }
                Some(self.width(*element)? * len)
            }
            TypeKind::Function(_) => None,
            TypeKind::Record(rec) => {
                if self.is_complete(ty) {
                    Some(rec.width())
                } else {
                    None
                }
            }
            TypeKind::Enum { underlying, .. } => self.width(*underlying),
        }
    }

    pub fn align(&self, ty: TypeRef) -> u64 {
        match self.kind(ty) {
            TypeKind::Void => 1,
            TypeKind::Arith(kind) => kind.align(),
            TypeKind::Pointer { .. } => 8,
            TypeKind::Array { element, .. } => self.align(*element),
            TypeKind::Function(_) => 1,
            TypeKind::Record(rec) => rec.align(),
            TypeKind::Enum { underlying, .. } => self.align(*underlying),
        }
    }

    /// Width in a storage-requiring context (variable definition,
    /// sizeof, member access). The type must be complete.
    pub fn storage_size(&self, ty: TypeRef, location: &SourceLocation) -> Result<u64, TypeError> {
        if matches!(self.kind(ty), TypeKind::Function(_)) {
            return Err(TypeError::TypeMismatch {
                expected: "object type".to_string(),
                found: self.type_name(ty),
                location: location.clone(),
            });
        }
        if !self.is_complete(ty) {
            return Err(TypeError::IncompleteType {
                type_name: self.type_name(ty),
                location: location.clone(),
            });
        }
        self.width(ty).ok_or_else(|| TypeError::IncompleteType {
            type_name: self.type_name(ty),
            location: location.clone(),
        })
    }

    /// Byte step for pointer arithmetic over a pointee type.
    /// `void*` steps by one byte (GNU extension).
    pub fn step_width(&self, pointee: TypeRef) -> Option<u64> {
        match self.kind(pointee) {
            TypeKind::Void => Some(1),
            _ => self.width(pointee),
        }
    }

    /// The pointed-to type for pointers, or the element type for
    /// arrays. Arrays share this property with pointers, but never
    /// compare equal to them.
    pub fn pointer_target(&self, ty: TypeRef) -> Option<TypeRef> {
        match self.kind(ty) {
            TypeKind::Pointer { pointee } => Some(*pointee),
            TypeKind::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Array-to-pointer and function-to-pointer decay
    pub fn decayed(&mut self, ty: TypeRef) -> TypeRef {
        match self.kind(ty) {
            TypeKind::Array { element, .. } => {
                let element = *element;
                self.pointer_to(element)
            }
            TypeKind::Function(_) => self.pointer_to(ty),
            _ => ty,
        }
    }

    pub fn is_void(&self, ty: TypeRef) -> bool {
        matches!(self.kind(ty), TypeKind::Void)
    }

    pub fn is_arith(&self, ty: TypeRef) -> bool {
        matches!(self.kind(ty), TypeKind::Arith(_))
    }

    pub fn is_record(&self, ty: TypeRef) -> bool {
        matches!(self.kind(ty), TypeKind::Record(_))
    }

    pub fn is_scalar(&self, ty: TypeRef) -> bool {
        self.is_arith(ty) || self.pointer_target(ty).is_some()
    }

    pub fn is_integer(&self, ty: TypeRef) -> bool {
        self.arith_kind(ty).is_some_and(|k| k.is_integer())
    }

    pub fn is_float(&self, ty: TypeRef) -> bool {
        self.arith_kind(ty).is_some_and(|k| k.is_float())
    }

    /// The arithmetic kind of a type; enums answer with their
    /// underlying integer kind
    pub fn arith_kind(&self, ty: TypeRef) -> Option<ArithKind> {
        match self.kind(ty) {
            TypeKind::Arith(kind) => Some(*kind),
            TypeKind::Enum { underlying, .. } => self.arith_kind(*underlying),
            _ => None,
        }
    }

    /// Strict structural identity, qualifiers included. Records and
    /// enums are equal only to themselves.
    pub fn equal(&self, a: TypeRef, b: TypeRef) -> bool {
        if a == b {
            return true;
        }
        let (ea, eb) = (self.entry(a), self.entry(b));
        if ea.quals != eb.quals {
            return false;
        }
        match (&ea.kind, &eb.kind) {
            (TypeKind::Void, TypeKind::Void) => true,
            (TypeKind::Arith(x), TypeKind::Arith(y)) => x == y,
            (TypeKind::Pointer { pointee: x }, TypeKind::Pointer { pointee: y }) => {
                self.equal(*x, *y)
            }
            (
                TypeKind::Array {
                    element: x,
                    len: lx,
                },
                TypeKind::Array {
                    element: y,
                    len: ly,
                },
            ) => lx == ly && self.equal(*x, *y),
            (TypeKind::Function(f), TypeKind::Function(g)) => {
                f.variadic == g.variadic
                    && f.is_inline == g.is_inline
                    && f.is_noreturn == g.is_noreturn
                    && self.equal(f.return_type, g.return_type)
                    && f.params.len() == g.params.len()
                    && f.params
                        .iter()
                        .zip(&g.params)
                        .all(|(&p, &q)| self.equal(p, q))
            }
            _ => false,
        }
    }

    /// C's compatible-type relation, used for redeclaration and
    /// assignment checks and function-pointer interop.
    pub fn compatible(&self, a: TypeRef, b: TypeRef) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Void, TypeKind::Void) => true,
            // Looser than equality: assignment conversions cover narrowing
            (TypeKind::Arith(_), TypeKind::Arith(_)) => true,
            (TypeKind::Enum { .. }, TypeKind::Arith(_))
            | (TypeKind::Arith(_), TypeKind::Enum { .. }) => true,
            (TypeKind::Pointer { pointee: x }, TypeKind::Pointer { pointee: y }) => {
                self.quals(*x) == self.quals(*y) && self.compatible(*x, *y)
            }
            (
                TypeKind::Array {
                    element: x,
                    len: lx,
                },
                TypeKind::Array {
                    element: y,
                    len: ly,
                },
            ) => {
                let lengths_ok = match (lx, ly) {
                    (None, None) => true,
                    (Some(m), Some(n)) => m == n,
                    _ => false,
                };
                lengths_ok && self.compatible(*x, *y)
            }
            (TypeKind::Function(f), TypeKind::Function(g)) => {
                f.variadic == g.variadic
                    && self.compatible(f.return_type, g.return_type)
                    && f.params.len() == g.params.len()
                    && f.params
                        .iter()
                        .zip(&g.params)
                        .all(|(&p, &q)| self.params_compatible(p, q))
            }
            // Records: name equivalence within a translation unit,
            // covered by the identity fast path above
            _ => false,
        }
    }

    /// Parameter compatibility after array/function adjustment
    fn params_compatible(&self, p: TypeRef, q: TypeRef) -> bool {
        let adjust = |ty: TypeRef| match self.kind(ty) {
            TypeKind::Array { element, .. } => AdjustedParam::PointerTo(*element),
            TypeKind::Function(_) => AdjustedParam::PointerTo(ty),
            _ => AdjustedParam::Plain(ty),
        };
        match (adjust(p), adjust(q)) {
            (AdjustedParam::Plain(x), AdjustedParam::Plain(y)) => self.compatible(x, y),
            (AdjustedParam::PointerTo(x), AdjustedParam::PointerTo(y)) => {
                self.quals(x) == self.quals(y) && self.compatible(x, y)
            }
            (AdjustedParam::Plain(x), AdjustedParam::PointerTo(y))
            | (AdjustedParam::PointerTo(y), AdjustedParam::Plain(x)) => {
                match self.kind(x) {
                    TypeKind::Pointer { pointee } => {
                        self.quals(*pointee) == self.quals(y) && self.compatible(*pointee, y)
                    }
                    _ => false,
                }
            }
        }
    }

    /// Declare a named member on an incomplete record
    pub fn add_member(
        &mut self,
        rec: TypeRef,
        name: &str,
        member_ty: TypeRef,
        location: &SourceLocation,
    ) -> Result<(), TypeError> {
        if !self.is_complete(member_ty) {
            return Err(TypeError::IncompleteType {
                type_name: self.type_name(member_ty),
                location: location.clone(),
            });
        }
        if self.record_claims_name(rec, name) {
            return Err(TypeError::DuplicateMember {
                name: name.to_string(),
                location: location.clone(),
            });
        }
        self.push_member_decl(
            rec,
            MemberDecl {
                name: Some(name.to_string()),
                ty: member_ty,
            },
        );
        Ok(())
    }

    /// Declare an anonymous struct/union member; its fields are
    /// promoted into the enclosing record at completion time
    pub fn add_anonymous_member(
        &mut self,
        rec: TypeRef,
        anon: TypeRef,
        location: &SourceLocation,
    ) -> Result<(), TypeError> {
        let inner = match self.kind(anon) {
            TypeKind::Record(r) if self.is_complete(anon) => r,
            _ => {
                return Err(TypeError::IncompleteType {
                    type_name: self.type_name(anon),
                    location: location.clone(),
                })
            }
        };
        let names: Vec<String> = inner.members().iter().map(|m| m.name.clone()).collect();
        for name in &names {
            if self.record_claims_name(rec, name) {
                return Err(TypeError::DuplicateMember {
                    name: name.clone(),
                    location: location.clone(),
                });
            }
        }
        self.push_member_decl(rec, MemberDecl { name: None, ty: anon });
        Ok(())
    }

    fn record_claims_name(&self, rec: TypeRef, name: &str) -> bool {
        let record = match self.kind(rec) {
            TypeKind::Record(r) => r,
            other => unreachable!("member declaration on non-record type {:?}", other),
        };
        record.decls.iter().any(|d| match &d.name {
            Some(n) => n == name,
            None => self
                .record_info(d.ty)
                .is_some_and(|inner| inner.member(name).is_some()),
        })
    }

    fn push_member_decl(&mut self, rec: TypeRef, decl: MemberDecl) {
        match &mut self.entries[rec as usize].kind {
            TypeKind::Record(r) => r.decls.push(decl),
            other => unreachable!("member declaration on non-record type {:?}", other),
        }
    }

    /// Compute the record layout at the closing brace of its
    /// definition, marking it complete
    pub fn complete_record(
        &mut self,
        rec: TypeRef,
        location: &SourceLocation,
    ) -> Result<(), TypeError> {
        let (is_struct, decls) = match self.kind(rec) {
            TypeKind::Record(r) => (r.is_struct, r.decls.clone()),
            other => unreachable!("complete_record on non-record type {:?}", other),
        };

        let mut inputs = Vec::with_capacity(decls.len());
        for decl in &decls {
            let width = self.width(decl.ty).ok_or_else(|| TypeError::IncompleteType {
                type_name: self.type_name(decl.ty),
                location: location.clone(),
            })?;
            let promoted = if decl.name.is_none() {
                self.record_info(decl.ty)
                    .map(|r| r.members().to_vec())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            inputs.push(LayoutInput {
                name: decl.name.clone(),
                ty: decl.ty,
                width,
                align: self.align(decl.ty),
                promoted,
            });
        }

        let layout = compute_layout(is_struct, &inputs, location)?;
        log::debug!(
            "completed {} layout: {} members, width={}, align={}",
            if is_struct { "struct" } else { "union" },
            layout.members.len(),
            layout.width,
            layout.align
        );

        let entry = &mut self.entries[rec as usize];
        match &mut entry.kind {
            TypeKind::Record(r) => {
                r.members = layout.members;
                r.lookup = layout.lookup;
                r.width = layout.width;
                r.align = layout.align;
                r.decls.clear();
            }
            _ => unreachable!(),
        }
        entry.complete = true;
        Ok(())
    }

    pub fn record_info(&self, ty: TypeRef) -> Option<&Record> {
        match self.kind(ty) {
            TypeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Byte offset of a member in a completed record
    pub fn member_offset(&self, ty: TypeRef, name: &str) -> Option<u64> {
        self.record_info(ty)?.member(name).map(|m| m.offset)
    }

    /// Human-readable type name for diagnostics
    pub fn type_name(&self, ty: TypeRef) -> String {
        let entry = self.entry(ty);
        let base = match &entry.kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Arith(kind) => kind.to_string(),
            TypeKind::Pointer { pointee } => format!("{}*", self.type_name(*pointee)),
            TypeKind::Array {
                element,
                len: Some(n),
            } => format!("{}[{}]", self.type_name(*element), n),
            TypeKind::Array { element, len: None } => {
                format!("{}[]", self.type_name(*element))
            }
            TypeKind::Function(sig) => {
                let mut out = format!("{} (", self.type_name(sig.return_type));
                for (i, &p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&self.type_name(p));
                }
                if sig.variadic {
                    out.push_str(", ...");
                }
                out.push(')');
                out
            }
            TypeKind::Record(r) => {
                let keyword = if r.is_struct { "struct" } else { "union" };
                if r.has_tag {
                    keyword.to_string()
                } else {
                    format!("{} <anonymous>", keyword)
                }
            }
            TypeKind::Enum { .. } => "enum".to_string(),
        };
        // Arrays are implicitly const; only surface explicit qualifiers
        if entry.quals.is_empty() || matches!(entry.kind, TypeKind::Array { .. }) {
            base
        } else {
            format!("{} {}", entry.quals, base)
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

enum AdjustedParam {
    Plain(TypeRef),
    PointerTo(TypeRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(1, 4), 4);
        assert_eq!(align_to(4, 4), 4);
        assert_eq!(align_to(5, 8), 8);
        // Idempotent, and never below the input
        for x in 0..40u64 {
            for a in [1, 2, 4, 8, 16] {
                let aligned = align_to(x, a);
                assert_eq!(align_to(aligned, a), aligned);
                assert!(aligned >= x);
            }
        }
    }

    #[test]
    fn test_interning_identity() {
        let mut reg = TypeRegistry::new();
        let a = reg.arith(ArithKind::Int);
        let b = reg.arith(ArithKind::Int);
        assert_eq!(a, b);

        let pa = reg.pointer_to(a);
        let pb = reg.pointer_to(b);
        assert_eq!(pa, pb);

        assert_eq!(reg.void_type(), reg.void_type());

        // Arrays are never interned
        let x = reg.array_of(a, Some(4));
        let y = reg.array_of(a, Some(4));
        assert_ne!(x, y);
        assert!(reg.equal(x, y));
    }

    #[test]
    fn test_widths_and_alignment() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let ptr = reg.pointer_to(int_ty);
        let arr = reg.array_of(int_ty, Some(10));

        assert_eq!(reg.width(int_ty), Some(4));
        assert_eq!(reg.width(ptr), Some(8));
        assert_eq!(reg.align(ptr), 8);
        assert_eq!(reg.width(arr), Some(40));
        assert_eq!(reg.align(arr), 4);
        assert_eq!(reg.width(reg.void_type()), Some(0));
        assert_eq!(reg.step_width(reg.void_type()), Some(1));
    }

    #[test]
    fn test_width_divisible_by_align() {
        let mut reg = TypeRegistry::new();
        let mut complete = Vec::new();
        for kind in [
            ArithKind::Bool,
            ArithKind::Char,
            ArithKind::Short,
            ArithKind::Int,
            ArithKind::Long,
            ArithKind::Float,
            ArithKind::Double,
            ArithKind::DoubleComplex,
        ] {
            complete.push(reg.arith(kind));
        }
        let int_ty = reg.arith(ArithKind::Int);
        complete.push(reg.pointer_to(int_ty));
        complete.push(reg.array_of(int_ty, Some(3)));

        for ty in complete {
            let width = reg.width(ty).unwrap();
            assert_eq!(width % reg.align(ty), 0, "{}", reg.type_name(ty));
        }
    }

    #[test]
    fn test_array_completion() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let arr = reg.array_of(int_ty, None);

        // A declared length of zero is just as incomplete as none
        let zero = reg.array_of(int_ty, Some(0));
        assert!(!reg.is_complete(zero));

        assert!(!reg.is_complete(arr));
        assert_eq!(reg.width(arr), None);
        assert!(reg.storage_size(arr, &loc()).is_err());

        reg.complete_array(arr, 8);
        assert!(reg.is_complete(arr));
        assert_eq!(reg.width(arr), Some(32));
        assert_eq!(reg.storage_size(arr, &loc()).unwrap(), 32);
    }

    #[test]
    fn test_equality_reflexive_and_qualified() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let const_int = reg.arith_qualified(ArithKind::Int, Qualifiers::const_only());

        assert!(reg.equal(int_ty, int_ty));
        assert!(reg.compatible(int_ty, int_ty));
        // Qualifiers participate in equality
        assert!(!reg.equal(int_ty, const_int));
        // But arithmetic compatibility ignores them
        assert!(reg.compatible(int_ty, const_int));
    }

    #[test]
    fn test_array_is_not_pointer() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let arr = reg.array_of(int_ty, Some(4));
        let ptr = reg.pointer_to(int_ty);

        // Both point at int...
        assert_eq!(reg.pointer_target(arr), Some(int_ty));
        assert_eq!(reg.pointer_target(ptr), Some(int_ty));
        // ...but the types stay distinct; only decay crosses over
        assert!(!reg.equal(arr, ptr));
        assert!(!reg.compatible(arr, ptr));
        assert_eq!(reg.decayed(arr), ptr);
    }

    #[test]
    fn test_pointer_compatibility() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let uint_ty = reg.arith(ArithKind::UInt);
        let const_int = reg.arith_qualified(ArithKind::Int, Qualifiers::const_only());

        let p_int = reg.pointer_to(int_ty);
        let p_uint = reg.pointer_to(uint_ty);
        let p_const_int = reg.pointer_to(const_int);

        // Pointees compatible, qualifier sets equal
        assert!(reg.compatible(p_int, p_uint));
        // Pointee qualifier mismatch breaks pointer compatibility
        assert!(!reg.compatible(p_int, p_const_int));
        // Pointer compatibility implies pointee compatibility
        assert!(reg.compatible(
            reg.pointer_target(p_int).unwrap(),
            reg.pointer_target(p_uint).unwrap()
        ));
    }

    #[test]
    fn test_function_compatibility_with_adjustment() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let p_int = reg.pointer_to(int_ty);
        let arr = reg.array_of(int_ty, Some(3));

        // int f(int p[3]) is compatible with int f(int *p)
        let f = reg.function(FuncSig {
            return_type: int_ty,
            params: vec![arr],
            variadic: false,
            is_inline: false,
            is_noreturn: false,
        });
        let g = reg.function(FuncSig {
            return_type: int_ty,
            params: vec![p_int],
            variadic: false,
            is_inline: false,
            is_noreturn: false,
        });
        assert!(reg.compatible(f, g));
        assert!(!reg.equal(f, g));

        let h = reg.function(FuncSig {
            return_type: int_ty,
            params: vec![p_int],
            variadic: true,
            is_inline: false,
            is_noreturn: false,
        });
        assert!(!reg.compatible(g, h));
    }

    #[test]
    fn test_record_layout() {
        let mut reg = TypeRegistry::new();
        let char_ty = reg.arith(ArithKind::Char);
        let int_ty = reg.arith(ArithKind::Int);

        // struct S { char c; int i; }
        let s = reg.record(true, true);
        assert!(!reg.is_complete(s));
        reg.add_member(s, "c", char_ty, &loc()).unwrap();
        reg.add_member(s, "i", int_ty, &loc()).unwrap();
        reg.complete_record(s, &loc()).unwrap();

        assert!(reg.is_complete(s));
        assert_eq!(reg.width(s), Some(8));
        assert_eq!(reg.align(s), 4);
        assert_eq!(reg.member_offset(s, "c"), Some(0));
        assert_eq!(reg.member_offset(s, "i"), Some(4));

        // Records are equal and compatible only to themselves
        let t = reg.record(true, true);
        reg.add_member(t, "c", char_ty, &loc()).unwrap();
        reg.add_member(t, "i", int_ty, &loc()).unwrap();
        reg.complete_record(t, &loc()).unwrap();
        assert!(!reg.equal(s, t));
        assert!(!reg.compatible(s, t));
    }

    #[test]
    fn test_recursive_record_through_pointer() {
        let mut reg = TypeRegistry::new();
        // struct node { int value; struct node *next; }
        let node = reg.record(true, true);
        let int_ty = reg.arith(ArithKind::Int);
        let p_node = reg.pointer_to(node);

        reg.add_member(node, "value", int_ty, &loc()).unwrap();
        reg.add_member(node, "next", p_node, &loc()).unwrap();
        reg.complete_record(node, &loc()).unwrap();

        assert_eq!(reg.width(node), Some(16));
        assert_eq!(reg.member_offset(node, "next"), Some(8));
    }

    #[test]
    fn test_incomplete_member_rejected() {
        let mut reg = TypeRegistry::new();
        let s = reg.record(true, true);
        let fwd = reg.record(true, true);
        let err = reg.add_member(s, "inner", fwd, &loc()).unwrap_err();
        assert!(matches!(err, TypeError::IncompleteType { .. }));
    }

    #[test]
    fn test_anonymous_union_in_struct() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let short_ty = reg.arith(ArithKind::Short);
        let char_ty = reg.arith(ArithKind::Char);

        // struct { int i; union { short s; char c; }; }
        let u = reg.record(false, false);
        reg.add_member(u, "s", short_ty, &loc()).unwrap();
        reg.add_member(u, "c", char_ty, &loc()).unwrap();
        reg.complete_record(u, &loc()).unwrap();

        let s = reg.record(true, true);
        reg.add_member(s, "i", int_ty, &loc()).unwrap();
        reg.add_anonymous_member(s, u, &loc()).unwrap();
        reg.complete_record(s, &loc()).unwrap();

        // Promoted members sit at the anonymous member's offset
        assert_eq!(reg.member_offset(s, "s"), Some(4));
        assert_eq!(reg.member_offset(s, "c"), Some(4));

        // A colliding name is rejected at declaration time
        let s2 = reg.record(true, true);
        reg.add_member(s2, "s", int_ty, &loc()).unwrap();
        let err = reg.add_anonymous_member(s2, u, &loc()).unwrap_err();
        assert!(matches!(err, TypeError::DuplicateMember { ref name, .. } if name == "s"));
    }

    #[test]
    fn test_enumeration_members() {
        let mut reg = TypeRegistry::new();
        let color = reg.enumeration();

        reg.add_enumerator(color, "RED", 0, &loc()).unwrap();
        reg.add_enumerator(color, "BLUE", 7, &loc()).unwrap();

        // An enum behaves as its underlying int
        assert_eq!(reg.width(color), Some(4));
        assert_eq!(reg.arith_kind(color), Some(ArithKind::Int));

        assert_eq!(reg.enum_members(color).map(|m| m.len()), Some(2));
        assert_eq!(reg.enumerator_value(color, "BLUE"), Some(7));
        assert_eq!(reg.enumerator_value(color, "GREEN"), None);

        // Reusing an enumerator name within one enum is rejected
        let err = reg.add_enumerator(color, "RED", 2, &loc()).unwrap_err();
        assert!(matches!(err, TypeError::DuplicateMember { ref name, .. } if name == "RED"));

        // Distinct enums keep distinct member lists
        let other = reg.enumeration();
        assert_ne!(color, other);
        reg.add_enumerator(other, "RED", 5, &loc()).unwrap();
        assert_eq!(reg.enumerator_value(color, "RED"), Some(0));
        assert_eq!(reg.enumerator_value(other, "RED"), Some(5));
    }

    #[test]
    fn test_void_compatibility() {
        let mut reg = TypeRegistry::new();
        let void_ty = reg.void_type();
        let int_ty = reg.arith(ArithKind::Int);
        assert!(reg.compatible(void_ty, void_ty));
        assert!(!reg.compatible(void_ty, int_ty));
    }

    #[test]
    fn test_type_names() {
        let mut reg = TypeRegistry::new();
        let int_ty = reg.arith(ArithKind::Int);
        let const_int = reg.arith_qualified(ArithKind::Int, Qualifiers::const_only());
        let p = reg.pointer_to(const_int);
        let arr = reg.array_of(int_ty, Some(10));

        assert_eq!(reg.type_name(int_ty), "int");
        assert_eq!(reg.type_name(p), "const int*");
        assert_eq!(reg.type_name(arr), "int[10]");
    }
}
