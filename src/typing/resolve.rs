// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::pattern_type_mismatch)]

use std::collections::BTreeSet;

use heck::ToKebabCase;
use lazy_static::lazy_static;
use log::{debug, warn};

use crate::analysed::{self, AnalysedType, ResultShape, VariantCase};
use crate::host::HostValue;
use crate::mapping::matches_type;
use crate::options::MappingOptions;
use crate::typing::{
    HostType, LiteralValue, MultimodalAlternative, Property, SchemaError, TypeInfoInternal,
    TypeScope,
};
use crate::unstructured::{
    is_valid_language_code, is_valid_mime_type, BinaryDescriptor, TextDescriptor,
};

lazy_static! {
    /// Words that cannot name a case, tag or enum literal on the wire.
    static ref RESERVED_KEYWORDS: BTreeSet<&'static str> = [
        "bool", "char", "enum", "export", "f32", "f64", "flags", "func", "import", "interface",
        "list", "option", "package", "record", "resource", "result", "s16", "s32", "s64", "s8",
        "static", "string", "tuple", "type", "u16", "u32", "u64", "u8", "use", "variant", "world",
    ]
    .into_iter()
    .collect();
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name)
}

fn check_keyword(name: &str) -> Result<(), SchemaError> {
    if is_reserved_keyword(name) {
        Err(SchemaError::ReservedKeyword {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Per-parameter restrictions on unstructured values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restrictions {
    pub languages: Vec<String>,
    pub mime_types: Vec<String>,
}

impl Restrictions {
    fn validate(&self, parameter: &str) -> Result<(), SchemaError> {
        if let Some(code) = self.languages.iter().find(|c| !is_valid_language_code(c)) {
            return Err(SchemaError::InvalidRestriction {
                parameter: parameter.to_string(),
                kind: "language code".to_string(),
                value: code.clone(),
            });
        }
        if let Some(mime) = self.mime_types.iter().find(|m| !is_valid_mime_type(m)) {
            return Err(SchemaError::InvalidRestriction {
                parameter: parameter.to_string(),
                kind: "MIME type".to_string(),
                value: mime.clone(),
            });
        }
        Ok(())
    }
}

/// Resolves a single host type with default options.
pub fn resolve_type(ty: &HostType, scope: &TypeScope) -> Result<AnalysedType, SchemaError> {
    let options = MappingOptions::default();
    SchemaBuilder::new(scope, &options).resolve_type(ty)
}

/// Derives component-model types from host type descriptions.
///
/// References are looked up in the scope of the agent class being
/// registered; a reference reached again while it is being resolved is
/// reported as [`SchemaError::RecursiveType`].
#[derive(Debug)]
pub struct SchemaBuilder<'a> {
    scope: &'a TypeScope,
    options: &'a MappingOptions,
    resolving: Vec<String>,
}

/// A union member that is an object discriminated by a string literal `tag`.
struct TaggedMember<'t> {
    tag: String,
    payload: Vec<&'t Property>,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(scope: &'a TypeScope, options: &'a MappingOptions) -> Self {
        Self {
            scope,
            options,
            resolving: vec![],
        }
    }

    fn peel<'t>(&self, ty: &'t HostType) -> &'t HostType
    where
        'a: 't,
    {
        peel(self.scope, ty)
    }

    pub fn resolve_type(&mut self, ty: &HostType) -> Result<AnalysedType, SchemaError> {
        Ok(match ty {
            HostType::Boolean => analysed::bool(),
            HostType::Number => analysed::f64(),
            HostType::BigInt => analysed::u64(),
            HostType::String => analysed::str(),
            HostType::Char => analysed::chr(),
            HostType::Numeric { width } => width.analysed(),
            HostType::Literal { value } => match value {
                LiteralValue::Bool(_) => analysed::bool(),
                LiteralValue::Number(_) => analysed::f64(),
                LiteralValue::String(s) => {
                    check_keyword(s)?;
                    analysed::r#enum(&[s.as_str()])
                }
            },
            HostType::Array { element } => {
                self.reject_special(element, "an array element")?;
                analysed::list(self.resolve_type(element)?)
            }
            HostType::TypedArray { element } => analysed::typed_array(*element),
            HostType::Tuple { items } => {
                let items = items
                    .iter()
                    .map(|item| self.resolve_type(item))
                    .collect::<Result<Vec<_>, _>>()?;
                analysed::tuple(items)
            }
            HostType::Map { key, value } => {
                analysed::map(self.resolve_type(key)?, self.resolve_type(value)?)
            }
            HostType::Object { name, properties } => {
                let record = self.resolve_object(properties)?;
                match name {
                    Some(name) => record.named(&name.to_kebab_case()),
                    None => record,
                }
            }
            HostType::Union { name, members } => {
                let resolved = self.resolve_union(members)?;
                match name {
                    Some(name) => resolved.named(&name.to_kebab_case()),
                    None => resolved,
                }
            }
            HostType::Alias { name, target } => {
                self.resolve_type(target)?.named(&name.to_kebab_case())
            }
            HostType::Reference { name } => {
                if self.resolving.iter().any(|n| n == name) {
                    return Err(SchemaError::RecursiveType { name: name.clone() });
                }
                let scope = self.scope;
                let Some(target) = scope.get(name) else {
                    return Err(SchemaError::UnknownReference { name: name.clone() });
                };
                self.resolving.push(name.clone());
                let resolved = self.resolve_type(target);
                self.resolving.pop();
                resolved?.named(&name.to_kebab_case())
            }
            HostType::Result { ok, err } => analysed::result_with_shape(
                self.resolve_payload(ok)?,
                self.resolve_payload(err)?,
                ResultShape::default(),
            ),
            HostType::Multimodal { .. }
            | HostType::UnstructuredText
            | HostType::UnstructuredBinary
            | HostType::Principal => {
                return Err(SchemaError::SpecialTypePosition {
                    typ: ty.describe(),
                    position: "a nested position".to_string(),
                })
            }
            HostType::Promise { .. } => {
                return Err(SchemaError::Unsupported {
                    typ: ty.describe(),
                    reason: "promises are only supported as return types".to_string(),
                })
            }
            HostType::Null | HostType::Undefined | HostType::Void => {
                return Err(SchemaError::Unsupported {
                    typ: ty.describe(),
                    reason: "only supported as a member of a union".to_string(),
                })
            }
            HostType::Any | HostType::Unknown | HostType::Function | HostType::Other { .. } => {
                return Err(SchemaError::Unsupported {
                    typ: ty.describe(),
                    reason: "it has no component-model equivalent".to_string(),
                })
            }
        })
    }

    fn reject_special(&self, ty: &HostType, position: &str) -> Result<(), SchemaError> {
        match self.peel(ty) {
            special @ (HostType::Multimodal { .. }
            | HostType::UnstructuredText
            | HostType::UnstructuredBinary
            | HostType::Principal) => Err(SchemaError::SpecialTypePosition {
                typ: special.describe(),
                position: position.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn resolve_payload(&mut self, ty: &HostType) -> Result<Option<AnalysedType>, SchemaError> {
        if self.peel(ty).is_nullish() {
            Ok(None)
        } else {
            self.resolve_type(ty).map(Some)
        }
    }

    fn resolve_property(&mut self, property: &Property) -> Result<AnalysedType, SchemaError> {
        self.reject_special(&property.typ, "an object property")?;
        let typ = self.resolve_type(&property.typ)?;
        if property.optional && !typ.is_option() {
            Ok(analysed::option(typ))
        } else {
            Ok(typ)
        }
    }

    fn resolve_object(&mut self, properties: &[Property]) -> Result<AnalysedType, SchemaError> {
        let mut fields = Vec::with_capacity(properties.len());
        for property in properties {
            fields.push(analysed::field(
                &property.name,
                self.resolve_property(property)?,
            ));
        }
        Ok(analysed::record(fields))
    }

    fn is_resolving(&self, name: &str) -> bool {
        self.resolving.iter().any(|n| n == name)
    }

    /// Flattens nested unions and splits off the nullish members.
    ///
    /// `path` holds the references entered on the way down; entering one of
    /// them again, or one that is being resolved, is a recursive type.
    fn flatten_union<'t>(
        &self,
        members: &'t [HostType],
        path: &mut Vec<&'t str>,
        out: &mut Vec<&'t HostType>,
        nullable: &mut bool,
    ) -> Result<(), SchemaError>
    where
        'a: 't,
    {
        for member in members {
            let (peeled, names) = peel_references(self.scope, member);
            match peeled {
                HostType::Union { members, .. } => {
                    if let Some(name) = names
                        .iter()
                        .find(|n| path.contains(*n) || self.is_resolving(n))
                    {
                        return Err(SchemaError::RecursiveType {
                            name: name.to_string(),
                        });
                    }
                    let depth = path.len();
                    path.extend(names);
                    self.flatten_union(members, path, out, nullable)?;
                    path.truncate(depth);
                }
                m if m.is_nullish() => *nullable = true,
                _ => out.push(member),
            }
        }
        Ok(())
    }

    /// The non-nullish members of a union, and whether a nullish one was seen.
    fn union_members<'t>(
        &self,
        members: &'t [HostType],
    ) -> Result<(Vec<&'t HostType>, bool), SchemaError>
    where
        'a: 't,
    {
        let mut nullable = false;
        let mut flat = vec![];
        self.flatten_union(members, &mut vec![], &mut flat, &mut nullable)?;
        Ok((flat, nullable))
    }

    fn resolve_union(&mut self, members: &[HostType]) -> Result<AnalysedType, SchemaError> {
        let (flat, nullable) = self.union_members(members)?;

        // `true | false` is how hosts spell `boolean` inside unions.
        let is_bool_literal = |m: &HostType, b: bool| {
            matches!(m, HostType::Literal { value: LiteralValue::Bool(v) } if *v == b)
        };
        let mut rest: Vec<HostType> = flat.into_iter().cloned().collect();
        if rest.iter().any(|m| is_bool_literal(m, true))
            && rest.iter().any(|m| is_bool_literal(m, false))
        {
            rest.retain(|m| !is_bool_literal(m, true) && !is_bool_literal(m, false));
            rest.push(HostType::Boolean);
        }

        let inner = match rest.as_slice() {
            [] => return Err(SchemaError::EmptyUnion),
            [single] => self.resolve_type(single)?,
            _ => self.resolve_members(&rest)?,
        };

        if nullable && !inner.is_option() {
            Ok(analysed::option(inner))
        } else {
            Ok(inner)
        }
    }

    /// Object with a string literal `tag` property, split into tag and payload.
    fn tagged_member<'t>(&self, member: &'t HostType) -> Option<TaggedMember<'t>>
    where
        'a: 't,
    {
        let HostType::Object { properties, .. } = self.peel(member) else {
            return None;
        };
        let tag = properties
            .iter()
            .find(|p| p.name == "tag")
            .and_then(|p| self.peel(&p.typ).as_string_literal())?;
        Some(TaggedMember {
            tag: tag.to_string(),
            payload: properties.iter().filter(|p| p.name != "tag").collect(),
        })
    }

    fn resolve_members(&mut self, members: &[HostType]) -> Result<AnalysedType, SchemaError> {
        let tagged: Option<Vec<TaggedMember>> =
            members.iter().map(|m| self.tagged_member(m)).collect();
        if let Some(tagged) = tagged {
            let tags: BTreeSet<&str> = tagged.iter().map(|t| t.tag.as_str()).collect();
            if tagged.len() == 2 && tags.contains("ok") && tags.contains("err") {
                return self.resolve_result(&tagged);
            }
            return self.resolve_tagged(&tagged);
        }

        let literals: Option<Vec<&str>> = members
            .iter()
            .map(|m| self.peel(m).as_string_literal())
            .collect();
        if let Some(literals) = literals {
            let mut cases: Vec<&str> = vec![];
            for literal in literals {
                check_keyword(literal)?;
                if !cases.contains(&literal) {
                    cases.push(literal);
                }
            }
            return Ok(analysed::r#enum(&cases));
        }

        self.resolve_untagged(members)
    }

    fn resolve_result(&mut self, tagged: &[TaggedMember]) -> Result<AnalysedType, SchemaError> {
        let mut ok = None;
        let mut err = None;
        let mut shape = ResultShape::default();
        for member in tagged {
            let payload = match member.payload.as_slice() {
                [] => None,
                [property] => Some((property.name.clone(), self.resolve_property(property)?)),
                properties => {
                    return Err(SchemaError::AmbiguousResult {
                        tag: member.tag.clone(),
                        properties: properties.iter().map(|p| p.name.clone()).collect(),
                    })
                }
            };
            let (field, typ) = match payload {
                Some((field, typ)) => (Some(field), Some(typ)),
                None => (None, None),
            };
            if member.tag == "ok" {
                ok = typ;
                if let Some(field) = field {
                    shape.ok_field = field;
                }
            } else {
                err = typ;
                if let Some(field) = field {
                    shape.err_field = field;
                }
            }
        }
        Ok(analysed::result_with_shape(ok, err, shape))
    }

    fn resolve_tagged(&mut self, tagged: &[TaggedMember]) -> Result<AnalysedType, SchemaError> {
        let mut seen = BTreeSet::new();
        let mut cases = Vec::with_capacity(tagged.len());
        for member in tagged {
            check_keyword(&member.tag)?;
            if !seen.insert(member.tag.clone()) {
                return Err(SchemaError::DuplicateTag {
                    tag: member.tag.clone(),
                });
            }
            cases.push(match member.payload.as_slice() {
                [] => analysed::unit_case(&member.tag),
                [property] => analysed::tagged_case(
                    &member.tag,
                    &property.name,
                    self.resolve_property(property)?,
                ),
                properties => {
                    return Err(SchemaError::InvalidTaggedCase {
                        tag: member.tag.clone(),
                        properties: properties.iter().map(|p| p.name.clone()).collect(),
                    })
                }
            });
        }
        Ok(analysed::tagged_variant("tag", cases))
    }

    fn resolve_untagged(&mut self, members: &[HostType]) -> Result<AnalysedType, SchemaError> {
        let mut cases: Vec<VariantCase> = Vec::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            if let Some(literal) = self.peel(member).as_string_literal() {
                check_keyword(literal)?;
                cases.push(analysed::unit_case(literal));
            } else {
                self.reject_special(member, "a union member")?;
                let typ = self.resolve_type(member)?;
                cases.push(analysed::case(&format!("case-{idx}"), typ));
            }
        }
        self.check_overlaps(&cases)?;
        Ok(analysed::variant(cases))
    }

    /// Earlier cases win at runtime, so an overlap only shadows the later case.
    fn check_overlaps(&self, cases: &[VariantCase]) -> Result<(), SchemaError> {
        for (i, first) in cases.iter().enumerate() {
            for second in cases.iter().skip(i + 1) {
                if !cases_overlap(first, second) {
                    continue;
                }
                if self.options.reject_ambiguous_unions {
                    return Err(SchemaError::AmbiguousUnion {
                        first: first.name.clone(),
                        second: second.name.clone(),
                    });
                }
                warn!(
                    "union cases '{}' and '{}' accept overlapping values; '{}' takes precedence",
                    first.name, second.name, first.name
                );
            }
        }
        Ok(())
    }

    /// Resolves a parameter, recognizing the special parameter kinds.
    pub fn resolve_parameter(
        &mut self,
        parameter: &str,
        ty: &HostType,
        restrictions: &Restrictions,
    ) -> Result<TypeInfoInternal, SchemaError> {
        restrictions.validate(parameter)?;
        let info = match self.peel(ty) {
            HostType::Principal => TypeInfoInternal::Principal,
            HostType::Multimodal { element } => {
                self.resolve_multimodal(parameter, element, restrictions)?
            }
            HostType::Array { element } if self.is_implicit_multimodal(element)? => {
                self.resolve_multimodal(parameter, element, restrictions)?
            }
            _ => self.resolve_alternative(ty, restrictions)?,
        };
        debug!("parameter '{parameter}' resolved to {info:?}");
        Ok(info)
    }

    /// Resolves a return type. `None` stands for no return value.
    pub fn resolve_return(&mut self, ty: &HostType) -> Result<Option<TypeInfoInternal>, SchemaError> {
        match self.peel(ty) {
            HostType::Promise { inner } => self.resolve_return(inner),
            t if t.is_nullish() => Ok(None),
            HostType::Principal => Err(SchemaError::SpecialTypePosition {
                typ: "Principal".to_string(),
                position: "a return type".to_string(),
            }),
            _ => self
                .resolve_parameter("return-value", ty, &Restrictions::default())
                .map(Some),
        }
    }

    fn is_implicit_multimodal(&self, element: &HostType) -> Result<bool, SchemaError> {
        let is_unstructured = |t: &HostType| {
            matches!(
                self.peel(t),
                HostType::UnstructuredText | HostType::UnstructuredBinary
            )
        };
        Ok(match self.peel(element) {
            HostType::Union { members, .. } => {
                let (members, _) = self.union_members(members)?;
                members.into_iter().any(|m| {
                    is_unstructured(m)
                        || self
                            .tagged_member(m)
                            .is_some_and(|t| t.payload.iter().any(|p| is_unstructured(&p.typ)))
                })
            }
            other => is_unstructured(other),
        })
    }

    /// Non-multimodal resolution of a value that may be unstructured.
    fn resolve_alternative(
        &mut self,
        ty: &HostType,
        restrictions: &Restrictions,
    ) -> Result<TypeInfoInternal, SchemaError> {
        Ok(match self.peel(ty) {
            HostType::UnstructuredText => TypeInfoInternal::UnstructuredText {
                descriptor: TextDescriptor::new(&restrictions.languages),
            },
            HostType::UnstructuredBinary => TypeInfoInternal::UnstructuredBinary {
                descriptor: BinaryDescriptor::new(&restrictions.mime_types),
            },
            _ => TypeInfoInternal::analysed(self.resolve_type(ty)?, ty.clone()),
        })
    }

    fn resolve_multimodal(
        &mut self,
        parameter: &str,
        element: &HostType,
        restrictions: &Restrictions,
    ) -> Result<TypeInfoInternal, SchemaError> {
        let members: Vec<HostType> = match self.peel(element) {
            HostType::Union { members, .. } => {
                let (members, nullable) = self.union_members(members)?;
                if nullable {
                    return Err(SchemaError::InvalidAlternative {
                        parameter: parameter.to_string(),
                        reason: "null and undefined cannot be alternatives".to_string(),
                    });
                }
                members.into_iter().cloned().collect()
            }
            other => vec![other.clone()],
        };

        let mut alternatives: Vec<MultimodalAlternative> = Vec::with_capacity(members.len());
        for member in &members {
            match self.peel(member) {
                HostType::Multimodal { .. } => {
                    return Err(SchemaError::NestedMultimodal {
                        parameter: parameter.to_string(),
                    })
                }
                HostType::Array { element } if self.is_implicit_multimodal(element)? => {
                    return Err(SchemaError::NestedMultimodal {
                        parameter: parameter.to_string(),
                    })
                }
                HostType::Principal => {
                    return Err(SchemaError::SpecialTypePosition {
                        typ: "Principal".to_string(),
                        position: "a multimodal alternative".to_string(),
                    })
                }
                _ => (),
            }

            let alternative = match self.tagged_member(member) {
                Some(tagged) => {
                    let [property] = tagged.payload.as_slice() else {
                        return Err(SchemaError::InvalidAlternative {
                            parameter: parameter.to_string(),
                            reason: format!(
                                "alternative '{}' must carry exactly one payload property",
                                tagged.tag
                            ),
                        });
                    };
                    let name = tagged.tag.clone();
                    let field = property.name.clone();
                    let payload_type = property.typ.clone();
                    MultimodalAlternative {
                        name,
                        info: self.resolve_alternative(&payload_type, restrictions)?,
                        payload_field: Some(field),
                    }
                }
                None => MultimodalAlternative {
                    name: self.alternative_name(member)?,
                    info: self.resolve_alternative(member, restrictions)?,
                    payload_field: None,
                },
            };

            if alternatives.iter().any(|a| a.name == alternative.name) {
                return Err(SchemaError::InvalidAlternative {
                    parameter: parameter.to_string(),
                    reason: format!("alternative name '{}' is used twice", alternative.name),
                });
            }
            check_keyword(&alternative.name)?;
            alternatives.push(alternative);
        }

        Ok(TypeInfoInternal::Multimodal { alternatives })
    }

    fn alternative_name(&mut self, member: &HostType) -> Result<String, SchemaError> {
        Ok(match member {
            HostType::Alias { name, .. } | HostType::Reference { name } => name.to_kebab_case(),
            HostType::Object {
                name: Some(name), ..
            }
            | HostType::Union {
                name: Some(name), ..
            } => name.to_kebab_case(),
            HostType::UnstructuredText => "text".to_string(),
            HostType::UnstructuredBinary => "binary".to_string(),
            other => {
                let typ = self.resolve_type(other)?;
                format!("{}-value", typ.kind_name())
            }
        })
    }
}

/// Follows aliases and references to the type they stand for.
fn peel<'t>(scope: &'t TypeScope, mut ty: &'t HostType) -> &'t HostType {
    // Bounded so that a self-referencing alias chain cannot loop.
    for _ in 0..64 {
        match ty {
            HostType::Alias { target, .. } => ty = target,
            HostType::Reference { name } => match scope.get(name) {
                Some(target) => ty = target,
                None => return ty,
            },
            _ => return ty,
        }
    }
    ty
}

/// Like [`peel`], also returning the names of the references followed.
/// Stops at the first reference that repeats.
fn peel_references<'t>(
    scope: &'t TypeScope,
    mut ty: &'t HostType,
) -> (&'t HostType, Vec<&'t str>) {
    let mut names: Vec<&'t str> = vec![];
    loop {
        match ty {
            HostType::Alias { target, .. } => ty = target,
            HostType::Reference { name } => {
                if names.contains(&name.as_str()) {
                    return (ty, names);
                }
                match scope.get(name) {
                    Some(target) => {
                        names.push(name.as_str());
                        ty = target;
                    }
                    None => return (ty, names),
                }
            }
            _ => return (ty, names),
        }
    }
}

/// Whether some host value is accepted by both cases.
fn cases_overlap(first: &VariantCase, second: &VariantCase) -> bool {
    match (&first.typ, &second.typ) {
        (None, None) => first.name == second.name,
        (None, Some(t)) => matches_type(&HostValue::from(first.name.as_str()), t),
        (Some(t), None) => matches_type(&HostValue::from(second.name.as_str()), t),
        (Some(a), Some(b)) => types_overlap(a, b),
    }
}

fn is_numeric(t: &AnalysedType) -> bool {
    t.is_integer() || matches!(t, AnalysedType::F32 | AnalysedType::F64)
}

fn types_overlap(a: &AnalysedType, b: &AnalysedType) -> bool {
    use AnalysedType as T;
    match (a, b) {
        (T::Option(_), T::Option(_)) => true,
        (T::Option(o), other) | (other, T::Option(o)) => types_overlap(&o.inner, other),
        (x, y) if is_numeric(x) && is_numeric(y) => true,
        (T::Bool, T::Bool) => true,
        (T::Str, T::Str) | (T::Str, T::Chr) | (T::Chr, T::Str) | (T::Chr, T::Chr) => true,
        (T::Enum(e), T::Str) | (T::Str, T::Enum(e)) => !e.cases.is_empty(),
        (T::Enum(e), T::Chr) | (T::Chr, T::Enum(e)) => {
            e.cases.iter().any(|c| c.chars().count() == 1)
        }
        (T::Enum(x), T::Enum(y)) => x.cases.iter().any(|c| y.cases.contains(c)),
        (T::List(_), T::List(_)) => true,
        (T::Tuple(x), T::Tuple(y)) => {
            x.items.len() == y.items.len()
                && x.items
                    .iter()
                    .zip(y.items.iter())
                    .all(|(p, q)| types_overlap(p, q))
        }
        // Extra properties are allowed, so two records share every value
        // that satisfies both; only conflicting common fields separate them.
        (T::Record(x), T::Record(y)) => x.fields.iter().all(|f| {
            y.fields
                .iter()
                .find(|g| g.name == f.name)
                .map_or(true, |g| types_overlap(&f.typ, &g.typ))
        }),
        (T::Result(_), T::Result(_)) => true,
        (T::Flags(_), T::Flags(_)) => true,
        _ => false,
    }
}
