// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Outer envelope for parameter lists and return values.
//!
//! Ordinary parameter lists travel as a positional [`DataValue::Tuple`]. A
//! method whose only caller-supplied parameter is multimodal travels as a
//! [`DataValue::Multimodal`] list of named elements instead.

#![allow(clippy::pattern_type_mismatch)]

use log::trace;
use serde::{Deserialize, Serialize};

use crate::analysed::AnalysedType;
use crate::host::HostValue;
use crate::mapping::{
    describe_value, matches_type, MappingError, ValueDeserializer, ValueSerializer,
};
use crate::options::MappingOptions;
use crate::principal::Principal;
use crate::typing::{MultimodalAlternative, SchemaError, TypeInfoInternal};
use crate::unstructured::{BinaryDescriptor, BinaryReference, TextDescriptor, TextReference};
use crate::value::Value;
use crate::wit::WitValue;

/// Name of the single element of a return value envelope.
pub const RETURN_VALUE: &str = "return-value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ElementSchema {
    ComponentModel { element_type: AnalysedType },
    UnstructuredText { descriptor: TextDescriptor },
    UnstructuredBinary { descriptor: BinaryDescriptor },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedElementSchema {
    pub name: String,
    pub schema: ElementSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "elements", rename_all = "kebab-case")]
pub enum DataSchema {
    Tuple(Vec<NamedElementSchema>),
    Multimodal(Vec<NamedElementSchema>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementValue {
    ComponentModel(WitValue),
    UnstructuredText(TextReference),
    UnstructuredBinary(BinaryReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedElementValue {
    pub name: String,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataValue {
    Tuple(Vec<ElementValue>),
    Multimodal(Vec<NamedElementValue>),
}

/// A resolved parameter of a constructor or method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    pub name: String,
    pub info: TypeInfoInternal,
}

impl ElementValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ElementValue::ComponentModel(_) => "component-model",
            ElementValue::UnstructuredText(_) => "unstructured-text",
            ElementValue::UnstructuredBinary(_) => "unstructured-binary",
        }
    }
}

impl DataValue {
    pub fn empty() -> DataValue {
        DataValue::Tuple(vec![])
    }

    pub fn len(&self) -> usize {
        match self {
            DataValue::Tuple(elements) => elements.len(),
            DataValue::Multimodal(elements) => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataSchema {
    pub fn elements(&self) -> &[NamedElementSchema] {
        match self {
            DataSchema::Tuple(elements) | DataSchema::Multimodal(elements) => elements,
        }
    }
}

/// Element schema of a parameter. Principals and multimodal lists have none.
pub fn element_schema(info: &TypeInfoInternal) -> Option<ElementSchema> {
    match info {
        TypeInfoInternal::Analysed { typ, .. } => Some(ElementSchema::ComponentModel {
            element_type: typ.clone(),
        }),
        TypeInfoInternal::UnstructuredText { descriptor } => {
            Some(ElementSchema::UnstructuredText {
                descriptor: descriptor.clone(),
            })
        }
        TypeInfoInternal::UnstructuredBinary { descriptor } => {
            Some(ElementSchema::UnstructuredBinary {
                descriptor: descriptor.clone(),
            })
        }
        TypeInfoInternal::Multimodal { .. } | TypeInfoInternal::Principal => None,
    }
}

fn multimodal_schema(
    parameter: &str,
    alternatives: &[MultimodalAlternative],
) -> Result<DataSchema, SchemaError> {
    let mut elements = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        let Some(schema) = element_schema(&alternative.info) else {
            return Err(SchemaError::NestedMultimodal {
                parameter: parameter.to_string(),
            });
        };
        elements.push(NamedElementSchema {
            name: alternative.name.clone(),
            schema,
        });
    }
    Ok(DataSchema::Multimodal(elements))
}

/// Caller-supplied parameters, in declaration order.
fn caller_parameters(params: &[ParameterSchema]) -> impl Iterator<Item = &ParameterSchema> {
    params.iter().filter(|p| !p.info.is_principal())
}

/// The single multimodal parameter of a list, if that is its only one.
fn sole_multimodal(params: &[ParameterSchema]) -> Option<(&str, &[MultimodalAlternative])> {
    let mut callers = caller_parameters(params);
    match (callers.next(), callers.next()) {
        (
            Some(ParameterSchema {
                name,
                info: TypeInfoInternal::Multimodal { alternatives },
            }),
            None,
        ) => Some((name.as_str(), alternatives.as_slice())),
        _ => None,
    }
}

/// Input schema of a parameter list. Principal parameters are left out.
pub fn input_schema(params: &[ParameterSchema]) -> Result<DataSchema, SchemaError> {
    if let Some((name, alternatives)) = sole_multimodal(params) {
        return multimodal_schema(name, alternatives);
    }

    let mut elements = vec![];
    for param in caller_parameters(params) {
        let Some(schema) = element_schema(&param.info) else {
            return Err(SchemaError::MultimodalNotAlone {
                parameter: param.name.clone(),
            });
        };
        elements.push(NamedElementSchema {
            name: param.name.clone(),
            schema,
        });
    }
    Ok(DataSchema::Tuple(elements))
}

/// Output schema of a return type; `None` means the method returns nothing.
pub fn output_schema(ret: Option<&TypeInfoInternal>) -> Result<DataSchema, SchemaError> {
    match ret {
        None => Ok(DataSchema::Tuple(vec![])),
        Some(TypeInfoInternal::Multimodal { alternatives }) => {
            multimodal_schema(RETURN_VALUE, alternatives)
        }
        Some(info) => match element_schema(info) {
            Some(schema) => Ok(DataSchema::Tuple(vec![NamedElementSchema {
                name: RETURN_VALUE.to_string(),
                schema,
            }])),
            None => Err(SchemaError::SpecialTypePosition {
                typ: "Principal".to_string(),
                position: "a return type".to_string(),
            }),
        },
    }
}

/// Converts whole parameter lists and return values to and from [`DataValue`].
#[derive(Debug, Clone, Copy)]
pub struct DataAdapter<'a> {
    options: &'a MappingOptions,
}

impl<'a> DataAdapter<'a> {
    pub fn new(options: &'a MappingOptions) -> Self {
        Self { options }
    }

    /// Serializes caller-supplied arguments. `args` excludes principal parameters.
    pub fn serialize_parameters(
        &self,
        args: &[HostValue],
        params: &[ParameterSchema],
    ) -> Result<DataValue, MappingError> {
        let expected = caller_parameters(params).count();
        if args.len() != expected {
            return Err(MappingError::ParameterCount {
                expected,
                actual: args.len(),
            });
        }

        if let (Some((name, alternatives)), [arg]) = (sole_multimodal(params), args) {
            return self
                .serialize_multimodal(arg, alternatives)
                .map_err(|e| e.in_parameter(name));
        }

        let mut elements = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(caller_parameters(params)) {
            elements.push(
                self.serialize_element(arg, &param.info)
                    .map_err(|e| e.in_parameter(&param.name))?,
            );
        }
        Ok(DataValue::Tuple(elements))
    }

    /// Deserializes an input envelope into native arguments, one per declared
    /// parameter. Principal parameters receive `principal`.
    pub fn deserialize_parameters(
        &self,
        input: &DataValue,
        params: &[ParameterSchema],
        principal: &Principal,
    ) -> Result<Vec<HostValue>, MappingError> {
        if let Some((name, alternatives)) = sole_multimodal(params) {
            let DataValue::Multimodal(elements) = input else {
                return Err(MappingError::InvalidElement {
                    element: name.to_string(),
                    reason: "expected a multimodal value, got a tuple".to_string(),
                });
            };
            let value = self
                .deserialize_multimodal(elements, alternatives)
                .map_err(|e| e.in_parameter(name))?;
            return Ok(params
                .iter()
                .map(|p| {
                    if p.info.is_principal() {
                        principal.to_host()
                    } else {
                        value.clone()
                    }
                })
                .collect());
        }

        let DataValue::Tuple(elements) = input else {
            return Err(MappingError::InvalidElement {
                element: "input".to_string(),
                reason: "expected a tuple value, got a multimodal value".to_string(),
            });
        };
        let expected = caller_parameters(params).count();
        if elements.len() != expected {
            return Err(MappingError::ParameterCount {
                expected,
                actual: elements.len(),
            });
        }

        let mut elements = elements.iter();
        let mut args = Vec::with_capacity(params.len());
        for param in params {
            if param.info.is_principal() {
                args.push(principal.to_host());
                continue;
            }
            let Some(element) = elements.next() else {
                break;
            };
            args.push(
                self.deserialize_element(element, &param.info)
                    .map_err(|e| e.in_parameter(&param.name))?,
            );
        }
        Ok(args)
    }

    /// Serializes a return value; `ret` of `None` yields an empty tuple.
    pub fn serialize_return(
        &self,
        value: &HostValue,
        ret: Option<&TypeInfoInternal>,
    ) -> Result<DataValue, MappingError> {
        let result = match ret {
            None => Ok(DataValue::empty()),
            Some(TypeInfoInternal::Multimodal { alternatives }) => {
                self.serialize_multimodal(value, alternatives)
            }
            Some(info) => self
                .serialize_element(value, info)
                .map(|element| DataValue::Tuple(vec![element])),
        };
        result.map_err(|e| e.in_parameter(RETURN_VALUE))
    }

    pub fn deserialize_return(
        &self,
        output: &DataValue,
        ret: Option<&TypeInfoInternal>,
    ) -> Result<HostValue, MappingError> {
        let result = match (ret, output) {
            (None, _) => Ok(HostValue::Undefined),
            (Some(TypeInfoInternal::Multimodal { alternatives }), DataValue::Multimodal(elements)) => {
                self.deserialize_multimodal(elements, alternatives)
            }
            (Some(info), DataValue::Tuple(elements)) if !info.is_multimodal() => {
                match elements.as_slice() {
                    [element] => self.deserialize_element(element, info),
                    _ => Err(MappingError::ParameterCount {
                        expected: 1,
                        actual: elements.len(),
                    }),
                }
            }
            (Some(_), _) => Err(MappingError::InvalidElement {
                element: RETURN_VALUE.to_string(),
                reason: "envelope kind does not match the declared return type".to_string(),
            }),
        };
        result.map_err(|e| e.in_parameter(RETURN_VALUE))
    }

    pub fn serialize_element(
        &self,
        value: &HostValue,
        info: &TypeInfoInternal,
    ) -> Result<ElementValue, MappingError> {
        match info {
            TypeInfoInternal::Analysed { typ, .. } => {
                let value = ValueSerializer::new(self.options).serialize(value, typ)?;
                Ok(ElementValue::ComponentModel(WitValue::from(value)))
            }
            TypeInfoInternal::UnstructuredText { .. } => {
                Ok(ElementValue::UnstructuredText(TextReference::from_host(value)?))
            }
            TypeInfoInternal::UnstructuredBinary { .. } => Ok(ElementValue::UnstructuredBinary(
                BinaryReference::from_host(value)?,
            )),
            TypeInfoInternal::Multimodal { .. } | TypeInfoInternal::Principal => {
                Err(MappingError::InvalidElement {
                    element: describe_value(value),
                    reason: "multimodal and principal values are not single elements".to_string(),
                })
            }
        }
    }

    /// Restrictions are enforced here, on the receiving side.
    pub fn deserialize_element(
        &self,
        element: &ElementValue,
        info: &TypeInfoInternal,
    ) -> Result<HostValue, MappingError> {
        match (info, element) {
            (TypeInfoInternal::Analysed { typ, .. }, ElementValue::ComponentModel(wit)) => {
                let value = Value::try_from(wit)?;
                ValueDeserializer::new(self.options).deserialize(&value, typ)
            }
            (
                TypeInfoInternal::UnstructuredText { descriptor },
                ElementValue::UnstructuredText(reference),
            ) => {
                descriptor.check(reference)?;
                Ok(reference.to_host())
            }
            (
                TypeInfoInternal::UnstructuredBinary { descriptor },
                ElementValue::UnstructuredBinary(reference),
            ) => {
                descriptor.check(reference)?;
                Ok(reference.to_host())
            }
            (info, element) => Err(MappingError::InvalidElement {
                element: element.kind_name().to_string(),
                reason: format!("expected {}", info_kind_name(info)),
            }),
        }
    }

    fn serialize_multimodal(
        &self,
        value: &HostValue,
        alternatives: &[MultimodalAlternative],
    ) -> Result<DataValue, MappingError> {
        let HostValue::Array(items) = value else {
            return Err(MappingError::TypeMismatch {
                expected: "multimodal list".to_string(),
                actual: describe_value(value),
                path: String::new(),
            });
        };

        let mut elements = Vec::with_capacity(items.len());
        for item in items.iter() {
            let (alternative, payload) = route_alternative(item, alternatives).ok_or_else(|| {
                MappingError::MultimodalNoMatch {
                    value: describe_value(item),
                    alternatives: alternatives.iter().map(|a| a.name.clone()).collect(),
                }
            })?;
            trace!("multimodal element routed to '{}'", alternative.name);
            elements.push(NamedElementValue {
                name: alternative.name.clone(),
                value: self
                    .serialize_element(payload, &alternative.info)
                    .map_err(|e| e.in_parameter(&alternative.name))?,
            });
        }
        Ok(DataValue::Multimodal(elements))
    }

    fn deserialize_multimodal(
        &self,
        elements: &[NamedElementValue],
        alternatives: &[MultimodalAlternative],
    ) -> Result<HostValue, MappingError> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            let Some(alternative) = alternatives.iter().find(|a| a.name == element.name) else {
                return Err(MappingError::UnknownTag {
                    tag: element.name.clone(),
                    allowed: alternatives.iter().map(|a| a.name.clone()).collect(),
                    path: String::new(),
                });
            };
            let payload = self
                .deserialize_element(&element.value, &alternative.info)
                .map_err(|e| e.in_parameter(&alternative.name))?;
            items.push(match &alternative.payload_field {
                Some(field) => HostValue::object([
                    ("tag", HostValue::from(alternative.name.as_str())),
                    (field.as_str(), payload),
                ]),
                None => payload,
            });
        }
        Ok(HostValue::from(items))
    }
}

fn info_kind_name(info: &TypeInfoInternal) -> &'static str {
    match info {
        TypeInfoInternal::Analysed { .. } => "component-model",
        TypeInfoInternal::UnstructuredText { .. } => "unstructured-text",
        TypeInfoInternal::UnstructuredBinary { .. } => "unstructured-binary",
        TypeInfoInternal::Multimodal { .. } => "multimodal",
        TypeInfoInternal::Principal => "principal",
    }
}

/// Picks the alternative a multimodal element belongs to, together with the
/// payload to serialize for it.
///
/// Elements wrapped as `{ tag: name, <field>: payload }` go to the named
/// alternative. Bare elements are tried against text, then binary, then the
/// component-model alternatives in declaration order.
fn route_alternative<'v, 'a>(
    item: &'v HostValue,
    alternatives: &'a [MultimodalAlternative],
) -> Option<(&'a MultimodalAlternative, &'v HostValue)> {
    if let Some(HostValue::String(tag)) = item.field("tag") {
        let wrapped = alternatives.iter().find_map(|a| {
            let field = a.payload_field.as_deref()?;
            if a.name.as_str() == &**tag {
                item.field(field).map(|payload| (a, payload))
            } else {
                None
            }
        });
        if wrapped.is_some() {
            return wrapped;
        }
    }

    let bare = || alternatives.iter().filter(|a| a.payload_field.is_none());
    bare()
        .find(|a| {
            matches!(a.info, TypeInfoInternal::UnstructuredText { .. })
                && TextReference::accepts(item)
        })
        .or_else(|| {
            bare().find(|a| {
                matches!(a.info, TypeInfoInternal::UnstructuredBinary { .. })
                    && BinaryReference::accepts(item)
            })
        })
        .or_else(|| {
            bare().find(|a| match &a.info {
                TypeInfoInternal::Analysed { typ, .. } => matches_type(item, typ),
                _ => false,
            })
        })
        .map(|a| (a, item))
}
