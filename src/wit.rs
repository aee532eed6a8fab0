// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Flat node encoding of [`Value`] used on the wire.
//!
//! Node 0 is the root. Compound nodes refer to their children by index,
//! every child index is greater than the index of its parent, and no node
//! is the child of more than one parent.

use serde::{Deserialize, Serialize};

use crate::value::Value;

pub type NodeIndex = u32;

/// Deepest nesting accepted when decoding.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WitNode {
    RecordValue(Vec<NodeIndex>),
    VariantValue((u32, Option<NodeIndex>)),
    EnumValue(u32),
    FlagsValue(Vec<bool>),
    TupleValue(Vec<NodeIndex>),
    ListValue(Vec<NodeIndex>),
    OptionValue(Option<NodeIndex>),
    ResultValue(Result<Option<NodeIndex>, Option<NodeIndex>>),
    PrimU8(u8),
    PrimU16(u16),
    PrimU32(u32),
    PrimU64(u64),
    PrimS8(i8),
    PrimS16(i16),
    PrimS32(i32),
    PrimS64(i64),
    PrimFloat32(f32),
    PrimFloat64(f64),
    PrimChar(char),
    PrimBool(bool),
    PrimString(String),
    Handle((String, u64)),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitValue {
    pub nodes: Vec<WitNode>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("wire value has no nodes")]
    Empty,

    #[error("node {parent} refers to child {child}, which is not a later node (node count {len})")]
    InvalidChildIndex {
        parent: NodeIndex,
        child: NodeIndex,
        len: usize,
    },

    #[error("node {parent} refers to child {child}, which already has a parent")]
    SharedChild { parent: NodeIndex, child: NodeIndex },

    #[error("wire value is nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("could not encode or decode wire value: {0}")]
    Codec(String),
}

impl WitValue {
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        postcard::to_allocvec(self).map_err(|e| WireError::Codec(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<WitValue, WireError> {
        postcard::from_bytes(bytes).map_err(|e| WireError::Codec(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        if self.nodes.is_empty() {
            return Err(WireError::Empty);
        }
        TreeReader {
            nodes: &self.nodes,
            claimed: vec![false; self.nodes.len()],
        }
        .read(0, 0)
    }
}

/// Rebuilds a tree from a node list, claiming each node for one parent.
struct TreeReader<'a> {
    nodes: &'a [WitNode],
    claimed: Vec<bool>,
}

impl TreeReader<'_> {
    fn child(
        &mut self,
        parent: usize,
        child: NodeIndex,
        depth: usize,
    ) -> Result<Value, WireError> {
        let idx = child as usize;
        if idx <= parent || idx >= self.nodes.len() {
            return Err(WireError::InvalidChildIndex {
                parent: parent as NodeIndex,
                child,
                len: self.nodes.len(),
            });
        }
        if std::mem::replace(&mut self.claimed[idx], true) {
            return Err(WireError::SharedChild {
                parent: parent as NodeIndex,
                child,
            });
        }
        self.read(idx, depth + 1)
    }

    fn children(
        &mut self,
        parent: usize,
        items: &[NodeIndex],
        depth: usize,
    ) -> Result<Vec<Value>, WireError> {
        items.iter().map(|c| self.child(parent, *c, depth)).collect()
    }

    fn optional_child(
        &mut self,
        parent: usize,
        child: &Option<NodeIndex>,
        depth: usize,
    ) -> Result<Option<Box<Value>>, WireError> {
        match child {
            Some(c) => Ok(Some(Box::new(self.child(parent, *c, depth)?))),
            None => Ok(None),
        }
    }

    fn read(&mut self, idx: usize, depth: usize) -> Result<Value, WireError> {
        if depth > MAX_DEPTH {
            return Err(WireError::TooDeep);
        }
        let nodes = self.nodes;
        let Some(node) = nodes.get(idx) else {
            return Err(WireError::Empty);
        };
        Ok(match node {
            WitNode::RecordValue(fields) => Value::Record(self.children(idx, fields, depth)?),
            WitNode::TupleValue(items) => Value::Tuple(self.children(idx, items, depth)?),
            WitNode::ListValue(items) => Value::List(self.children(idx, items, depth)?),
            WitNode::VariantValue((case_idx, payload)) => Value::Variant {
                case_idx: *case_idx,
                case_value: self.optional_child(idx, payload, depth)?,
            },
            WitNode::EnumValue(case_idx) => Value::Enum(*case_idx),
            WitNode::FlagsValue(flags) => Value::Flags(flags.clone()),
            WitNode::OptionValue(inner) => Value::Option(self.optional_child(idx, inner, depth)?),
            WitNode::ResultValue(Ok(payload)) => {
                Value::Result(Ok(self.optional_child(idx, payload, depth)?))
            }
            WitNode::ResultValue(Err(payload)) => {
                Value::Result(Err(self.optional_child(idx, payload, depth)?))
            }
            WitNode::PrimU8(v) => Value::U8(*v),
            WitNode::PrimU16(v) => Value::U16(*v),
            WitNode::PrimU32(v) => Value::U32(*v),
            WitNode::PrimU64(v) => Value::U64(*v),
            WitNode::PrimS8(v) => Value::S8(*v),
            WitNode::PrimS16(v) => Value::S16(*v),
            WitNode::PrimS32(v) => Value::S32(*v),
            WitNode::PrimS64(v) => Value::S64(*v),
            WitNode::PrimFloat32(v) => Value::F32(*v),
            WitNode::PrimFloat64(v) => Value::F64(*v),
            WitNode::PrimChar(v) => Value::Char(*v),
            WitNode::PrimBool(v) => Value::Bool(*v),
            WitNode::PrimString(v) => Value::String(v.clone()),
            WitNode::Handle((uri, resource_id)) => Value::Handle {
                uri: uri.clone(),
                resource_id: *resource_id,
            },
        })
    }
}

impl TryFrom<WitValue> for Value {
    type Error = WireError;

    fn try_from(value: WitValue) -> Result<Self, Self::Error> {
        value.to_value()
    }
}

impl TryFrom<&WitValue> for Value {
    type Error = WireError;

    fn try_from(value: &WitValue) -> Result<Self, Self::Error> {
        value.to_value()
    }
}

impl From<Value> for WitValue {
    fn from(value: Value) -> Self {
        WitValue::from(&value)
    }
}

impl From<&Value> for WitValue {
    fn from(value: &Value) -> Self {
        let mut builder = WitValueBuilder::new();
        builder.push(value);
        builder.build()
    }
}

/// Appends nodes in parent-first order.
///
/// Compound nodes are added with empty child lists and completed once their
/// children have been added.
#[derive(Debug, Default)]
pub struct WitValueBuilder {
    nodes: Vec<WitNode>,
}

impl WitValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: WitNode) -> NodeIndex {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeIndex
    }

    pub fn add_record(&mut self) -> NodeIndex {
        self.add(WitNode::RecordValue(vec![]))
    }

    pub fn add_tuple(&mut self) -> NodeIndex {
        self.add(WitNode::TupleValue(vec![]))
    }

    pub fn add_list(&mut self) -> NodeIndex {
        self.add(WitNode::ListValue(vec![]))
    }

    /// Adds an empty option. `finish_child` turns it into `some`.
    pub fn add_option(&mut self) -> NodeIndex {
        self.add(WitNode::OptionValue(None))
    }

    pub fn add_variant(&mut self, case_idx: u32) -> NodeIndex {
        self.add(WitNode::VariantValue((case_idx, None)))
    }

    pub fn add_result_ok(&mut self) -> NodeIndex {
        self.add(WitNode::ResultValue(Ok(None)))
    }

    pub fn add_result_err(&mut self) -> NodeIndex {
        self.add(WitNode::ResultValue(Err(None)))
    }

    /// Completes a record, tuple or list node.
    pub fn finish_seq(&mut self, parent: NodeIndex, items: Vec<NodeIndex>) {
        if let Some(node) = self.nodes.get_mut(parent as usize) {
            match node {
                WitNode::RecordValue(children)
                | WitNode::TupleValue(children)
                | WitNode::ListValue(children) => *children = items,
                _ => (),
            }
        }
    }

    /// Completes an option, variant or result node with its payload.
    pub fn finish_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        if let Some(node) = self.nodes.get_mut(parent as usize) {
            match node {
                WitNode::OptionValue(inner) => *inner = Some(child),
                WitNode::VariantValue((_, payload)) => *payload = Some(child),
                WitNode::ResultValue(Ok(payload)) | WitNode::ResultValue(Err(payload)) => {
                    *payload = Some(child)
                }
                _ => (),
            }
        }
    }

    fn push_children(&mut self, parent: NodeIndex, items: &[Value]) {
        let children = items.iter().map(|v| self.push(v)).collect();
        self.finish_seq(parent, children);
    }

    fn push_payload(&mut self, parent: NodeIndex, payload: &Option<Box<Value>>) {
        if let Some(v) = payload {
            let child = self.push(v);
            self.finish_child(parent, child);
        }
    }

    /// Appends a whole value tree and returns the index of its root.
    pub fn push(&mut self, value: &Value) -> NodeIndex {
        match value {
            Value::Record(fields) => {
                let idx = self.add_record();
                self.push_children(idx, fields);
                idx
            }
            Value::Tuple(items) => {
                let idx = self.add_tuple();
                self.push_children(idx, items);
                idx
            }
            Value::List(items) => {
                let idx = self.add_list();
                self.push_children(idx, items);
                idx
            }
            Value::Variant {
                case_idx,
                case_value,
            } => {
                let idx = self.add_variant(*case_idx);
                self.push_payload(idx, case_value);
                idx
            }
            Value::Option(inner) => {
                let idx = self.add_option();
                self.push_payload(idx, inner);
                idx
            }
            Value::Result(Ok(payload)) => {
                let idx = self.add_result_ok();
                self.push_payload(idx, payload);
                idx
            }
            Value::Result(Err(payload)) => {
                let idx = self.add_result_err();
                self.push_payload(idx, payload);
                idx
            }
            Value::Enum(case_idx) => self.add(WitNode::EnumValue(*case_idx)),
            Value::Flags(flags) => self.add(WitNode::FlagsValue(flags.clone())),
            Value::Bool(v) => self.add(WitNode::PrimBool(*v)),
            Value::U8(v) => self.add(WitNode::PrimU8(*v)),
            Value::U16(v) => self.add(WitNode::PrimU16(*v)),
            Value::U32(v) => self.add(WitNode::PrimU32(*v)),
            Value::U64(v) => self.add(WitNode::PrimU64(*v)),
            Value::S8(v) => self.add(WitNode::PrimS8(*v)),
            Value::S16(v) => self.add(WitNode::PrimS16(*v)),
            Value::S32(v) => self.add(WitNode::PrimS32(*v)),
            Value::S64(v) => self.add(WitNode::PrimS64(*v)),
            Value::F32(v) => self.add(WitNode::PrimFloat32(*v)),
            Value::F64(v) => self.add(WitNode::PrimFloat64(*v)),
            Value::Char(v) => self.add(WitNode::PrimChar(*v)),
            Value::String(v) => self.add(WitNode::PrimString(v.clone())),
            Value::Handle { uri, resource_id } => {
                self.add(WitNode::Handle((uri.clone(), *resource_id)))
            }
        }
    }

    pub fn build(self) -> WitValue {
        WitValue { nodes: self.nodes }
    }
}
