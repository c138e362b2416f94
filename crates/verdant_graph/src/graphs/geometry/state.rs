// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-pass geometry build state and deferred output storage.

use crate::block::Block;
use crate::evaluation::BuildError;
use crate::mesh::VertexData;
use crate::port::PortType;
use crate::types::ResolvedTypes;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Deferred output computation, re-run for each evaluation context
pub type Evaluator = Rc<dyn Fn(&GeometryBuildState) -> Option<Value>>;

/// What a built output port holds
#[derive(Clone, Default)]
pub enum Stored {
    /// No value; consumers see absence
    #[default]
    Empty,
    /// A fixed value
    Literal(Value),
    /// Computed on demand from the build state
    Deferred(Evaluator),
}

impl Stored {
    /// Wrap a closure as a deferred output
    pub fn deferred(f: impl Fn(&GeometryBuildState) -> Option<Value> + 'static) -> Self {
        Self::Deferred(Rc::new(f))
    }

    /// Value in the current context
    pub fn get(&self, state: &GeometryBuildState) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Literal(value) => Some(value.clone()),
            Self::Deferred(f) => f(state),
        }
    }

    /// Whether anything is stored
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Run a deferred output once and keep the result as a literal
    pub fn freeze(self, state: &GeometryBuildState) -> Self {
        match self {
            Self::Deferred(f) => f(state).map_or(Self::Empty, Self::Literal),
            other => other,
        }
    }
}

impl fmt::Debug for Stored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => write!(f, "Deferred"),
        }
    }
}

/// Contextual parameters visible to deferred evaluators
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Geometry whose vertices are being processed
    pub geometry: Option<Arc<VertexData>>,
    /// Current vertex
    pub vertex: Option<usize>,
    /// First face using the current vertex
    pub face: Option<usize>,
    /// Iteration of the enclosing loop
    pub loop_index: Option<usize>,
    /// Instance being generated
    pub instance: Option<usize>,
    /// Slot of the enclosing merge
    pub geometry_index: Option<usize>,
}

/// Source a contextual input block reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextualSource {
    /// Current vertex position
    Positions,
    /// Current vertex normal
    Normals,
    /// Current vertex UV
    Uv,
    /// Current vertex index
    VertexId,
    /// Current face index
    FaceId,
    /// Current loop iteration
    LoopId,
    /// Current instance index
    InstanceId,
    /// Current merge slot
    GeometryId,
}

impl ContextualSource {
    /// Choice names, `None` first
    pub const NAMES: &'static [&'static str] = &[
        "None",
        "Positions",
        "Normals",
        "UV",
        "VertexID",
        "FaceID",
        "LoopID",
        "InstanceID",
        "GeometryID",
    ];

    /// Parse a choice name; `"None"` yields `None`
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Positions" => Self::Positions,
            "Normals" => Self::Normals,
            "UV" => Self::Uv,
            "VertexID" => Self::VertexId,
            "FaceID" => Self::FaceId,
            "LoopID" => Self::LoopId,
            "InstanceID" => Self::InstanceId,
            "GeometryID" => Self::GeometryId,
            _ => return None,
        })
    }

    /// Type of the value produced
    pub fn port_type(self) -> PortType {
        match self {
            Self::Positions | Self::Normals => PortType::Vector3,
            Self::Uv => PortType::Vector2,
            _ => PortType::Int,
        }
    }
}

/// Transient state of one geometry evaluation pass.
///
/// Deferred evaluators only see the state through `&self`; blocks that
/// iterate (vertex loops, instancing) push a context with [`Self::scoped`]
/// and the previous context is restored afterwards.
#[derive(Debug, Default)]
pub struct GeometryBuildState {
    context: RefCell<ExecutionContext>,
}

impl GeometryBuildState {
    /// Create a state with an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current context
    pub fn context(&self) -> ExecutionContext {
        self.context.borrow().clone()
    }

    /// Run `f` with a modified context
    pub fn scoped<R>(&self, update: impl FnOnce(&mut ExecutionContext), f: impl FnOnce() -> R) -> R {
        let saved = self.context();
        update(&mut *self.context.borrow_mut());
        let result = f();
        *self.context.borrow_mut() = saved;
        result
    }

    /// Current loop iteration
    pub fn loop_index(&self) -> Option<usize> {
        self.context.borrow().loop_index
    }

    /// Current instance index
    pub fn instance(&self) -> Option<usize> {
        self.context.borrow().instance
    }

    /// Read a contextual value, `None` outside a matching context
    pub fn contextual_value(&self, source: ContextualSource) -> Option<Value> {
        let ctx = self.context.borrow();
        let index = |v: Option<usize>| v.map(|i| Value::Int(i as i64));
        match source {
            ContextualSource::Positions => {
                let geometry = ctx.geometry.as_ref()?;
                Some(Value::Vector3(geometry.position(ctx.vertex?)))
            }
            ContextualSource::Normals => {
                let geometry = ctx.geometry.as_ref()?;
                Some(Value::Vector3(geometry.normal(ctx.vertex?)))
            }
            ContextualSource::Uv => {
                let geometry = ctx.geometry.as_ref()?;
                Some(Value::Vector2(geometry.uv(ctx.vertex?)))
            }
            ContextualSource::VertexId => index(ctx.vertex),
            ContextualSource::FaceId => index(ctx.face),
            ContextualSource::LoopId => index(ctx.loop_index),
            ContextualSource::InstanceId => index(ctx.instance),
            ContextualSource::GeometryId => index(ctx.geometry_index),
        }
    }
}

/// Inputs and outputs of one block while it builds
pub struct GeometryBlockContext<'a> {
    block: &'a Block,
    types: &'a ResolvedTypes,
    inputs: Vec<Stored>,
    outputs: Vec<Stored>,
}

impl<'a> GeometryBlockContext<'a> {
    /// Create a context; `inputs` follows the block's input order
    pub fn new(block: &'a Block, types: &'a ResolvedTypes, inputs: Vec<Stored>) -> Self {
        Self {
            block,
            types,
            inputs,
            outputs: vec![Stored::Empty; block.outputs.len()],
        }
    }

    /// The block being built
    pub fn block(&self) -> &'a Block {
        self.block
    }

    /// What feeds an input (connection or default), `Empty` otherwise
    pub fn input(&self, name: &str) -> Stored {
        self.block
            .inputs
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.inputs.get(i).cloned())
            .unwrap_or_default()
    }

    /// Resolved type of an output
    pub fn output_type(&self, name: &str) -> Option<PortType> {
        self.types.get(self.block.output(name)?.id)
    }

    /// Store an output
    pub fn set(&mut self, name: &str, stored: Stored) -> Result<(), BuildError> {
        let index = self
            .block
            .outputs
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| {
                BuildError::Custom(format!("{} has no output {name}", self.block.class_name))
            })?;
        self.outputs[index] = stored;
        Ok(())
    }

    /// Store a deferred output
    pub fn set_deferred(
        &mut self,
        name: &str,
        f: impl Fn(&GeometryBuildState) -> Option<Value> + 'static,
    ) -> Result<(), BuildError> {
        self.set(name, Stored::deferred(f))
    }

    /// Built outputs in port order
    pub fn into_outputs(self) -> Vec<Stored> {
        self.outputs
    }
}
