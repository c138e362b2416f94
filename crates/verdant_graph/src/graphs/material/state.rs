// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader build state: the compilation buffer of one stage plus the program
//! interface (uniforms, samplers, defines) shared by both stages.

use super::io::SystemValue;
use crate::block::{Block, BlockId};
use crate::config::{RenderConfig, ShaderLanguage, TextureCategory};
use crate::evaluation::BuildError;
use crate::port::PortType;
use crate::types::ResolvedTypes;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Names generated code may never use for locals
const RESERVED: &[&str] = &[
    // Generated structure
    "output", "input", "texture", "uniforms", "main", "fragColor", "position", "normal", "uv",
    "color", "Uniforms", "VertexInput", "VertexOutput", "FragmentInput", "clip_position",
    "toLinearSpace", "to_linear_space",
    // Shared keywords and types
    "in", "out", "inout", "uniform", "const", "true", "false", "if", "else", "for", "while",
    "do", "break", "continue", "discard", "return", "struct", "void", "bool", "int", "uint",
    "float", "vec2", "vec3", "vec4", "mat2", "mat3", "mat4", "sampler2D", "precision", "highp",
    "mediump", "lowp", "layout", "flat", "smooth", "centroid", "fn", "let", "var", "loop",
    "switch", "case", "default", "override", "enable", "alias", "sampler", "f32", "i32", "u32",
    "f16", "array", "ptr", "atomic",
    // Builtins used by blocks
    "mix", "step", "smoothstep", "clamp", "dot", "length", "sin", "cos", "tan", "exp", "log",
    "pow", "sqrt", "abs", "floor", "ceil", "fract", "sign", "min", "max", "round", "degrees",
    "radians", "atan", "acos", "asin", "mod", "textureSample", "textureSampleLevel",
];

/// Prefixes owned by uniforms, varyings, textures and samplers
const RESERVED_PREFIXES: &[&str] = &["u_", "v_", "t_", "s_", "gl_"];

/// Pipeline stage being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Value of a define
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShaderDefine {
    /// Feature switch
    Bool(bool),
    /// Integer constant
    Int(i64),
    /// Float constant
    Float(f64),
}

/// Generated expression and its type
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderValue {
    /// Source text
    pub expr: String,
    /// Type of the expression
    pub port_type: PortType,
}

impl ShaderValue {
    /// Create a value
    pub fn new(expr: impl Into<String>, port_type: PortType) -> Self {
        Self {
            expr: expr.into(),
            port_type,
        }
    }

    /// Literal for a constant; integers become floats
    pub fn literal(value: &Value, language: ShaderLanguage) -> Option<Self> {
        let port_type = shader_type(value.port_type());
        let components = value.components()?;
        let expr = match port_type {
            PortType::Float => float_literal(components[0]),
            _ => {
                let args: Vec<String> = components.iter().map(|c| float_literal(*c)).collect();
                format!("{}({})", type_name(language, port_type), args.join(", "))
            }
        };
        Some(Self::new(expr, port_type))
    }

    /// Number of components, 1 for scalars
    pub fn width(&self) -> usize {
        self.port_type.component_count().unwrap_or(1)
    }
}

/// Type a port carries in generated code; integers are emitted as floats
pub fn shader_type(port_type: PortType) -> PortType {
    match port_type {
        PortType::Int => PortType::Float,
        other => other,
    }
}

/// Type name in a language
pub fn type_name(language: ShaderLanguage, port_type: PortType) -> &'static str {
    match (language, port_type) {
        (ShaderLanguage::Glsl, PortType::Int) => "int",
        (ShaderLanguage::Glsl, PortType::Vector2) => "vec2",
        (ShaderLanguage::Glsl, PortType::Vector3 | PortType::Color3) => "vec3",
        (ShaderLanguage::Glsl, PortType::Vector4 | PortType::Color4) => "vec4",
        (ShaderLanguage::Glsl, PortType::Matrix) => "mat4",
        (ShaderLanguage::Glsl, PortType::Texture) => "sampler2D",
        (ShaderLanguage::Glsl, _) => "float",
        (ShaderLanguage::Wgsl, PortType::Int) => "i32",
        (ShaderLanguage::Wgsl, PortType::Vector2) => "vec2<f32>",
        (ShaderLanguage::Wgsl, PortType::Vector3 | PortType::Color3) => "vec3<f32>",
        (ShaderLanguage::Wgsl, PortType::Vector4 | PortType::Color4) => "vec4<f32>",
        (ShaderLanguage::Wgsl, PortType::Matrix) => "mat4x4<f32>",
        (ShaderLanguage::Wgsl, PortType::Texture) => "texture_2d<f32>",
        (ShaderLanguage::Wgsl, _) => "f32",
    }
}

/// Float literal that always carries a decimal point
pub fn float_literal(v: f64) -> String {
    let v = if v.is_finite() {
        v
    } else if v.is_nan() {
        0.0
    } else {
        f64::from(f32::MAX).copysign(v)
    };
    let s = format!("{v:?}");
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

/// A scalar expression widened to `port_type` by repetition
pub fn splat(language: ShaderLanguage, port_type: PortType, scalar: &str) -> String {
    match port_type.component_count() {
        Some(n) if n > 1 => format!("{}({scalar})", type_name(language, port_type)),
        _ => scalar.to_string(),
    }
}

/// Convert between vector widths.
///
/// Narrowing swizzles; widening appends `fill` components (zeros unless a
/// block documents otherwise). Scalars splat.
pub fn convert(
    language: ShaderLanguage,
    value: &ShaderValue,
    to: PortType,
    fill: [&str; 3],
) -> String {
    let from = value.width();
    let Some(target) = to.component_count() else {
        return value.expr.clone();
    };
    if from == target {
        return value.expr.clone();
    }
    if from == 1 {
        return splat(language, to, &value.expr);
    }
    if target < from {
        let swizzle = &"xyzw"[..target];
        return format!("{}.{swizzle}", value.expr);
    }
    // fill[0] is the first missing component after x and y
    let extra = &fill[from - 2..target - 2];
    format!("{}({}, {})", type_name(language, to), value.expr, extra.join(", "))
}

/// Allocates unique local variable names from readable hints
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl NameAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize a hint into an identifier
    pub fn sanitize(hint: &str) -> String {
        let mapped: String = hint
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let trimmed = mapped.trim_start_matches('_');
        let mut name = if trimmed.is_empty() {
            "v".to_string()
        } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            format!("v{trimmed}")
        } else {
            trimmed.to_string()
        };
        while name.contains("__") {
            name = name.replace("__", "_");
        }
        if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
            name.insert(0, '_');
        }
        name
    }

    /// Reserve a name so it is never handed out
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// The hint itself the first time, `hint{n}` afterwards; reserved
    /// words always get a numeric suffix
    pub fn allocate(&mut self, hint: &str) -> String {
        let base = Self::sanitize(hint);
        if !RESERVED.contains(&base.as_str()) && self.used.insert(base.clone()) {
            return base;
        }
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// A texture sampled by the program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerBinding {
    /// Sampling block
    pub block: BlockId,
    /// Texture variable name (`t_*`); WGSL also gets a matching `s_*` sampler
    pub name: String,
    /// Texture the block references
    pub texture: String,
    /// Texture category
    pub category: TextureCategory,
}

/// Uniforms, samplers and defines visible to both stages
#[derive(Debug, Clone, Default)]
pub struct ProgramInterface {
    /// Uniforms by name
    pub uniforms: IndexMap<String, PortType>,
    /// Uniform names owned by uniform input blocks
    pub block_uniforms: IndexMap<BlockId, String>,
    /// Samplers by block
    pub samplers: IndexMap<BlockId, SamplerBinding>,
    /// Defines by name
    pub defines: IndexMap<String, ShaderDefine>,
}

/// Build state of one shader stage
#[derive(Debug)]
pub struct ShaderBuildState {
    stage: ShaderStage,
    config: RenderConfig,
    interface: ProgramInterface,
    body: String,
    attributes: IndexMap<String, PortType>,
    varyings: IndexMap<String, PortType>,
    functions: IndexMap<&'static str, String>,
    names: NameAllocator,
    result: Option<String>,
}

/// What a finished stage hands to the assembler
#[derive(Debug, Default)]
pub struct StageOutput {
    /// Statements of the entry point
    pub body: String,
    /// Vertex attributes read
    pub attributes: IndexMap<String, PortType>,
    /// Varyings read (fragment stage)
    pub varyings: IndexMap<String, PortType>,
    /// Helper functions
    pub functions: Vec<String>,
    /// Stage result expression
    pub result: Option<String>,
}

impl ShaderBuildState {
    /// Create the state of a stage
    pub fn new(stage: ShaderStage, config: RenderConfig, interface: ProgramInterface) -> Self {
        Self {
            stage,
            config,
            interface,
            body: String::new(),
            attributes: IndexMap::new(),
            varyings: IndexMap::new(),
            functions: IndexMap::new(),
            names: NameAllocator::new(),
            result: None,
        }
    }

    /// Stage being built
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Output language
    pub fn language(&self) -> ShaderLanguage {
        self.config.language
    }

    /// Render configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Append a statement to the entry point
    pub fn emit(&mut self, statement: &str) {
        self.body.push_str("    ");
        self.body.push_str(statement);
        self.body.push('\n');
    }

    /// Declare a local initialised with `expr`
    pub fn declare(&mut self, hint: &str, port_type: PortType, expr: &str) -> ShaderValue {
        let name = self.names.allocate(hint);
        let type_name = type_name(self.language(), port_type);
        let statement = match self.language() {
            ShaderLanguage::Glsl => format!("{type_name} {name} = {expr};"),
            ShaderLanguage::Wgsl => format!("let {name}: {type_name} = {expr};"),
        };
        self.emit(&statement);
        ShaderValue::new(name, port_type)
    }

    /// Reference a uniform, declaring it on first use
    pub fn uniform(&mut self, name: &str, port_type: PortType) -> Result<ShaderValue, BuildError> {
        match self.interface.uniforms.get(name) {
            Some(existing) if !existing.is_equivalent(port_type) => {
                return Err(BuildError::Custom(format!(
                    "Uniform {name} declared as both {existing:?} and {port_type:?}"
                )));
            }
            Some(_) => {}
            None => {
                self.interface.uniforms.insert(name.to_string(), port_type);
            }
        }
        let expr = match self.language() {
            ShaderLanguage::Glsl => name.to_string(),
            ShaderLanguage::Wgsl => format!("uniforms.{name}"),
        };
        Ok(ShaderValue::new(expr, port_type))
    }

    /// Uniform owned by `block`, named after it and unique per block
    pub fn block_uniform(&mut self, block: &Block, port_type: PortType) -> Result<ShaderValue, BuildError> {
        let name = match self.interface.block_uniforms.get(&block.id) {
            Some(name) => name.clone(),
            None => {
                let base = format!("u_{}", NameAllocator::sanitize(&block.name).to_lowercase());
                let mut name = base.clone();
                let mut n = 0;
                while SystemValue::is_uniform_name(&name)
                    || self.interface.uniforms.contains_key(&name)
                    || self.interface.block_uniforms.values().any(|owned| *owned == name)
                {
                    n += 1;
                    name = format!("{base}{n}");
                }
                self.interface.block_uniforms.insert(block.id, name.clone());
                name
            }
        };
        self.uniform(&name, port_type)
    }

    /// Reference a vertex attribute.
    ///
    /// In the fragment stage this becomes a varying the vertex stage
    /// forwards.
    pub fn attribute(&mut self, name: &str, port_type: PortType) -> ShaderValue {
        let name = match self.stage {
            ShaderStage::Vertex => {
                self.attributes.insert(name.to_string(), port_type);
                name.to_string()
            }
            ShaderStage::Fragment => {
                let varying = format!("v_{name}");
                self.varyings.insert(varying.clone(), port_type);
                varying
            }
        };
        let expr = match self.language() {
            ShaderLanguage::Glsl => name,
            ShaderLanguage::Wgsl => format!("input.{name}"),
        };
        ShaderValue::new(expr, port_type)
    }

    /// Texture variable of a sampling block, declared on first use
    pub fn sampler(&mut self, block: &Block, texture: &str, category: TextureCategory) -> String {
        if let Some(binding) = self.interface.samplers.get(&block.id) {
            return binding.name.clone();
        }
        let base = format!("t_{}", NameAllocator::sanitize(&block.name).to_lowercase());
        let mut name = base.clone();
        let mut n = 0;
        while self.interface.samplers.values().any(|b| b.name == name) {
            n += 1;
            name = format!("{base}{n}");
        }
        self.interface.samplers.insert(
            block.id,
            SamplerBinding {
                block: block.id,
                name: name.clone(),
                texture: texture.to_string(),
                category,
            },
        );
        name
    }

    /// Expression sampling a texture variable at `uv`
    pub fn texture_sample(&self, name: &str, uv: &str) -> String {
        match (self.language(), self.stage) {
            (ShaderLanguage::Glsl, _) => format!("texture({name}, {uv})"),
            (ShaderLanguage::Wgsl, ShaderStage::Fragment) => {
                format!("textureSample({name}, s_{}, {uv})", &name[2..])
            }
            (ShaderLanguage::Wgsl, ShaderStage::Vertex) => {
                format!("textureSampleLevel({name}, s_{}, {uv}, 0.0)", &name[2..])
            }
        }
    }

    /// Set a define
    pub fn define(&mut self, name: &str, value: ShaderDefine) {
        self.interface.defines.insert(name.to_string(), value);
    }

    /// Name of the sRGB to linear helper, emitted on first use
    pub fn to_linear_function(&mut self) -> &'static str {
        let (name, source) = match self.language() {
            ShaderLanguage::Glsl => (
                "toLinearSpace",
                "vec4 toLinearSpace(vec4 color) {\n    return vec4(pow(color.rgb, vec3(2.2)), color.a);\n}\n",
            ),
            ShaderLanguage::Wgsl => (
                "to_linear_space",
                "fn to_linear_space(color: vec4<f32>) -> vec4<f32> {\n    return vec4<f32>(pow(color.rgb, vec3<f32>(2.2)), color.a);\n}\n",
            ),
        };
        self.functions
            .entry(name)
            .or_insert_with(|| source.to_string());
        name
    }

    /// Set the stage result
    pub fn set_result(&mut self, expr: impl Into<String>) {
        self.result = Some(expr.into());
    }

    /// Split into the stage output and the shared interface
    pub fn finish(self) -> (StageOutput, ProgramInterface) {
        (
            StageOutput {
                body: self.body,
                attributes: self.attributes,
                varyings: self.varyings,
                functions: self.functions.into_values().collect(),
                result: self.result,
            },
            self.interface,
        )
    }
}

/// Inputs and outputs of one block while it builds
pub struct ShaderBlockContext<'a> {
    block: &'a Block,
    types: &'a ResolvedTypes,
    inputs: Vec<Option<ShaderValue>>,
    outputs: Vec<Option<ShaderValue>>,
}

impl<'a> ShaderBlockContext<'a> {
    /// Create a context; `inputs` follows the block's input order
    pub fn new(block: &'a Block, types: &'a ResolvedTypes, inputs: Vec<Option<ShaderValue>>) -> Self {
        Self {
            block,
            types,
            inputs,
            outputs: vec![None; block.outputs.len()],
        }
    }

    /// The block being built
    pub fn block(&self) -> &'a Block {
        self.block
    }

    /// Value feeding an input (connection or default)
    pub fn input(&self, name: &str) -> Option<ShaderValue> {
        self.block
            .inputs
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.inputs.get(i).cloned().flatten())
    }

    /// Resolved type of an output
    pub fn output_type(&self, name: &str) -> Option<PortType> {
        self.types.get(self.block.output(name)?.id)
    }

    /// Bind an output
    pub fn set(&mut self, name: &str, value: ShaderValue) -> Result<(), BuildError> {
        let index = self
            .block
            .outputs
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| {
                BuildError::Custom(format!("{} has no output {name}", self.block.class_name))
            })?;
        self.outputs[index] = Some(value);
        Ok(())
    }

    /// Bound outputs in port order
    pub fn into_outputs(self) -> Vec<Option<ShaderValue>> {
        self.outputs
    }
}
