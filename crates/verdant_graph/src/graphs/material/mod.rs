// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader (material) graph compiled to GLSL ES 3.00 or WGSL.
//!
//! The vertex stage is built from the blocks feeding the vertex output, the
//! fragment stage from the blocks feeding the fragment output. A block used
//! by both stages is built once per stage. Attributes read in the fragment
//! stage become varyings the vertex stage forwards.

mod assembly;
mod io;
mod math;
mod state;
mod texture;
mod vector;

pub use io::{FragmentOutputBlock, InputBlock, InputMode, SystemValue, VertexOutputBlock, ATTRIBUTES};
pub use math::{
    ArithmeticBlock, ClampBlock, DotBlock, LengthBlock, LerpBlock, ModBlock, SmoothStepBlock,
    StepBlock, TrigonometryBlock,
};
pub use state::{
    NameAllocator, ProgramInterface, SamplerBinding, ShaderBlockContext, ShaderBuildState,
    ShaderDefine, ShaderStage, ShaderValue, StageOutput,
};
pub use texture::TextureBlock;
pub use vector::{TransformBlock, VectorMergerBlock, VectorSplitterBlock};

use crate::block::{Block, BlockId};
use crate::config::{RenderConfig, ShaderLanguage, TextureCategory};
use crate::connection::ConnectionId;
use crate::evaluation::{BuildError, BuildPlan};
use crate::graph::{ConnectionError, Graph};
use crate::graphs::ops::MathOperation;
use crate::port::{PortId, PortType};
use crate::property::PropertyValue;
use crate::registry::{BlockDefinition, BlockRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Class name of the vertex stage output
pub const VERTEX_OUTPUT_CLASS: &str = "VertexOutputBlock";
/// Class name of the fragment stage output
pub const FRAGMENT_OUTPUT_CLASS: &str = "FragmentOutputBlock";

/// A block class that can emit shader code
pub trait ShaderBlock: BlockDefinition {
    /// Emit the block's statements and bind its outputs.
    ///
    /// Not called when a required input is absent.
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError>;

    /// Texture capability, for blocks that sample textures
    fn as_texture_consumer(&self) -> Option<&dyn TextureConsumer> {
        None
    }
}

/// A block that samples a texture of some category
pub trait TextureConsumer {
    /// Category of the texture a block instance samples
    fn texture_category(&self, block: &Block) -> TextureCategory;
}

/// Texture referenced by a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureUsage {
    /// Sampling block
    pub block: BlockId,
    /// Texture name or URL
    pub texture: String,
    /// Texture category
    pub category: TextureCategory,
}

/// Output of [`NodeMaterial::compile`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledShader {
    /// Language of both sources
    pub language: ShaderLanguage,
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
    /// Uniforms by name, in declaration order
    pub uniforms: IndexMap<String, PortType>,
    /// Sampled textures
    pub samplers: Vec<SamplerBinding>,
    /// Defines
    pub defines: IndexMap<String, ShaderDefine>,
}

/// Create the material graph block registry with all available block classes
pub fn create_material_registry() -> BlockRegistry<dyn ShaderBlock> {
    let mut registry: BlockRegistry<dyn ShaderBlock> = BlockRegistry::new();

    // ========================================================================
    // Inputs and outputs
    // ========================================================================

    registry.register(Box::new(InputBlock));
    registry.register(Box::new(VertexOutputBlock));
    registry.register(Box::new(FragmentOutputBlock));

    // ========================================================================
    // Math
    // ========================================================================

    for operation in [
        MathOperation::Add,
        MathOperation::Subtract,
        MathOperation::Multiply,
        MathOperation::Divide,
        MathOperation::Max,
        MathOperation::Min,
    ] {
        registry.register(Box::new(ArithmeticBlock(operation)));
    }
    registry.register(Box::new(ModBlock));
    registry.register(Box::new(ClampBlock));
    registry.register(Box::new(StepBlock));
    registry.register(Box::new(SmoothStepBlock));
    registry.register(Box::new(LerpBlock));
    registry.register(Box::new(TrigonometryBlock));
    registry.register(Box::new(DotBlock));
    registry.register(Box::new(LengthBlock));

    // ========================================================================
    // Vectors and textures
    // ========================================================================

    registry.register(Box::new(VectorMergerBlock));
    registry.register(Box::new(VectorSplitterBlock));
    registry.register(Box::new(TransformBlock));
    registry.register(Box::new(TextureBlock));

    registry
}

/// A shader graph and the registry its blocks come from
pub struct NodeMaterial {
    /// Blocks and connections
    pub graph: Graph,
    registry: BlockRegistry<dyn ShaderBlock>,
    vertex_output: BlockId,
    fragment_output: BlockId,
}

impl NodeMaterial {
    /// Create a graph holding only the two stage outputs
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Graph::new(name);
        let mut vertex = Block::new(VERTEX_OUTPUT_CLASS, "VertexOutput").with_position(300.0, 0.0);
        VertexOutputBlock.register_ports(&mut vertex);
        let mut fragment =
            Block::new(FRAGMENT_OUTPUT_CLASS, "FragmentOutput").with_position(300.0, 200.0);
        FragmentOutputBlock.register_ports(&mut fragment);
        let vertex_output = graph.add_block(vertex);
        let fragment_output = graph.add_block(fragment);
        Self {
            graph,
            registry: create_material_registry(),
            vertex_output,
            fragment_output,
        }
    }

    /// Wrap an existing graph, which must contain both stage outputs
    pub fn from_graph(graph: Graph) -> Result<Self, BuildError> {
        let find = |class: &'static str| {
            graph
                .find_block(class)
                .map(|b| b.id)
                .ok_or(BuildError::MissingOutputBlock(class))
        };
        let vertex_output = find(VERTEX_OUTPUT_CLASS)?;
        let fragment_output = find(FRAGMENT_OUTPUT_CLASS)?;
        Ok(Self {
            graph,
            registry: create_material_registry(),
            vertex_output,
            fragment_output,
        })
    }

    /// The block registry
    pub fn registry(&self) -> &BlockRegistry<dyn ShaderBlock> {
        &self.registry
    }

    /// The vertex output block
    pub fn vertex_output(&self) -> BlockId {
        self.vertex_output
    }

    /// The fragment output block
    pub fn fragment_output(&self) -> BlockId {
        self.fragment_output
    }

    /// Add a block of a registered class
    pub fn add_block(&mut self, class_name: &str) -> Result<BlockId, BuildError> {
        let block = self
            .registry
            .create_block(class_name)
            .ok_or_else(|| BuildError::UnknownBlockClass(class_name.to_string()))?;
        Ok(self.graph.add_block(block))
    }

    /// Connect an output to an input by name
    pub fn connect(
        &mut self,
        from_block: BlockId,
        output: &str,
        to_block: BlockId,
        input: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        self.graph.connect_named(from_block, output, to_block, input)
    }

    /// Set a declared property
    pub fn set_property(
        &mut self,
        block_id: BlockId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BuildError> {
        let registry = &self.registry;
        self.graph
            .update_block(block_id, |block| registry.set_property(block, name, value))
            .ok_or(BuildError::BlockNotFound(block_id))??;
        Ok(())
    }

    /// Textures sampled anywhere in the graph
    pub fn texture_bindings(&self) -> Vec<TextureUsage> {
        self.graph
            .blocks()
            .filter_map(|block| {
                let consumer = self.registry.get(&block.class_name)?.as_texture_consumer()?;
                Some(TextureUsage {
                    block: block.id,
                    texture: block.property_text("texture").to_string(),
                    category: consumer.texture_category(block),
                })
            })
            .collect()
    }

    /// Generate both stages
    pub fn compile(&self, config: &RenderConfig) -> Result<CompiledShader, BuildError> {
        tracing::debug!(
            "Compiling material '{}' to {:?}",
            self.graph.name,
            config.language
        );

        let vertex_plan = BuildPlan::new(&self.graph, self.vertex_output)?;
        let mut vertex = ShaderBuildState::new(ShaderStage::Vertex, config.clone(), ProgramInterface::default());
        self.build_stage(&vertex_plan, &mut vertex)?;
        let (mut vertex, interface) = vertex.finish();

        let fragment_plan = BuildPlan::new(&self.graph, self.fragment_output)?;
        let mut fragment = ShaderBuildState::new(ShaderStage::Fragment, config.clone(), interface);
        self.build_stage(&fragment_plan, &mut fragment)?;
        let (fragment, interface) = fragment.finish();

        if vertex.result.is_none() {
            tracing::warn!(
                "Material '{}' has no vertex position, passing object space through",
                self.graph.name
            );
            vertex.attributes.insert("position".to_string(), PortType::Vector3);
            vertex.result = Some(match config.language {
                ShaderLanguage::Glsl => "vec4(position, 1.0)".to_string(),
                ShaderLanguage::Wgsl => "vec4<f32>(input.position, 1.0)".to_string(),
            });
        }

        let sources = assembly::assemble(config.language, config.precision, &interface, &vertex, &fragment);
        tracing::debug!(
            "Material '{}' compiled: {} uniforms, {} samplers",
            self.graph.name,
            interface.uniforms.len(),
            interface.samplers.len()
        );

        Ok(CompiledShader {
            language: config.language,
            vertex: sources.vertex,
            fragment: sources.fragment,
            uniforms: interface.uniforms,
            samplers: interface.samplers.into_values().collect(),
            defines: interface.defines,
        })
    }

    fn build_stage(&self, plan: &BuildPlan, state: &mut ShaderBuildState) -> Result<(), BuildError> {
        let language = state.language();
        let mut built: HashMap<PortId, Option<ShaderValue>> = HashMap::new();

        for block_id in &plan.order {
            let block = self
                .graph
                .block(*block_id)
                .ok_or(BuildError::BlockNotFound(*block_id))?;
            let definition = self
                .registry
                .get(&block.class_name)
                .ok_or_else(|| BuildError::UnknownBlockClass(block.class_name.clone()))?;

            let inputs: Vec<Option<ShaderValue>> = block
                .inputs
                .iter()
                .map(|port| match self.graph.connected_point(port.id) {
                    Some(source) => built.get(&source).cloned().flatten(),
                    None => port
                        .default_value
                        .as_ref()
                        .and_then(|v| ShaderValue::literal(v, language)),
                })
                .collect();

            let missing = block
                .inputs
                .iter()
                .zip(&inputs)
                .find(|(port, value)| !port.optional && value.is_none());
            if let Some((port, _)) = missing {
                tracing::debug!(
                    "{} ({}) has no value for input '{}', outputs left empty",
                    block.name,
                    block.class_name,
                    port.name
                );
                for output in &block.outputs {
                    built.insert(output.id, None);
                }
                continue;
            }

            let mut ctx = ShaderBlockContext::new(block, &plan.types, inputs);
            definition.build(state, &mut ctx)?;
            for (port, value) in block.outputs.iter().zip(ctx.into_outputs()) {
                built.insert(port.id, value);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn input(material: &mut NodeMaterial, properties: &[(&str, PropertyValue)]) -> BlockId {
        let id = material.add_block("InputBlock").unwrap();
        for (name, value) in properties {
            material.set_property(id, name, value.clone()).unwrap();
        }
        id
    }

    fn text(s: &str) -> PropertyValue {
        PropertyValue::Text(s.to_string())
    }

    /// position -> WVP transform -> vertex output; texture * tint -> fragment
    fn textured(material: &mut NodeMaterial) -> BlockId {
        let position = input(material, &[("mode", text("Attribute")), ("attribute", text("position"))]);
        let wvp = input(material, &[("mode", text("SystemValue"))]);
        let transform = material.add_block("TransformBlock").unwrap();
        material.connect(position, "output", transform, "vector").unwrap();
        material.connect(wvp, "output", transform, "transform").unwrap();
        let vertex_output = material.vertex_output();
        material.connect(transform, "output", vertex_output, "vector").unwrap();

        let texture = material.add_block("TextureBlock").unwrap();
        material.set_property(texture, "texture", text("albedo.png")).unwrap();
        let tint = input(
            material,
            &[
                ("mode", text("Uniform")),
                ("value", PropertyValue::Value(Value::Color3([1.0; 3]))),
            ],
        );
        let multiply = material.add_block("MultiplyBlock").unwrap();
        material.connect(texture, "rgb", multiply, "left").unwrap();
        material.connect(tint, "output", multiply, "right").unwrap();
        let fragment_output = material.fragment_output();
        material.connect(multiply, "output", fragment_output, "rgb").unwrap();
        texture
    }

    #[test]
    fn test_registry_covers_all_classes() {
        let registry = create_material_registry();
        for class in [
            "InputBlock",
            "AddBlock",
            "DivideBlock",
            "ModBlock",
            "VectorSplitterBlock",
            "TransformBlock",
            "TextureBlock",
            FRAGMENT_OUTPUT_CLASS,
            VERTEX_OUTPUT_CLASS,
        ] {
            assert!(registry.get(class).is_some(), "{class} missing");
        }
        assert_eq!(registry.definitions().count(), 21);
    }

    #[test]
    fn test_empty_material_compiles() {
        let material = NodeMaterial::new("empty");
        let shader = material.compile(&RenderConfig::default()).unwrap();
        assert!(shader.vertex.contains("in vec3 position;"));
        assert!(shader.vertex.contains("gl_Position = vec4(position, 1.0);"));
        assert!(shader.fragment.contains("fragColor = vec4(0.0, 0.0, 0.0, 1.0);"));
        assert!(shader.uniforms.is_empty());
    }

    #[test]
    fn test_compile_glsl() {
        let mut material = NodeMaterial::new("textured");
        textured(&mut material);
        let shader = material.compile(&RenderConfig::default()).unwrap();

        assert_eq!(shader.language, ShaderLanguage::Glsl);
        assert!(shader.vertex.contains("vec4 Transform = u_world_view_projection * vec4(position, 1.0);"));
        assert!(shader.vertex.contains("out vec2 v_uv;"));
        assert!(shader.vertex.contains("v_uv = uv;"));
        assert!(shader.vertex.contains("gl_Position = Transform;"));
        assert!(shader.fragment.contains("vec4 Texture = texture(t_texture, v_uv);"));
        assert!(shader.fragment.contains("vec3 Multiply = Texture.rgb * u_input;"));
        assert!(shader.fragment.contains("fragColor = vec4(Multiply, 1.0);"));
        assert_eq!(shader.uniforms.keys().collect::<Vec<_>>(), ["u_world_view_projection", "u_input"]);
        assert_eq!(shader.samplers.len(), 1);
        assert_eq!(shader.samplers[0].texture, "albedo.png");
        assert_eq!(shader.defines.get("DIFFUSE_ENABLED"), Some(&ShaderDefine::Bool(true)));
    }

    #[test]
    fn test_compile_wgsl() {
        let mut material = NodeMaterial::new("textured");
        textured(&mut material);
        let shader = material
            .compile(&RenderConfig::for_language(ShaderLanguage::Wgsl))
            .unwrap();

        assert!(shader.vertex.contains("@vertex\nfn main(input: VertexInput) -> VertexOutput {"));
        assert!(shader.vertex.contains(
            "let Transform: vec4<f32> = uniforms.u_world_view_projection * vec4<f32>(input.position, 1.0);"
        ));
        assert!(shader.vertex.contains("output.v_uv = input.uv;"));
        assert!(shader
            .fragment
            .contains("let Texture: vec4<f32> = textureSample(t_texture, s_texture, input.v_uv);"));
        assert!(shader.fragment.contains("return vec4<f32>(Multiply, 1.0);"));
        assert!(shader.fragment.contains("@group(0) @binding(1) var t_texture: texture_2d<f32>;"));
        assert!(shader.fragment.contains("@group(0) @binding(2) var s_texture: sampler;"));
    }

    #[test]
    fn test_disabled_texture_category() {
        let mut material = NodeMaterial::new("textured");
        textured(&mut material);
        let mut config = RenderConfig::default();
        config.textures.set(TextureCategory::Diffuse, false);
        let shader = material.compile(&config).unwrap();
        assert!(shader.samplers.is_empty());
        assert!(shader.fragment.contains("#define DIFFUSE_ENABLED 0"));
        assert!(shader.fragment.contains("vec3 Multiply = vec3(1.0) * u_input;"));
    }

    #[test]
    fn test_same_named_uniform_inputs_stay_distinct() {
        let mut material = NodeMaterial::new("uniforms");
        let uniform = |value: f64| {
            [
                ("mode", text("Uniform")),
                ("value", PropertyValue::Value(Value::Float(value))),
            ]
        };
        let low = input(&mut material, &uniform(0.25));
        let high = input(&mut material, &uniform(0.75));
        let add = material.add_block("AddBlock").unwrap();
        material.connect(low, "output", add, "left").unwrap();
        material.connect(high, "output", add, "right").unwrap();
        let fragment_output = material.fragment_output();
        material.connect(add, "output", fragment_output, "a").unwrap();

        let shader = material.compile(&RenderConfig::default()).unwrap();
        assert_eq!(shader.uniforms.len(), 2);
        assert!(shader.uniforms.contains_key("u_input"));
        assert!(shader.uniforms.contains_key("u_input1"));
        assert!(shader.fragment.contains("u_input + u_input1"));
    }

    #[test]
    fn test_texture_bindings() {
        let mut material = NodeMaterial::new("textured");
        let texture = textured(&mut material);
        material.set_property(texture, "category", text("Emissive")).unwrap();
        let bindings = material.texture_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].block, texture);
        assert_eq!(bindings[0].category, TextureCategory::Emissive);
        assert_eq!(bindings[0].texture, "albedo.png");
    }

    #[test]
    fn test_shared_block_builds_in_both_stages() {
        let mut material = NodeMaterial::new("shared");
        let time = input(
            &mut material,
            &[("mode", text("SystemValue")), ("system_value", text("Time"))],
        );
        let merger = material.add_block("VectorMergerBlock").unwrap();
        material.connect(time, "output", merger, "x").unwrap();
        let (vertex_output, fragment_output) = (material.vertex_output(), material.fragment_output());
        material.connect(merger, "xyzw", vertex_output, "vector").unwrap();
        material.connect(merger, "xyzw", fragment_output, "rgba").unwrap();

        let shader = material.compile(&RenderConfig::default()).unwrap();
        assert!(shader.vertex.contains("vec4 VectorMerger = vec4(u_time, 0.0, 0.0, 0.0);"));
        assert!(shader.fragment.contains("vec4 VectorMerger = vec4(u_time, 0.0, 0.0, 0.0);"));
        assert_eq!(shader.uniforms.len(), 1);
    }

    #[test]
    fn test_missing_output_block() {
        let graph = Graph::new("bare");
        assert!(matches!(
            NodeMaterial::from_graph(graph),
            Err(BuildError::MissingOutputBlock(VERTEX_OUTPUT_CLASS))
        ));
    }
}
