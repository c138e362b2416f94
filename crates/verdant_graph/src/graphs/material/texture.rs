// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture sampling.

use super::state::{float_literal, splat, ShaderBlockContext, ShaderBuildState, ShaderDefine, ShaderValue};
use super::{ShaderBlock, TextureConsumer};
use crate::block::{Block, BlockCategory};
use crate::config::TextureCategory;
use crate::evaluation::BuildError;
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind};
use crate::registry::BlockDefinition;

const TEXTURE_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("texture", PropertyKind::Text, PropertyDefault::Text("")),
    PropertyDescriptor::new(
        "category",
        PropertyKind::Choice(TextureCategory::NAMES),
        PropertyDefault::Text("Diffuse"),
    ),
    PropertyDescriptor::new("convert_to_linear", PropertyKind::Bool, PropertyDefault::Bool(false)),
];

const CHANNELS: [(&str, &str, PortType); 5] = [
    ("rgb", ".rgb", PortType::Color3),
    ("r", ".r", PortType::Float),
    ("g", ".g", PortType::Float),
    ("b", ".b", PortType::Float),
    ("a", ".a", PortType::Float),
];

/// Samples a texture at `uv` (the mesh uv when unconnected).
///
/// When the block's category is switched off in the render configuration
/// the outputs are neutral white and nothing is sampled.
pub struct TextureBlock;

impl BlockDefinition for TextureBlock {
    fn class_name(&self) -> &'static str {
        "TextureBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Texture
    }

    fn description(&self) -> &'static str {
        "Sample a 2D texture"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TEXTURE_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_input("uv", PortType::Vector2, true, None);
        block.register_output("rgba", PortType::Color4);
        for (name, _, port_type) in CHANNELS {
            block.register_output(name, port_type);
        }
    }
}

impl TextureConsumer for TextureBlock {
    fn texture_category(&self, block: &Block) -> TextureCategory {
        TextureCategory::from_name(block.property_text("category")).unwrap_or_default()
    }
}

impl ShaderBlock for TextureBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let category = self.texture_category(block);
        let define = format!("{}_ENABLED", category.name().to_uppercase());
        let language = state.language();

        if !state.config().textures.is_enabled(category) {
            state.define(&define, ShaderDefine::Bool(false));
            let one = float_literal(1.0);
            ctx.set("rgba", ShaderValue::new(splat(language, PortType::Color4, &one), PortType::Color4))?;
            for (name, _, port_type) in CHANNELS {
                ctx.set(name, ShaderValue::new(splat(language, port_type, &one), port_type))?;
            }
            return Ok(());
        }
        state.define(&define, ShaderDefine::Bool(true));

        let uv = match ctx.input("uv") {
            Some(uv) => uv,
            None => state.attribute("uv", PortType::Vector2),
        };
        let sampler = state.sampler(block, block.property_text("texture"), category);
        let mut sample = state.texture_sample(&sampler, &uv.expr);
        if block.property_bool("convert_to_linear", false) {
            let function = state.to_linear_function();
            sample = format!("{function}({sample})");
        }
        let color = state.declare(&block.name, PortType::Color4, &sample);

        for (name, swizzle, port_type) in CHANNELS {
            ctx.set(name, ShaderValue::new(format!("{}{swizzle}", color.expr), port_type))?;
        }
        ctx.set("rgba", color)
    }

    fn as_texture_consumer(&self) -> Option<&dyn TextureConsumer> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenderConfig, ShaderLanguage};
    use crate::graphs::material::state::{ProgramInterface, ShaderStage};
    use crate::property::PropertyValue;
    use crate::types::ResolvedTypes;

    fn texture_block(category: &str, linear: bool) -> Block {
        let mut block = Block::new("TextureBlock", "Albedo");
        for descriptor in TextureBlock.properties() {
            block
                .properties
                .insert(descriptor.name.to_string(), descriptor.default.to_value());
        }
        block
            .properties
            .insert("category".into(), PropertyValue::Text(category.into()));
        block
            .properties
            .insert("texture".into(), PropertyValue::Text("albedo.dds".into()));
        block
            .properties
            .insert("convert_to_linear".into(), PropertyValue::Bool(linear));
        TextureBlock.register_ports(&mut block);
        block
    }

    #[test]
    fn test_samples_with_default_uv() {
        let block = texture_block("Diffuse", true);
        let mut state = ShaderBuildState::new(
            ShaderStage::Fragment,
            RenderConfig::for_language(ShaderLanguage::Wgsl),
            ProgramInterface::default(),
        );
        let types = ResolvedTypes::default();
        let mut ctx = ShaderBlockContext::new(&block, &types, vec![None]);
        TextureBlock.build(&mut state, &mut ctx).unwrap();
        let outputs = ctx.into_outputs();
        assert_eq!(outputs[0].as_ref().unwrap().expr, "Albedo");
        assert_eq!(outputs[1].as_ref().unwrap().expr, "Albedo.rgb");

        let (stage, interface) = state.finish();
        assert_eq!(
            stage.body.trim(),
            "let Albedo: vec4<f32> = to_linear_space(textureSample(t_albedo, s_albedo, input.v_uv));"
        );
        assert!(stage.varyings.contains_key("v_uv"));
        assert_eq!(stage.functions.len(), 1);
        assert_eq!(interface.defines.get("DIFFUSE_ENABLED"), Some(&ShaderDefine::Bool(true)));
        let binding = interface.samplers.get(&block.id).unwrap();
        assert_eq!(binding.texture, "albedo.dds");
        assert_eq!(binding.category, TextureCategory::Diffuse);
    }

    #[test]
    fn test_disabled_category_is_white() {
        let block = texture_block("Bump", false);
        let mut config = RenderConfig::default();
        config.textures.set(TextureCategory::Bump, false);
        let mut state = ShaderBuildState::new(ShaderStage::Fragment, config, ProgramInterface::default());
        let types = ResolvedTypes::default();
        let mut ctx = ShaderBlockContext::new(&block, &types, vec![None]);
        TextureBlock.build(&mut state, &mut ctx).unwrap();
        let outputs = ctx.into_outputs();
        assert_eq!(outputs[0].as_ref().unwrap().expr, "vec4(1.0)");
        assert_eq!(outputs[2].as_ref().unwrap().expr, "1.0");

        let (stage, interface) = state.finish();
        assert!(stage.body.is_empty());
        assert!(interface.samplers.is_empty());
        assert_eq!(interface.defines.get("BUMP_ENABLED"), Some(&ShaderDefine::Bool(false)));
    }
}
