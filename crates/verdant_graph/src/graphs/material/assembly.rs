// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turns built stages into complete GLSL ES 3.00 or WGSL sources.

use super::state::{float_literal, type_name, ProgramInterface, ShaderDefine, StageOutput};
use crate::config::{Precision, ShaderLanguage};
use crate::port::PortType;
use indexmap::IndexMap;

/// Vertex and fragment sources
pub(crate) struct Sources {
    pub vertex: String,
    pub fragment: String,
}

/// Attributes the vertex stage must read: its own plus the sources of
/// every varying the fragment stage consumes
fn vertex_attributes(vertex: &StageOutput, fragment: &StageOutput) -> IndexMap<String, PortType> {
    let mut attributes = vertex.attributes.clone();
    for (varying, port_type) in &fragment.varyings {
        let attribute = varying.trim_start_matches("v_");
        attributes.entry(attribute.to_string()).or_insert(*port_type);
    }
    attributes
}

pub(crate) fn assemble(
    language: ShaderLanguage,
    precision: Precision,
    interface: &ProgramInterface,
    vertex: &StageOutput,
    fragment: &StageOutput,
) -> Sources {
    match language {
        ShaderLanguage::Glsl => Sources {
            vertex: glsl_vertex(precision, interface, vertex, fragment),
            fragment: glsl_fragment(precision, interface, fragment),
        },
        ShaderLanguage::Wgsl => Sources {
            vertex: wgsl_vertex(interface, vertex, fragment),
            fragment: wgsl_fragment(interface, fragment),
        },
    }
}

// ============================================================================
// GLSL ES 3.00
// ============================================================================

fn glsl_header(precision: Precision, interface: &ProgramInterface) -> String {
    let mut out = String::from("#version 300 es\n");
    out.push_str(&format!("precision {} float;\n", precision.glsl_qualifier()));
    if !interface.defines.is_empty() {
        out.push('\n');
    }
    for (name, value) in &interface.defines {
        let value = match value {
            ShaderDefine::Bool(b) => u8::from(*b).to_string(),
            ShaderDefine::Int(i) => i.to_string(),
            ShaderDefine::Float(f) => float_literal(*f),
        };
        out.push_str(&format!("#define {name} {value}\n"));
    }
    if !interface.uniforms.is_empty() || !interface.samplers.is_empty() {
        out.push('\n');
    }
    for (name, port_type) in &interface.uniforms {
        out.push_str(&format!("uniform {} {name};\n", type_name(ShaderLanguage::Glsl, *port_type)));
    }
    for binding in interface.samplers.values() {
        out.push_str(&format!("uniform sampler2D {};\n", binding.name));
    }
    out
}

fn push_functions(out: &mut String, stage: &StageOutput) {
    for function in &stage.functions {
        out.push('\n');
        out.push_str(function);
    }
}

fn glsl_vertex(
    precision: Precision,
    interface: &ProgramInterface,
    vertex: &StageOutput,
    fragment: &StageOutput,
) -> String {
    let mut out = glsl_header(precision, interface);
    let attributes = vertex_attributes(vertex, fragment);
    if !attributes.is_empty() {
        out.push('\n');
    }
    for (name, port_type) in &attributes {
        out.push_str(&format!("in {} {name};\n", type_name(ShaderLanguage::Glsl, *port_type)));
    }
    for (name, port_type) in &fragment.varyings {
        out.push_str(&format!("out {} {name};\n", type_name(ShaderLanguage::Glsl, *port_type)));
    }
    push_functions(&mut out, vertex);

    out.push_str("\nvoid main() {\n");
    out.push_str(&vertex.body);
    for name in fragment.varyings.keys() {
        out.push_str(&format!("    {name} = {};\n", name.trim_start_matches("v_")));
    }
    if let Some(result) = &vertex.result {
        out.push_str(&format!("    gl_Position = {result};\n"));
    }
    out.push_str("}\n");
    out
}

fn glsl_fragment(precision: Precision, interface: &ProgramInterface, fragment: &StageOutput) -> String {
    let mut out = glsl_header(precision, interface);
    out.push('\n');
    for (name, port_type) in &fragment.varyings {
        out.push_str(&format!("in {} {name};\n", type_name(ShaderLanguage::Glsl, *port_type)));
    }
    out.push_str("out vec4 fragColor;\n");
    push_functions(&mut out, fragment);

    out.push_str("\nvoid main() {\n");
    out.push_str(&fragment.body);
    if let Some(result) = &fragment.result {
        out.push_str(&format!("    fragColor = {result};\n"));
    }
    out.push_str("}\n");
    out
}

// ============================================================================
// WGSL
// ============================================================================

fn wgsl_header(interface: &ProgramInterface) -> String {
    let mut out = String::new();
    for (name, value) in &interface.defines {
        let (ty, value) = match value {
            ShaderDefine::Bool(b) => ("bool", b.to_string()),
            ShaderDefine::Int(i) => ("i32", i.to_string()),
            ShaderDefine::Float(f) => ("f32", float_literal(*f)),
        };
        out.push_str(&format!("const {name}: {ty} = {value};\n"));
    }

    let mut binding = 0;
    if !interface.uniforms.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("struct Uniforms {\n");
        for (name, port_type) in &interface.uniforms {
            out.push_str(&format!("    {name}: {},\n", type_name(ShaderLanguage::Wgsl, *port_type)));
        }
        out.push_str("}\n\n");
        out.push_str(&format!("@group(0) @binding({binding}) var<uniform> uniforms: Uniforms;\n"));
        binding += 1;
    }
    for sampler in interface.samplers.values() {
        let suffix = &sampler.name[2..];
        out.push_str(&format!("@group(0) @binding({binding}) var {}: texture_2d<f32>;\n", sampler.name));
        out.push_str(&format!("@group(0) @binding({}) var s_{suffix}: sampler;\n", binding + 1));
        binding += 2;
    }
    out
}

fn wgsl_struct(out: &mut String, name: &str, fields: &[String]) {
    out.push_str(&format!("\nstruct {name} {{\n"));
    for field in fields {
        out.push_str(&format!("    {field},\n"));
    }
    out.push_str("}\n");
}

fn wgsl_varyings(varyings: &IndexMap<String, PortType>) -> Vec<String> {
    varyings
        .iter()
        .enumerate()
        .map(|(location, (name, port_type))| {
            format!("@location({location}) {name}: {}", type_name(ShaderLanguage::Wgsl, *port_type))
        })
        .collect()
}

fn wgsl_vertex(interface: &ProgramInterface, vertex: &StageOutput, fragment: &StageOutput) -> String {
    let mut out = wgsl_header(interface);
    let attributes = vertex_attributes(vertex, fragment);
    if !attributes.is_empty() {
        let fields: Vec<String> = attributes
            .iter()
            .enumerate()
            .map(|(location, (name, port_type))| {
                format!("@location({location}) {name}: {}", type_name(ShaderLanguage::Wgsl, *port_type))
            })
            .collect();
        wgsl_struct(&mut out, "VertexInput", &fields);
    }
    let mut fields = vec!["@builtin(position) clip_position: vec4<f32>".to_string()];
    fields.extend(wgsl_varyings(&fragment.varyings));
    wgsl_struct(&mut out, "VertexOutput", &fields);
    push_functions(&mut out, vertex);

    let parameters = if attributes.is_empty() { "" } else { "input: VertexInput" };
    out.push_str(&format!("\n@vertex\nfn main({parameters}) -> VertexOutput {{\n"));
    out.push_str("    var output: VertexOutput;\n");
    out.push_str(&vertex.body);
    for name in fragment.varyings.keys() {
        out.push_str(&format!("    output.{name} = input.{};\n", name.trim_start_matches("v_")));
    }
    if let Some(result) = &vertex.result {
        out.push_str(&format!("    output.clip_position = {result};\n"));
    }
    out.push_str("    return output;\n}\n");
    out
}

fn wgsl_fragment(interface: &ProgramInterface, fragment: &StageOutput) -> String {
    let mut out = wgsl_header(interface);
    if !fragment.varyings.is_empty() {
        wgsl_struct(&mut out, "FragmentInput", &wgsl_varyings(&fragment.varyings));
    }
    push_functions(&mut out, fragment);

    let parameters = if fragment.varyings.is_empty() { "" } else { "input: FragmentInput" };
    out.push_str(&format!("\n@fragment\nfn main({parameters}) -> @location(0) vec4<f32> {{\n"));
    out.push_str(&fragment.body);
    if let Some(result) = &fragment.result {
        out.push_str(&format!("    return {result};\n"));
    }
    out.push_str("}\n");
    out
}
