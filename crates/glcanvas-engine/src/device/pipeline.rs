//! Fallback texture-blit pipeline.
//!
//! A full-screen triangle strip plus a pass-through program that samples one
//! 2D texture. Built against whatever context is current; every failure path
//! deletes what was created before it.

use std::fmt;

use bytemuck::{Pod, Zeroable};

use super::current::CurrentContext;
use super::driver::{Driver, GlApi, ShaderStage};
use super::error::{GpuError, Result, StepExt};

// ── geometry ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BlitVertex {
    pub position: [f32; 4],
    pub tex_coord: [f32; 2],
}

/// Full NDC quad as a triangle strip, texture coordinates 0..1.
pub const QUAD_VERTICES: [BlitVertex; 4] = [
    BlitVertex { position: [-1.0, -1.0, 0.0, 1.0], tex_coord: [0.0, 0.0] },
    BlitVertex { position: [1.0, -1.0, 0.0, 1.0], tex_coord: [1.0, 0.0] },
    BlitVertex { position: [-1.0, 1.0, 0.0, 1.0], tex_coord: [0.0, 1.0] },
    BlitVertex { position: [1.0, 1.0, 0.0, 1.0], tex_coord: [1.0, 1.0] },
];

// ── shaders ───────────────────────────────────────────────────────────────

pub const VERTEX_SHADER: &str = "\
attribute vec4 aPosition;
attribute vec4 aTexCoord;
varying vec2 vTexCoord;
void main() {
    gl_Position = aPosition;
    vTexCoord = aTexCoord.xy;
}
";

pub const FRAGMENT_SHADER: &str = "\
precision mediump float;
uniform sampler2D uTexture;
varying vec2 vTexCoord;
void main() {
    gl_FragColor = texture2D(uTexture, vTexCoord);
}
";

pub const POSITION_ATTRIBUTE: &str = "aPosition";
pub const TEX_COORD_ATTRIBUTE: &str = "aTexCoord";

// ── pipeline ──────────────────────────────────────────────────────────────

/// Linked blit program and its vertex buffer.
///
/// Only usable while the context it was built on is current.
pub struct ShaderPipeline<G: GlApi> {
    pub vertex_buffer: G::Buffer,
    pub program: G::Program,
    pub a_position: u32,
    pub a_tex_coord: u32,
}

impl<G: GlApi> ShaderPipeline<G> {
    /// Deletes the program and the vertex buffer.
    pub(crate) fn release(self, gl: &G) {
        gl.use_program(None);
        gl.delete_program(self.program);
        gl.delete_buffer(self.vertex_buffer);
    }
}

impl<G: GlApi> fmt::Debug for ShaderPipeline<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderPipeline")
            .field("vertex_buffer", &self.vertex_buffer)
            .field("program", &self.program)
            .field("a_position", &self.a_position)
            .field("a_tex_coord", &self.a_tex_coord)
            .finish()
    }
}

pub struct PipelineFactory;

impl PipelineFactory {
    pub fn create<D: Driver>(current: &CurrentContext<'_, D>) -> Result<ShaderPipeline<D>> {
        let gl = current.driver()?;

        // An earlier failed build can leave the sticky flag set.
        while let Some(code) = gl.take_error() {
            log::debug!("discarding stale GL error 0x{code:04x}");
        }

        let vertex_buffer = gl
            .create_vertex_buffer(bytemuck::cast_slice(&QUAD_VERTICES))
            .shader_step("failed to allocate vertex buffer")?;

        match link_program(gl) {
            Ok((program, a_position, a_tex_coord)) => {
                log::debug!("blit pipeline ready (program {program:?})");
                Ok(ShaderPipeline {
                    vertex_buffer,
                    program,
                    a_position,
                    a_tex_coord,
                })
            }
            Err(err) => {
                gl.delete_buffer(vertex_buffer);
                Err(err)
            }
        }
    }
}

fn compile<G: GlApi>(gl: &G, stage: ShaderStage, source: &str) -> Result<G::Shader> {
    let step = match stage {
        ShaderStage::Vertex => "failed to compile vertex shader",
        ShaderStage::Fragment => "failed to compile fragment shader",
    };
    let shader = gl.create_shader(stage).shader_step(step)?;
    if let Err(err) = gl.compile_shader(shader, source) {
        gl.delete_shader(shader);
        return Err(GpuError::Shader { step, source: Some(err) });
    }
    Ok(shader)
}

/// Compiles both stages, links them and resolves the attribute locations.
///
/// The shader objects are always deleted before returning; the program is
/// deleted unless it is returned.
fn link_program<G: GlApi>(gl: &G) -> Result<(G::Program, u32, u32)> {
    let vertex = compile(gl, ShaderStage::Vertex, VERTEX_SHADER)?;
    let fragment = match compile(gl, ShaderStage::Fragment, FRAGMENT_SHADER) {
        Ok(shader) => shader,
        Err(err) => {
            gl.delete_shader(vertex);
            return Err(err);
        }
    };

    let program = match gl.create_program() {
        Ok(program) => program,
        Err(err) => {
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            return Err(GpuError::Shader { step: "failed to create program", source: Some(err) });
        }
    };

    let mut attached = Vec::with_capacity(2);
    let linked = configure(gl, program, vertex, fragment, &mut attached);

    for shader in attached {
        gl.detach_shader(program, shader);
    }
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    match linked {
        Ok((a_position, a_tex_coord)) => Ok((program, a_position, a_tex_coord)),
        Err(err) => {
            gl.use_program(None);
            gl.delete_program(program);
            Err(err)
        }
    }
}

fn configure<G: GlApi>(
    gl: &G,
    program: G::Program,
    vertex: G::Shader,
    fragment: G::Shader,
    attached: &mut Vec<G::Shader>,
) -> Result<(u32, u32)> {
    gl.attach_shader(program, vertex)
        .shader_step("failed to attach vertex shader")?;
    attached.push(vertex);
    gl.attach_shader(program, fragment)
        .shader_step("failed to attach fragment shader")?;
    attached.push(fragment);
    gl.link_program(program).shader_step("failed to link program")?;

    gl.use_program(Some(program));
    let a_position = gl
        .attrib_location(program, POSITION_ATTRIBUTE)
        .shader_step("failed to resolve aPosition")?;
    let a_tex_coord = gl
        .attrib_location(program, TEX_COORD_ATTRIBUTE)
        .shader_step("failed to resolve aTexCoord")?;
    gl.set_unpack_alignment(1);

    if let Some(code) = gl.take_error() {
        log::warn!("GL error 0x{code:04x} while configuring blit program");
        return Err(GpuError::shader("failed to configure program"));
    }
    Ok((a_position, a_tex_coord))
}
