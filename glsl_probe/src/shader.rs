use std::fmt;

use glow::HasContext;

use crate::context::GraphicsContext;
use crate::diagnostics::{DiagnosticsSink, Level};
use crate::source::ShaderSource;
use crate::ContextError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader source is empty or missing")]
    EmptySource { stage: ShaderStage },
    #[error("failed to create {what}: {message}")]
    Create { what: &'static str, message: String },
    #[error("failed to compile {stage} shader")]
    Compile { stage: ShaderStage, log: String },
    #[error("program needs exactly one vertex and one fragment shader before linking")]
    IncompleteProgram,
    #[error("program link failed")]
    Link { log: String },
}

impl ShaderError {
    /// Driver info log attached to a compile or link failure.
    pub fn log(&self) -> Option<&str> {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => Some(log),
            _ => None,
        }
    }
}

/// A shader object that compiled successfully. Deleted on drop.
pub struct CompiledShader<'a> {
    gl: &'a glow::Context,
    shader: glow::Shader,
    stage: ShaderStage,
}

impl Drop for CompiledShader<'_> {
    fn drop(&mut self) {
        log::trace!("deleting {} shader", self.stage);
        unsafe { self.gl.delete_shader(self.shader) };
    }
}

impl CompiledShader<'_> {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn raw(&self) -> glow::Shader {
        self.shader
    }
}

/// A program object and the stages attached to it. Deleted on drop whether
/// or not it linked.
pub struct ProgramObject<'a> {
    gl: &'a glow::Context,
    program: glow::Program,
    attached: Vec<ShaderStage>,
}

impl Drop for ProgramObject<'_> {
    fn drop(&mut self) {
        log::trace!("deleting program");
        unsafe { self.gl.delete_program(self.program) };
    }
}

impl<'a> ProgramObject<'a> {
    pub fn attach(&mut self, shader: &CompiledShader<'a>) {
        unsafe { self.gl.attach_shader(self.program, shader.raw()) };
        self.attached.push(shader.stage());
    }

    pub fn raw(&self) -> glow::Program {
        self.program
    }

    fn is_complete(&self) -> bool {
        let count = |stage| self.attached.iter().filter(|s| **s == stage).count();

        self.attached.len() == 2
            && count(ShaderStage::Vertex) == 1
            && count(ShaderStage::Fragment) == 1
    }
}

/// Compiles and links through the GLES context that is current on this
/// thread.
pub struct ShaderCompiler<'a> {
    gl: &'a glow::Context,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a> ShaderCompiler<'a> {
    pub fn new(
        context: &'a GraphicsContext,
        sink: &'a dyn DiagnosticsSink,
    ) -> Result<Self, ContextError> {
        Ok(Self {
            gl: context.gl()?,
            sink,
        })
    }

    pub fn compile(
        &self,
        stage: ShaderStage,
        source: &ShaderSource,
    ) -> Result<CompiledShader<'a>, ShaderError> {
        if source.is_empty() {
            return Err(ShaderError::EmptySource { stage });
        }

        let shader = unsafe { self.gl.create_shader(stage.gl_type()) }
            .map_err(|message| self.create_failed("shader object", message))?;
        let shader = CompiledShader {
            gl: self.gl,
            shader,
            stage,
        };

        let (compiled, log) = unsafe {
            self.gl.shader_source(shader.raw(), &source.text());
            self.gl.compile_shader(shader.raw());

            (
                self.gl.get_shader_compile_status(shader.raw()),
                self.gl.get_shader_info_log(shader.raw()),
            )
        };

        // Drivers warn on successful compiles too, so the log is always shown.
        if !log.trim().is_empty() {
            self.sink.report(
                log_level(compiled),
                &format!("Shader compile log:\n{}", log.trim_end()),
            );
        }

        if !compiled {
            self.sink.error("Failed to compile shader");
            return Err(ShaderError::Compile { stage, log });
        }

        log::debug!("{stage} shader compiled from {}", source.path().display());

        Ok(shader)
    }

    pub fn create_program(&self) -> Result<ProgramObject<'a>, ShaderError> {
        let program = unsafe { self.gl.create_program() }
            .map_err(|message| self.create_failed("program object", message))?;

        Ok(ProgramObject {
            gl: self.gl,
            program,
            attached: Vec::with_capacity(2),
        })
    }

    fn create_failed(&self, what: &'static str, message: String) -> ShaderError {
        let err = ShaderError::Create { what, message };
        self.sink.error(&err.to_string());
        err
    }

    /// Links a program that already has its vertex and fragment shader
    /// attached. The program object stays owned by the caller either way.
    pub fn link(&self, program: &ProgramObject<'a>) -> Result<(), ShaderError> {
        if !program.is_complete() {
            return Err(ShaderError::IncompleteProgram);
        }

        let (linked, log) = unsafe {
            self.gl.link_program(program.raw());

            (
                self.gl.get_program_link_status(program.raw()),
                self.gl.get_program_info_log(program.raw()),
            )
        };

        if !log.trim().is_empty() {
            self.sink.report(
                log_level(linked),
                &format!("Program link log:\n{}", log.trim_end()),
            );
        }

        if !linked {
            self.sink.error("Program link failed");
            return Err(ShaderError::Link { log });
        }

        log::debug!("program linked");

        Ok(())
    }
}

fn log_level(succeeded: bool) -> Level {
    if succeeded {
        Level::Info
    } else {
        Level::Error
    }
}
