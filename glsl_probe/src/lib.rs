//! Offscreen GLES shader checking.
//!
//! [`GraphicsContext`] brings up an EGL display and a GLES context without a
//! window, [`ShaderCompiler`] compiles and links shader sources through it,
//! and every message meant for a person goes to a [`DiagnosticsSink`].

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod egl;
pub mod shader;
pub mod source;

pub use config::{ContextStrategy, PbufferSize, ProbeConfig, SHOW_CONFIGS_ENV};
pub use context::{ContextError, ContextState, GraphicsContext};
pub use diagnostics::{ConsoleSink, DiagnosticsSink, Level, RecordingSink};
pub use shader::{CompiledShader, ProgramObject, ShaderCompiler, ShaderError, ShaderStage};
pub use source::{ShaderSource, SourceError};
