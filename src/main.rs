use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Error};
use clap::error::ErrorKind;
use clap::Parser;
use glsl_probe::{
    CompiledShader, ConsoleSink, ContextStrategy, DiagnosticsSink, GraphicsContext, PbufferSize,
    ProbeConfig, ShaderCompiler, ShaderError, ShaderSource, ShaderStage,
};

use crate::logging::{init_logging, LoggingConfig};

mod logging;

const USAGE: &str = concat!(
    "[error]: usage is: ",
    env!("CARGO_BIN_NAME"),
    " <vertex.glsl> <fragment.glsl>"
);

/// Compiles and links a vertex/fragment shader pair on an offscreen GLES
/// context and reports what the driver says about it.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Vertex shader source file
    vertex: PathBuf,

    /// Fragment shader source file
    fragment: PathBuf,

    /// Make the context current without any surface (EGL_KHR_surfaceless_context)
    #[arg(long, conflicts_with = "pbuffer_size")]
    surfaceless: bool,

    /// Size of the dummy pbuffer the context is made current with
    #[arg(long, value_name = "WxH")]
    pbuffer_size: Option<PbufferSize>,

    /// Print every EGL config the display offers (same as setting SHOW_CONFIGS)
    #[arg(long)]
    show_configs: bool,

    /// Treat an unreadable shader file as an error instead of an empty source
    #[arg(long)]
    strict_sources: bool,

    /// Log driver and context details
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn probe_config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::from_env();

        if self.surfaceless {
            config = config.with_strategy(ContextStrategy::Surfaceless);
        } else if let Some(PbufferSize { width, height }) = self.pbuffer_size {
            config = config.with_strategy(ContextStrategy::PbufferBacked { width, height });
        }

        config.show_configs |= self.show_configs;
        config
    }

    fn load(&self, path: &Path, sink: &dyn DiagnosticsSink) -> Result<ShaderSource, Error> {
        if self.strict_sources {
            Ok(ShaderSource::load_strict(path, sink)?)
        } else {
            Ok(ShaderSource::load(path, sink))
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage(err),
    };

    init_logging(LoggingConfig::verbose(cli.verbose));

    match run(&cli, &ConsoleSink) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Already reported where it happened.
            log::debug!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn usage(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("{USAGE}");
            let _ = err.print();
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli, sink: &dyn DiagnosticsSink) -> Result<(), Error> {
    let mut context = GraphicsContext::new(cli.probe_config());
    context.initialize(sink)?;

    let vertex_source = cli.load(&cli.vertex, sink)?;
    let fragment_source = cli.load(&cli.fragment, sink)?;

    let compiler = ShaderCompiler::new(&context, sink)?;

    sink.info("Compiling vertex shader...");
    let vertex = compile(&compiler, ShaderStage::Vertex, &vertex_source, sink)?;

    sink.info("Compiling fragment shader...");
    let fragment = compile(&compiler, ShaderStage::Fragment, &fragment_source, sink)?;

    // Shaders, program and context are released in reverse order on every
    // return path from here on.
    let mut program = compiler.create_program()?;
    program.attach(&vertex);
    program.attach(&fragment);

    compiler.link(&program)?;

    Ok(())
}

fn compile<'a>(
    compiler: &ShaderCompiler<'a>,
    stage: ShaderStage,
    source: &ShaderSource,
    sink: &dyn DiagnosticsSink,
) -> Result<CompiledShader<'a>, Error> {
    compiler
        .compile(stage, source)
        .inspect_err(|err| report_empty_source(err, sink))
        .with_context(|| format!("checking '{}'", source.path().display()))
}

// The compiler turns an empty source away silently; every other failure has
// been reported by the time it returns.
fn report_empty_source(err: &ShaderError, sink: &dyn DiagnosticsSink) {
    if let ShaderError::EmptySource { .. } = err {
        sink.error(&format!("[error] {err}"));
    }
}
