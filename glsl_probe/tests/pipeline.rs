//! These need an EGL driver. Without one the context fails to come up and
//! each test returns early. `EGL_PLATFORM` defaults to Mesa's surfaceless
//! platform so a headless host still gets a display.

use std::sync::{Mutex, MutexGuard, Once};

use glsl_probe::egl::GlesLibrary;
use glsl_probe::{
    ContextError, ContextState, ContextStrategy, GraphicsContext, Level, ProbeConfig,
    RecordingSink, ShaderCompiler, ShaderError, ShaderSource, ShaderStage,
};

const COLOR_VERT: &str = include_str!("shaders/color.vert");
const COLOR_FRAG: &str = include_str!("shaders/color.frag");
const SYNTAX_ERROR_VERT: &str = include_str!("shaders/syntax_error.vert");
const MISMATCHED_FRAG: &str = include_str!("shaders/mismatched.frag");

// Every context shares the default display, and tearing one down terminates
// it for all of them.
static DISPLAY: Mutex<()> = Mutex::new(());
static PLATFORM: Once = Once::new();

fn exclusive_display() -> MutexGuard<'static, ()> {
    let guard = DISPLAY.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    // Set while holding the lock, before any display is opened.
    PLATFORM.call_once(|| {
        if std::env::var_os("EGL_PLATFORM").is_none() {
            std::env::set_var("EGL_PLATFORM", "surfaceless");
        }
    });

    guard
}

fn context_or_skip(config: ProbeConfig) -> Option<GraphicsContext> {
    let mut context = GraphicsContext::new(config);

    match context.initialize(&RecordingSink::new()) {
        Ok(()) => Some(context),
        Err(err) => {
            eprintln!("skipping, no GLES context: {err}");
            None
        }
    }
}

fn source(name: &str, text: &str) -> ShaderSource {
    ShaderSource::from_text(name, text)
}

#[test]
fn valid_pair_links() {
    let _display = exclusive_display();
    let Some(context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };
    assert_eq!(context.state(), ContextState::Ready);

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();

    let vertex = compiler
        .compile(ShaderStage::Vertex, &source("color.vert", COLOR_VERT))
        .unwrap();
    let fragment = compiler
        .compile(ShaderStage::Fragment, &source("color.frag", COLOR_FRAG))
        .unwrap();

    let mut program = compiler.create_program().unwrap();
    program.attach(&vertex);
    program.attach(&fragment);
    compiler.link(&program).unwrap();

    assert!(!sink.contains(Level::Error, "Program link failed"));
    assert!(!sink.contains(Level::Error, "Failed to compile shader"));
}

#[test]
fn syntax_error_reports_log() {
    let _display = exclusive_display();
    let Some(context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();

    let err = compiler
        .compile(ShaderStage::Vertex, &source("bad.vert", SYNTAX_ERROR_VERT))
        .err()
        .unwrap();

    assert!(matches!(
        err,
        ShaderError::Compile {
            stage: ShaderStage::Vertex,
            ..
        }
    ));
    assert!(sink.contains(Level::Error, "Failed to compile shader"));
}

#[test]
fn mismatched_interface_fails_link() {
    let _display = exclusive_display();
    let Some(context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();

    let vertex = compiler
        .compile(ShaderStage::Vertex, &source("color.vert", COLOR_VERT))
        .unwrap();
    let fragment = compiler
        .compile(
            ShaderStage::Fragment,
            &source("mismatched.frag", MISMATCHED_FRAG),
        )
        .unwrap();

    let mut program = compiler.create_program().unwrap();
    program.attach(&vertex);
    program.attach(&fragment);

    assert!(matches!(
        compiler.link(&program),
        Err(ShaderError::Link { .. })
    ));
    assert!(sink.contains(Level::Error, "Program link failed"));
}

#[test]
fn empty_source_creates_nothing() {
    let _display = exclusive_display();
    let Some(context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();

    let err = compiler
        .compile(ShaderStage::Fragment, &source("empty.frag", ""))
        .err()
        .unwrap();

    assert!(matches!(
        err,
        ShaderError::EmptySource {
            stage: ShaderStage::Fragment
        }
    ));
    assert!(sink.records().is_empty());
}

#[test]
fn link_needs_both_stages() {
    let _display = exclusive_display();
    let Some(context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();
    let vertex = compiler
        .compile(ShaderStage::Vertex, &source("color.vert", COLOR_VERT))
        .unwrap();

    let mut program = compiler.create_program().unwrap();
    program.attach(&vertex);

    assert!(matches!(
        compiler.link(&program),
        Err(ShaderError::IncompleteProgram)
    ));
}

#[test]
fn repeated_runs_agree() {
    let _display = exclusive_display();
    let outcome = || {
        let context = context_or_skip(ProbeConfig::default())?;
        let sink = RecordingSink::new();
        let compiler = ShaderCompiler::new(&context, &sink).ok()?;

        let vertex = compiler
            .compile(ShaderStage::Vertex, &source("color.vert", COLOR_VERT))
            .ok()?;
        let fragment = compiler
            .compile(ShaderStage::Fragment, &source("color.frag", COLOR_FRAG))
            .ok()?;
        let mut program = compiler.create_program().ok()?;
        program.attach(&vertex);
        program.attach(&fragment);

        Some((compiler.link(&program).is_ok(), sink.messages()))
    };

    let Some(first) = outcome() else {
        return;
    };
    assert_eq!(Some(first), outcome());
}

#[test]
fn config_selection_failure_tears_down() {
    let _display = exclusive_display();
    let sink = RecordingSink::new();
    let mut context = GraphicsContext::new(ProbeConfig {
        color_bits: 64,
        ..ProbeConfig::default()
    });

    let err = context.initialize(&sink).unwrap_err();
    assert_eq!(context.state(), ContextState::Failed);

    if matches!(err, ContextError::NoConfig) {
        assert!(sink.contains(Level::Error, "Unable to retrieve EGL config"));
    }
    assert!(matches!(context.gl(), Err(ContextError::NotReady)));

    drop(context);
}

#[test]
fn surfaceless_context_wherever_pbuffer_works() {
    let _display = exclusive_display();
    if context_or_skip(ProbeConfig::default()).is_none() {
        return;
    }

    let config = ProbeConfig::default().with_strategy(ContextStrategy::Surfaceless);
    let mut context = GraphicsContext::new(config);
    match context.initialize(&RecordingSink::new()) {
        Ok(()) => {}
        Err(ContextError::SurfacelessUnsupported) => return,
        Err(err) => panic!("pbuffer context works but surfaceless failed: {err}"),
    }

    let sink = RecordingSink::new();
    let compiler = ShaderCompiler::new(&context, &sink).unwrap();
    compiler
        .compile(ShaderStage::Vertex, &source("color.vert", COLOR_VERT))
        .unwrap();
}

#[test]
fn config_dump_lists_chosen_config() {
    let _display = exclusive_display();
    let config = ProbeConfig {
        show_configs: true,
        ..ProbeConfig::default()
    };
    let mut context = GraphicsContext::new(config);
    let sink = RecordingSink::new();

    if context.initialize(&sink).is_err() {
        return;
    }

    assert!(sink.contains(Level::Info, "number of configs found"));
    assert!(sink.contains(Level::Info, "Renderable Type:"));
    assert!(sink.contains(Level::Info, "Config ID"));
}

#[test]
fn core_entry_points_resolve_from_gles_library() {
    let _display = exclusive_display();
    let Some(_context) = context_or_skip(ProbeConfig::default()) else {
        return;
    };
    let Ok(gles) = GlesLibrary::load() else {
        return;
    };

    assert!(!gles.proc_address("glCreateShader").is_null());
    assert!(!gles.proc_address("glLinkProgram").is_null());
    assert!(gles.proc_address("glNotARealEntryPoint").is_null());
}
