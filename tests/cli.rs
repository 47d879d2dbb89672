use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn shader(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("glsl_probe/tests/shaders")
        .join(name)
}

fn run_cli<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut command = Command::new(env!("CARGO_BIN_EXE_glsl_probe_standalone"));
    command
        .args(args)
        .env_remove("SHOW_CONFIGS")
        .env_remove("RUST_LOG");

    // Mesa's surfaceless platform needs neither X11 nor Wayland.
    if std::env::var_os("EGL_PLATFORM").is_none() {
        command.env("EGL_PLATFORM", "surfaceless");
    }

    command.output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// True when the binary got as far as compiling, i.e. a GLES context exists.
fn has_context(output: &Output) -> bool {
    stdout(output).contains("Compiling vertex shader...")
}

#[test]
fn no_arguments_is_usage_error() {
    let output = run_cli::<[&str; 0], &str>([]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("usage is: glsl_probe_standalone"));
    assert!(output.stdout.is_empty());
}

#[test]
fn one_argument_is_usage_error() {
    let output = run_cli([shader("color.vert")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("usage is: glsl_probe_standalone"));
    assert!(output.stdout.is_empty());
}

#[test]
fn help_exits_cleanly() {
    let output = run_cli(["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("--surfaceless"));
}

#[test]
fn verbose_logs_under_binary_target() {
    let output = run_cli([
        PathBuf::from("--verbose"),
        PathBuf::from("no/such/shader.vert"),
        shader("color.frag"),
    ]);

    assert!(stderr(&output).contains("glsl_probe_standalone::logging] logging initialized"));
}

#[test]
fn missing_file_never_succeeds() {
    let output = run_cli([PathBuf::from("no/such/shader.vert"), shader("color.frag")]);

    assert!(!output.status.success());

    if has_context(&output) {
        let stderr = stderr(&output);
        assert!(stderr.contains("[error] loading program 'no/such/shader.vert'..."));
        assert_eq!(
            stderr
                .matches("vertex shader source is empty or missing")
                .count(),
            1
        );
    }
}

#[test]
fn strict_sources_fail_before_compiling() {
    let output = run_cli([
        PathBuf::from("--strict-sources"),
        PathBuf::from("no/such/shader.vert"),
        shader("color.frag"),
    ]);

    assert!(!output.status.success());
    assert!(!has_context(&output));
}

#[test]
fn valid_pair_exits_zero() {
    let output = run_cli([shader("color.vert"), shader("color.frag")]);

    if !has_context(&output) {
        eprintln!("no GLES context: {}", stderr(&output));
        return;
    }

    assert!(output.status.success());
    assert!(stdout(&output).contains("Compiling fragment shader..."));
    assert!(!stderr(&output).contains("Program link failed"));
}

#[test]
fn surfaceless_works_wherever_pbuffer_does() {
    let pbuffer = run_cli([shader("color.vert"), shader("color.frag")]);
    if !pbuffer.status.success() {
        return;
    }

    let surfaceless = run_cli([
        PathBuf::from("--surfaceless"),
        shader("color.vert"),
        shader("color.frag"),
    ]);

    if stderr(&surfaceless).contains("does not support EGL_KHR_surfaceless_context") {
        return;
    }
    assert!(
        surfaceless.status.success(),
        "surfaceless failed: {}",
        stderr(&surfaceless)
    );
}

#[test]
fn vertex_syntax_error_exits_nonzero() {
    let output = run_cli([shader("syntax_error.vert"), shader("color.frag")]);

    assert!(!output.status.success());

    if has_context(&output) {
        assert_eq!(stderr(&output).matches("Failed to compile shader").count(), 1);
        assert!(!stdout(&output).contains("Compiling fragment shader..."));
    }
}

#[test]
fn link_failure_exits_nonzero() {
    let output = run_cli([shader("color.vert"), shader("mismatched.frag")]);

    assert!(!output.status.success());

    if has_context(&output) {
        let stderr = stderr(&output);
        assert_eq!(stderr.matches("Program link failed").count(), 1);
        assert!(!stderr.contains("program link failed"));
    }
}

#[test]
fn context_failure_is_reported_once() {
    let output = run_cli([shader("color.vert"), shader("color.frag")]);

    if has_context(&output) {
        return;
    }

    assert!(!output.status.success());
    // Reported by the context itself, not repeated by the logger.
    assert!(!stderr(&output).contains("ERROR glsl_probe_standalone"));
}
