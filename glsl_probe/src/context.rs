use std::fmt;

use bitflags::bitflags;
use glow::HasContext;

use crate::config::{ContextStrategy, ProbeConfig};
use crate::diagnostics::DiagnosticsSink;
use crate::egl::{
    self, or_else_if_null, EGLConfig, EGLContext, EGLDisplay, EGLSurface, EGLint, Egl, EglError,
    GlesLibrary,
};

const SURFACELESS_EXTENSION: &str = "EGL_KHR_surfaceless_context";
const SEPARATOR: &str =
    "--------------------------------------------------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("unable to load the EGL library: {0}")]
    Load(String),
    #[error("no default EGL display available")]
    NoDisplay,
    #[error("unable to initialize EGL display: {0}")]
    Initialize(EglError),
    #[error("Unable to retrieve EGL config")]
    NoConfig,
    #[error("unable to query EGL configs: {0}")]
    QueryConfigs(EglError),
    #[error("Unable to create pbuffer surface: {0}")]
    Surface(EglError),
    #[error("EGL display does not support EGL_KHR_surfaceless_context")]
    SurfacelessUnsupported,
    #[error("unable to create GLES {major}.{minor} context: {error}")]
    CreateContext {
        major: EGLint,
        minor: EGLint,
        error: EglError,
    },
    #[error("Unable to eglMakeCurrent: {0}")]
    MakeCurrent(EglError),
    #[error("graphics context can only be initialized once")]
    AlreadyInitialized,
    #[error("graphics context is not ready")]
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderableType: EGLint {
        const OPENGL_ES = egl::OPENGL_ES_BIT;
        const OPENVG = 0x0002;
        const OPENGL_ES2 = egl::OPENGL_ES2_BIT;
        const OPENGL = 0x0008;
        const OPENGL_ES3 = egl::OPENGL_ES3_BIT_KHR;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceType: EGLint {
        const PBUFFER = egl::PBUFFER_BIT;
        const PIXMAP = 0x0002;
        const WINDOW = 0x0004;
        const VG_COLORSPACE_LINEAR = 0x0020;
        const VG_ALPHA_FORMAT_PRE = 0x0040;
        const MULTISAMPLE_RESOLVE_BOX = 0x0200;
        const SWAP_BEHAVIOR_PRESERVED = 0x0400;
    }
}

impl RenderableType {
    /// Renderable bit a config needs to host a GLES context of `major`.
    pub fn for_client_version(major: EGLint) -> Self {
        match major {
            ..=1 => Self::OPENGL_ES,
            2 => Self::OPENGL_ES2,
            _ => Self::OPENGL_ES3,
        }
    }
}

/// Joins the names of the set flags with spaces.
fn flag_names<B: bitflags::Flags>(flags: B) -> String {
    flags
        .iter_names()
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Attribute list handed to `eglChooseConfig`.
pub fn config_attribs(config: &ProbeConfig) -> Vec<EGLint> {
    let renderable = RenderableType::for_client_version(config.client_version.0);
    let mut attribs = vec![
        egl::RENDERABLE_TYPE,
        renderable.bits(),
        egl::BLUE_SIZE,
        config.color_bits,
        egl::GREEN_SIZE,
        config.color_bits,
        egl::RED_SIZE,
        config.color_bits,
        egl::ALPHA_SIZE,
        config.color_bits,
    ];

    // Left out, EGL_SURFACE_TYPE defaults to EGL_WINDOW_BIT. Surfaceless
    // needs no surface bit at all.
    let surface_type = match config.strategy {
        ContextStrategy::PbufferBacked { .. } => SurfaceType::PBUFFER,
        ContextStrategy::Surfaceless => SurfaceType::empty(),
    };
    attribs.extend([egl::SURFACE_TYPE, surface_type.bits()]);

    attribs.push(egl::NONE);
    attribs
}

/// Attribute list handed to `eglCreateContext`. A zero minor version is left
/// out so plain EGL 1.4 drivers accept it.
pub fn context_attribs(config: &ProbeConfig) -> Vec<EGLint> {
    let (major, minor) = config.client_version;
    let mut attribs = vec![egl::CONTEXT_MAJOR_VERSION, major];

    if minor != 0 {
        attribs.extend([egl::CONTEXT_MINOR_VERSION, minor]);
    }

    attribs.push(egl::NONE);
    attribs
}

pub fn pbuffer_attribs(width: EGLint, height: EGLint) -> [EGLint; 5] {
    [egl::WIDTH, width, egl::HEIGHT, height, egl::NONE]
}

/// Every attribute printed for a config in the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAttributes {
    pub buffer_size: EGLint,
    pub red_size: EGLint,
    pub green_size: EGLint,
    pub blue_size: EGLint,
    pub alpha_size: EGLint,
    pub caveat: EGLint,
    pub config_id: EGLint,
    pub renderable_type: RenderableType,
    pub depth_size: EGLint,
    pub max_pbuffer_width: EGLint,
    pub max_pbuffer_height: EGLint,
    pub max_pbuffer_pixels: EGLint,
    pub native_renderable: bool,
    pub native_visual_id: EGLint,
    pub native_visual_type: EGLint,
    pub sample_buffers: EGLint,
    pub samples: EGLint,
    pub surface_type: SurfaceType,
}

impl ConfigAttributes {
    unsafe fn query(egl: &Egl, display: EGLDisplay, config: EGLConfig) -> Self {
        // A single unreadable attribute shouldn't hide the rest of the dump.
        let get = |attribute| egl.config_attrib(display, config, attribute).unwrap_or(0);

        Self {
            buffer_size: get(egl::BUFFER_SIZE),
            red_size: get(egl::RED_SIZE),
            green_size: get(egl::GREEN_SIZE),
            blue_size: get(egl::BLUE_SIZE),
            alpha_size: get(egl::ALPHA_SIZE),
            caveat: get(egl::CONFIG_CAVEAT),
            config_id: get(egl::CONFIG_ID),
            renderable_type: RenderableType::from_bits_retain(get(egl::RENDERABLE_TYPE)),
            depth_size: get(egl::DEPTH_SIZE),
            max_pbuffer_width: get(egl::MAX_PBUFFER_WIDTH),
            max_pbuffer_height: get(egl::MAX_PBUFFER_HEIGHT),
            max_pbuffer_pixels: get(egl::MAX_PBUFFER_PIXELS),
            native_renderable: get(egl::NATIVE_RENDERABLE) != 0,
            native_visual_id: get(egl::NATIVE_VISUAL_ID),
            native_visual_type: get(egl::NATIVE_VISUAL_TYPE),
            sample_buffers: get(egl::SAMPLE_BUFFERS),
            samples: get(egl::SAMPLES),
            surface_type: SurfaceType::from_bits_retain(get(egl::SURFACE_TYPE)),
        }
    }

    fn caveat_name(&self) -> &'static str {
        match self.caveat {
            egl::SLOW_CONFIG => "EGL_SLOW_CONFIG",
            egl::NON_CONFORMANT_CONFIG => "EGL_NON_CONFORMANT_CONFIG",
            _ => "EGL_NONE",
        }
    }
}

impl fmt::Display for ConfigAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Buffer Size {}", self.buffer_size)?;
        writeln!(f, "Red Size {}", self.red_size)?;
        writeln!(f, "Green Size {}", self.green_size)?;
        writeln!(f, "Blue Size {}", self.blue_size)?;
        writeln!(f, "Alpha Size {}", self.alpha_size)?;
        writeln!(f, "EGL_CONFIG_CAVEAT {}", self.caveat_name())?;
        writeln!(f, "Config ID {}", self.config_id)?;
        writeln!(f, "Renderable Type: {}", flag_names(self.renderable_type))?;
        writeln!(f, "Depth size {}", self.depth_size)?;
        writeln!(f, "Max pbuffer width {}", self.max_pbuffer_width)?;
        writeln!(f, "Max pbuffer height {}", self.max_pbuffer_height)?;
        writeln!(f, "Max pbuffer pixels {}", self.max_pbuffer_pixels)?;
        writeln!(f, "Native renderable {}", self.native_renderable)?;
        writeln!(f, "Native visual ID {}", self.native_visual_id)?;
        writeln!(f, "Native visual type {}", self.native_visual_type)?;
        writeln!(f, "Sample Buffers {}", self.sample_buffers)?;
        writeln!(f, "Samples {}", self.samples)?;
        writeln!(
            f,
            "Surface type 0x{:x} {}",
            self.surface_type.bits(),
            flag_names(self.surface_type)
        )?;
        write!(f, "{SEPARATOR}")
    }
}

/// Offscreen GLES context, current on the thread that initialized it.
///
/// Handles are filled in as [`GraphicsContext::initialize`] progresses, and
/// dropping the value releases whatever was created, even after a failure
/// halfway through.
pub struct GraphicsContext {
    config: ProbeConfig,
    state: ContextState,

    gl: Option<glow::Context>,
    context: Option<EGLContext>,
    surface: Option<EGLSurface>,
    display: Option<EGLDisplay>,
    gles: Option<GlesLibrary>,
    egl: Option<Egl>,
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl GraphicsContext {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            state: ContextState::Uninitialized,
            gl: None,
            context: None,
            surface: None,
            display: None,
            gles: None,
            egl: None,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn gl(&self) -> Result<&glow::Context, ContextError> {
        match (&self.gl, self.state) {
            (Some(gl), ContextState::Ready) => Ok(gl),
            _ => Err(ContextError::NotReady),
        }
    }

    pub fn initialize(&mut self, sink: &dyn DiagnosticsSink) -> Result<(), ContextError> {
        if self.state != ContextState::Uninitialized {
            return Err(ContextError::AlreadyInitialized);
        }
        self.state = ContextState::Initializing;

        match unsafe { self.try_initialize(sink) } {
            Ok(()) => {
                self.state = ContextState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = ContextState::Failed;
                sink.error(&err.to_string());
                Err(err)
            }
        }
    }

    unsafe fn try_initialize(&mut self, sink: &dyn DiagnosticsSink) -> Result<(), ContextError> {
        let egl = self
            .egl
            .insert(Egl::load().map_err(|err| ContextError::Load(err.to_string()))?);

        let display = egl.default_display().ok_or(ContextError::NoDisplay)?;
        self.display = Some(display);

        let (major, minor) = egl.initialize(display).map_err(ContextError::Initialize)?;
        log::debug!(
            "EGL {major}.{minor} initialized, vendor: {}",
            egl.query_string(display, egl::VENDOR).unwrap_or_default()
        );
        log::trace!(
            "EGL client APIs: {}",
            egl.query_string(display, egl::CLIENT_APIS).unwrap_or_default()
        );

        if self.config.show_configs {
            dump_all_configs(egl, display, sink)?;
        }

        let config = egl
            .choose_first_config(display, &config_attribs(&self.config))
            .map_err(ContextError::QueryConfigs)?
            .ok_or(ContextError::NoConfig)?;

        if self.config.show_configs {
            sink.info(&ConfigAttributes::query(egl, display, config).to_string());
        }

        let surface = match self.config.strategy {
            ContextStrategy::PbufferBacked { width, height } => {
                // Only there to have something to make current.
                let surface = egl
                    .create_pbuffer_surface(display, config, &pbuffer_attribs(width, height))
                    .map_err(ContextError::Surface)?;
                self.surface = Some(surface);
                surface
            }
            ContextStrategy::Surfaceless => {
                if !egl.has_extension(display, SURFACELESS_EXTENSION) {
                    return Err(ContextError::SurfacelessUnsupported);
                }
                egl::NO_SURFACE
            }
        };

        // ES is already the default API on conforming drivers.
        if let Err(err) = egl.bind_api(egl::OPENGL_ES_API) {
            log::warn!("eglBindAPI(EGL_OPENGL_ES_API) failed: {err}");
        }

        let (major, minor) = self.config.client_version;
        let context = egl
            .create_context(display, config, &context_attribs(&self.config))
            .map_err(|error| ContextError::CreateContext {
                major,
                minor,
                error,
            })?;
        self.context = Some(context);

        egl.make_current(display, surface, context)
            .map_err(ContextError::MakeCurrent)?;

        // Plain EGL 1.4 only hands out extension functions; core GLES entry
        // points then come straight from libGLESv2.
        self.gles = GlesLibrary::load()
            .inspect_err(|err| log::debug!("libGLESv2 not loaded: {err}"))
            .ok();
        let gles = self.gles.as_ref();
        let gl = glow::Context::from_loader_function(|name| {
            or_else_if_null(egl.proc_address(name), || {
                gles.map_or(std::ptr::null(), |gles| gles.proc_address(name))
            })
        });
        log::debug!(
            "{} / {} / {} / {}",
            gl.get_parameter_string(glow::VENDOR),
            gl.get_parameter_string(glow::RENDERER),
            gl.get_parameter_string(glow::VERSION),
            gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
        );
        self.gl = Some(gl);

        log::debug!("context current ({})", self.config.strategy);

        Ok(())
    }

    /// Releases everything `initialize` got as far as creating. Runs once;
    /// later calls find nothing left to release.
    fn teardown(&mut self) {
        self.gl = None;
        // Unloaded last, once the context is gone.
        let _gles = self.gles.take();

        let (Some(egl), Some(display)) = (self.egl.take(), self.display.take()) else {
            return;
        };

        unsafe {
            if self.state == ContextState::Ready {
                if let Err(err) = egl.release_current(display) {
                    log::warn!("failed to release current context: {err}");
                }
            }

            if let Some(context) = self.context.take() {
                log::trace!("destroying EGL context");
                if let Err(err) = egl.destroy_context(display, context) {
                    log::warn!("eglDestroyContext failed: {err}");
                }
            }

            if let Some(surface) = self.surface.take() {
                log::trace!("destroying pbuffer surface");
                if let Err(err) = egl.destroy_surface(display, surface) {
                    log::warn!("eglDestroySurface failed: {err}");
                }
            }

            log::trace!("terminating EGL display");
            if let Err(err) = egl.terminate(display) {
                log::warn!("eglTerminate failed: {err}");
            }
        }
    }
}

unsafe fn dump_all_configs(
    egl: &Egl,
    display: EGLDisplay,
    sink: &dyn DiagnosticsSink,
) -> Result<(), ContextError> {
    let configs = egl.configs(display).map_err(ContextError::QueryConfigs)?;

    sink.info(&format!("number of configs found {}", configs.len()));
    sink.info(SEPARATOR);

    for (index, config) in configs.iter().enumerate() {
        sink.info(&format!("Config #{index}"));
        sink.info(&ConfigAttributes::query(egl, display, *config).to_string());
    }

    Ok(())
}
