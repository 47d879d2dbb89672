//! Minimal EGL 1.4 entry points, resolved from the system library at runtime.
//!
//! Only what an offscreen GLES context needs is bound here: display setup,
//! config queries, pbuffer surfaces and context creation.

use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;

use libloading::Library;

pub type EGLint = i32;
pub type EGLBoolean = u32;
pub type EGLenum = u32;
pub type EGLDisplay = *mut c_void;
pub type EGLConfig = *mut c_void;
pub type EGLContext = *mut c_void;
pub type EGLSurface = *mut c_void;
pub type EGLNativeDisplayType = *mut c_void;

pub const DEFAULT_DISPLAY: EGLNativeDisplayType = std::ptr::null_mut();
pub const NO_DISPLAY: EGLDisplay = std::ptr::null_mut();
pub const NO_CONTEXT: EGLContext = std::ptr::null_mut();
pub const NO_SURFACE: EGLSurface = std::ptr::null_mut();

pub const FALSE: EGLBoolean = 0;

pub const SUCCESS: EGLint = 0x3000;
pub const NOT_INITIALIZED: EGLint = 0x3001;
pub const BAD_ACCESS: EGLint = 0x3002;
pub const BAD_ALLOC: EGLint = 0x3003;
pub const BAD_ATTRIBUTE: EGLint = 0x3004;
pub const BAD_CONFIG: EGLint = 0x3005;
pub const BAD_CONTEXT: EGLint = 0x3006;
pub const BAD_CURRENT_SURFACE: EGLint = 0x3007;
pub const BAD_DISPLAY: EGLint = 0x3008;
pub const BAD_MATCH: EGLint = 0x3009;
pub const BAD_NATIVE_PIXMAP: EGLint = 0x300A;
pub const BAD_NATIVE_WINDOW: EGLint = 0x300B;
pub const BAD_PARAMETER: EGLint = 0x300C;
pub const BAD_SURFACE: EGLint = 0x300D;
pub const CONTEXT_LOST: EGLint = 0x300E;

pub const BUFFER_SIZE: EGLint = 0x3020;
pub const ALPHA_SIZE: EGLint = 0x3021;
pub const BLUE_SIZE: EGLint = 0x3022;
pub const GREEN_SIZE: EGLint = 0x3023;
pub const RED_SIZE: EGLint = 0x3024;
pub const DEPTH_SIZE: EGLint = 0x3025;
pub const CONFIG_CAVEAT: EGLint = 0x3027;
pub const CONFIG_ID: EGLint = 0x3028;
pub const MAX_PBUFFER_HEIGHT: EGLint = 0x302A;
pub const MAX_PBUFFER_PIXELS: EGLint = 0x302B;
pub const MAX_PBUFFER_WIDTH: EGLint = 0x302C;
pub const NATIVE_RENDERABLE: EGLint = 0x302D;
pub const NATIVE_VISUAL_ID: EGLint = 0x302E;
pub const NATIVE_VISUAL_TYPE: EGLint = 0x302F;
pub const SAMPLES: EGLint = 0x3031;
pub const SAMPLE_BUFFERS: EGLint = 0x3032;
pub const SURFACE_TYPE: EGLint = 0x3033;
pub const NONE: EGLint = 0x3038;
pub const RENDERABLE_TYPE: EGLint = 0x3040;

pub const SLOW_CONFIG: EGLint = 0x3050;
pub const NON_CONFORMANT_CONFIG: EGLint = 0x3051;

pub const VENDOR: EGLint = 0x3053;
pub const VERSION: EGLint = 0x3054;
pub const EXTENSIONS: EGLint = 0x3055;
pub const HEIGHT: EGLint = 0x3056;
pub const WIDTH: EGLint = 0x3057;
pub const CLIENT_APIS: EGLint = 0x308D;

pub const CONTEXT_MAJOR_VERSION: EGLint = 0x3098;
pub const CONTEXT_MINOR_VERSION: EGLint = 0x30FB;

pub const OPENGL_ES_API: EGLenum = 0x30A0;

pub const OPENGL_ES_BIT: EGLint = 0x0001;
pub const OPENGL_ES2_BIT: EGLint = 0x0004;
pub const OPENGL_ES3_BIT_KHR: EGLint = 0x0040;
pub const PBUFFER_BIT: EGLint = 0x0001;

#[cfg(all(unix, not(target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["libEGL.so.1", "libEGL.so"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["libEGL.dylib"];
#[cfg(windows)]
const LIBRARY_NAMES: &[&str] = &["libEGL.dll"];

#[cfg(all(unix, not(target_os = "macos")))]
const GLES_LIBRARY_NAMES: &[&str] = &["libGLESv2.so.2", "libGLESv2.so"];
#[cfg(target_os = "macos")]
const GLES_LIBRARY_NAMES: &[&str] = &["libGLESv2.dylib"];
#[cfg(windows)]
const GLES_LIBRARY_NAMES: &[&str] = &["libGLESv2.dll"];

type GetErrorFn = unsafe extern "system" fn() -> EGLint;
type GetDisplayFn = unsafe extern "system" fn(EGLNativeDisplayType) -> EGLDisplay;
type InitializeFn = unsafe extern "system" fn(EGLDisplay, *mut EGLint, *mut EGLint) -> EGLBoolean;
type TerminateFn = unsafe extern "system" fn(EGLDisplay) -> EGLBoolean;
type QueryStringFn = unsafe extern "system" fn(EGLDisplay, EGLint) -> *const c_char;
type GetConfigsFn =
    unsafe extern "system" fn(EGLDisplay, *mut EGLConfig, EGLint, *mut EGLint) -> EGLBoolean;
type ChooseConfigFn = unsafe extern "system" fn(
    EGLDisplay,
    *const EGLint,
    *mut EGLConfig,
    EGLint,
    *mut EGLint,
) -> EGLBoolean;
type GetConfigAttribFn =
    unsafe extern "system" fn(EGLDisplay, EGLConfig, EGLint, *mut EGLint) -> EGLBoolean;
type CreatePbufferSurfaceFn =
    unsafe extern "system" fn(EGLDisplay, EGLConfig, *const EGLint) -> EGLSurface;
type DestroySurfaceFn = unsafe extern "system" fn(EGLDisplay, EGLSurface) -> EGLBoolean;
type BindApiFn = unsafe extern "system" fn(EGLenum) -> EGLBoolean;
type CreateContextFn =
    unsafe extern "system" fn(EGLDisplay, EGLConfig, EGLContext, *const EGLint) -> EGLContext;
type DestroyContextFn = unsafe extern "system" fn(EGLDisplay, EGLContext) -> EGLBoolean;
type MakeCurrentFn =
    unsafe extern "system" fn(EGLDisplay, EGLSurface, EGLSurface, EGLContext) -> EGLBoolean;
type GetProcAddressFn = unsafe extern "system" fn(*const c_char) -> *const c_void;

/// Error code reported by `eglGetError` after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EglError(pub EGLint);

impl EglError {
    pub fn name(&self) -> &'static str {
        match self.0 {
            SUCCESS => "EGL_SUCCESS",
            NOT_INITIALIZED => "EGL_NOT_INITIALIZED",
            BAD_ACCESS => "EGL_BAD_ACCESS",
            BAD_ALLOC => "EGL_BAD_ALLOC",
            BAD_ATTRIBUTE => "EGL_BAD_ATTRIBUTE",
            BAD_CONFIG => "EGL_BAD_CONFIG",
            BAD_CONTEXT => "EGL_BAD_CONTEXT",
            BAD_CURRENT_SURFACE => "EGL_BAD_CURRENT_SURFACE",
            BAD_DISPLAY => "EGL_BAD_DISPLAY",
            BAD_MATCH => "EGL_BAD_MATCH",
            BAD_NATIVE_PIXMAP => "EGL_BAD_NATIVE_PIXMAP",
            BAD_NATIVE_WINDOW => "EGL_BAD_NATIVE_WINDOW",
            BAD_PARAMETER => "EGL_BAD_PARAMETER",
            BAD_SURFACE => "EGL_BAD_SURFACE",
            CONTEXT_LOST => "EGL_CONTEXT_LOST",
            _ => "unknown EGL error",
        }
    }
}

impl fmt::Display for EglError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.name(), self.0)
    }
}

impl std::error::Error for EglError {}

pub struct Egl {
    get_error: GetErrorFn,
    get_display: GetDisplayFn,
    initialize: InitializeFn,
    terminate: TerminateFn,
    query_string: QueryStringFn,
    get_configs: GetConfigsFn,
    choose_config: ChooseConfigFn,
    get_config_attrib: GetConfigAttribFn,
    create_pbuffer_surface: CreatePbufferSurfaceFn,
    destroy_surface: DestroySurfaceFn,
    bind_api: BindApiFn,
    create_context: CreateContextFn,
    destroy_context: DestroyContextFn,
    make_current: MakeCurrentFn,
    get_proc_address: GetProcAddressFn,
    _library: Library,
}

unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, libloading::Error> {
    Ok(*library.get::<T>(name)?)
}

unsafe fn open_first(names: &[&str]) -> Result<Library, libloading::Error> {
    let mut last_error = None;

    for name in names {
        match Library::new(name) {
            Ok(library) => return Ok(library),
            Err(err) => {
                log::debug!("could not open {name}: {err}");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or(libloading::Error::DlOpenUnknown))
}

/// Returns `pointer`, or whatever `fallback` finds when it is null.
pub fn or_else_if_null<F>(pointer: *const c_void, fallback: F) -> *const c_void
where
    F: FnOnce() -> *const c_void,
{
    if pointer.is_null() {
        fallback()
    } else {
        pointer
    }
}

impl Egl {
    /// Opens the platform EGL library and resolves every entry point used here.
    ///
    /// # Safety
    /// Loading a shared library runs its initialisers.
    pub unsafe fn load() -> Result<Self, libloading::Error> {
        Self::from_library(open_first(LIBRARY_NAMES)?)
    }

    unsafe fn from_library(library: Library) -> Result<Self, libloading::Error> {
        Ok(Self {
            get_error: symbol(&library, b"eglGetError\0")?,
            get_display: symbol(&library, b"eglGetDisplay\0")?,
            initialize: symbol(&library, b"eglInitialize\0")?,
            terminate: symbol(&library, b"eglTerminate\0")?,
            query_string: symbol(&library, b"eglQueryString\0")?,
            get_configs: symbol(&library, b"eglGetConfigs\0")?,
            choose_config: symbol(&library, b"eglChooseConfig\0")?,
            get_config_attrib: symbol(&library, b"eglGetConfigAttrib\0")?,
            create_pbuffer_surface: symbol(&library, b"eglCreatePbufferSurface\0")?,
            destroy_surface: symbol(&library, b"eglDestroySurface\0")?,
            bind_api: symbol(&library, b"eglBindAPI\0")?,
            create_context: symbol(&library, b"eglCreateContext\0")?,
            destroy_context: symbol(&library, b"eglDestroyContext\0")?,
            make_current: symbol(&library, b"eglMakeCurrent\0")?,
            get_proc_address: symbol(&library, b"eglGetProcAddress\0")?,
            _library: library,
        })
    }

    fn check(&self, result: EGLBoolean) -> Result<(), EglError> {
        if result == FALSE {
            Err(self.last_error())
        } else {
            Ok(())
        }
    }

    pub fn last_error(&self) -> EglError {
        EglError(unsafe { (self.get_error)() })
    }

    pub unsafe fn default_display(&self) -> Option<EGLDisplay> {
        let display = (self.get_display)(DEFAULT_DISPLAY);
        (display != NO_DISPLAY).then_some(display)
    }

    pub unsafe fn initialize(&self, display: EGLDisplay) -> Result<(EGLint, EGLint), EglError> {
        let mut major = 0;
        let mut minor = 0;
        self.check((self.initialize)(display, &mut major, &mut minor))?;
        Ok((major, minor))
    }

    pub unsafe fn terminate(&self, display: EGLDisplay) -> Result<(), EglError> {
        self.check((self.terminate)(display))
    }

    pub unsafe fn query_string(&self, display: EGLDisplay, name: EGLint) -> Option<String> {
        let value = (self.query_string)(display, name);

        if value.is_null() {
            None
        } else {
            Some(CStr::from_ptr(value).to_string_lossy().into_owned())
        }
    }

    pub unsafe fn has_extension(&self, display: EGLDisplay, extension: &str) -> bool {
        self.query_string(display, EXTENSIONS)
            .map(|extensions| extensions.split_ascii_whitespace().any(|e| e == extension))
            .unwrap_or(false)
    }

    pub unsafe fn configs(&self, display: EGLDisplay) -> Result<Vec<EGLConfig>, EglError> {
        let mut count = 0;
        self.check((self.get_configs)(display, std::ptr::null_mut(), 0, &mut count))?;

        let mut configs = vec![std::ptr::null_mut(); count.max(0) as usize];
        self.check((self.get_configs)(
            display,
            configs.as_mut_ptr(),
            count,
            &mut count,
        ))?;
        configs.truncate(count.max(0) as usize);

        Ok(configs)
    }

    /// `attribs` must be terminated with [`NONE`].
    pub unsafe fn choose_first_config(
        &self,
        display: EGLDisplay,
        attribs: &[EGLint],
    ) -> Result<Option<EGLConfig>, EglError> {
        debug_assert_eq!(attribs.last(), Some(&NONE));

        let mut config = std::ptr::null_mut();
        let mut count = 0;
        self.check((self.choose_config)(
            display,
            attribs.as_ptr(),
            &mut config,
            1,
            &mut count,
        ))?;

        Ok((count > 0).then_some(config))
    }

    pub unsafe fn config_attrib(
        &self,
        display: EGLDisplay,
        config: EGLConfig,
        attribute: EGLint,
    ) -> Result<EGLint, EglError> {
        let mut value = 0;
        self.check((self.get_config_attrib)(display, config, attribute, &mut value))?;
        Ok(value)
    }

    pub unsafe fn create_pbuffer_surface(
        &self,
        display: EGLDisplay,
        config: EGLConfig,
        attribs: &[EGLint],
    ) -> Result<EGLSurface, EglError> {
        let surface = (self.create_pbuffer_surface)(display, config, attribs.as_ptr());

        if surface == NO_SURFACE {
            Err(self.last_error())
        } else {
            Ok(surface)
        }
    }

    pub unsafe fn destroy_surface(
        &self,
        display: EGLDisplay,
        surface: EGLSurface,
    ) -> Result<(), EglError> {
        self.check((self.destroy_surface)(display, surface))
    }

    pub unsafe fn bind_api(&self, api: EGLenum) -> Result<(), EglError> {
        self.check((self.bind_api)(api))
    }

    pub unsafe fn create_context(
        &self,
        display: EGLDisplay,
        config: EGLConfig,
        attribs: &[EGLint],
    ) -> Result<EGLContext, EglError> {
        let context = (self.create_context)(display, config, NO_CONTEXT, attribs.as_ptr());

        if context == NO_CONTEXT {
            Err(self.last_error())
        } else {
            Ok(context)
        }
    }

    pub unsafe fn destroy_context(
        &self,
        display: EGLDisplay,
        context: EGLContext,
    ) -> Result<(), EglError> {
        self.check((self.destroy_context)(display, context))
    }

    pub unsafe fn make_current(
        &self,
        display: EGLDisplay,
        surface: EGLSurface,
        context: EGLContext,
    ) -> Result<(), EglError> {
        self.check((self.make_current)(display, surface, surface, context))
    }

    pub unsafe fn release_current(&self, display: EGLDisplay) -> Result<(), EglError> {
        self.make_current(display, NO_SURFACE, NO_CONTEXT)
    }

    pub fn proc_address(&self, name: &str) -> *const c_void {
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };

        unsafe { (self.get_proc_address)(name.as_ptr()) }
    }
}

/// The GLES client library, for core entry points `eglGetProcAddress` does
/// not return.
pub struct GlesLibrary {
    library: Library,
}

impl GlesLibrary {
    pub fn load() -> Result<Self, libloading::Error> {
        let library = unsafe { open_first(GLES_LIBRARY_NAMES)? };
        Ok(Self { library })
    }

    pub fn proc_address(&self, name: &str) -> *const c_void {
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };

        unsafe {
            self.library
                .get::<unsafe extern "system" fn()>(name.as_bytes_with_nul())
                .map_or(std::ptr::null(), |function| *function as *const c_void)
        }
    }
}
