//! Engine abstraction and the native, dynamically loaded implementation
//!
//! [`Engine`] is the seam between the safe API and the native library:
//! open a checkpoint into a raw handle, run one blocking generation against
//! it, close the handle. [`crate::Model`] owns exactly one raw handle per
//! engine and releases it on drop.
//!
//! [`NativeEngine`] resolves the engine shared library at runtime with
//! `libloading`. The `LLMODEL_LIBRARY_PATH` environment variable, when set,
//! names the directories searched first; otherwise the platform default
//! search path applies. Symbols are looked up per call, so a library that
//! lacks an optional entry point still works for everything else.

use std::cell::RefCell;
use std::env;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, OnceLock};

use libloading::{Library, Symbol};

use crate::config::GenerationConfig;
use crate::error::LlmodelError;
use crate::streaming::TokenSink;
use crate::sys;
use crate::token::Token;

/// Environment variable overriding where the engine shared library is
/// searched for. Accepts one or more directories in the platform's PATH
/// separator convention. Absence means the platform default search path.
pub const LIBRARY_PATH_ENV: &str = "LLMODEL_LIBRARY_PATH";

/// Base name of the engine shared library (`libllmodel.so`, `llmodel.dll`,
/// `libllmodel.dylib` depending on platform).
const ENGINE_LIBRARY_NAME: &str = "llmodel";

/// Build variant requested from the engine; "auto" lets it pick.
const BUILD_VARIANT: &CStr = c"auto";

/// Opaque native resource reference for an opened model.
///
/// Nullable; [`RawModel::clear`] nulls it out so release is idempotent.
/// Mock engines can mint handles from plain ids with [`RawModel::from_id`].
#[derive(Debug)]
pub struct RawModel(*mut c_void);

// Safety: the handle is an opaque token. The single-owner discipline lives
// in ModelInner; the pointer itself is only ever dereferenced by the engine.
unsafe impl Send for RawModel {}
unsafe impl Sync for RawModel {}

impl RawModel {
    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn null() -> Self {
        Self(ptr::null_mut())
    }

    /// Non-pointer handle for engines that track resources by id. Ids start
    /// at 1 so a valid handle is never null.
    pub fn from_id(id: usize) -> Self {
        Self(id as *mut c_void)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    /// Null the handle out after release.
    pub fn clear(&mut self) {
        self.0 = ptr::null_mut();
    }
}

/// A text-generation engine reachable through opaque model handles.
///
/// Implementations are synchronous: `generate` blocks until the engine
/// emits a terminal token or reaches `n_predict`, invoking the sink inline
/// for each produced token before returning the accumulated text.
pub trait Engine: Send + Sync {
    /// Open the checkpoint at `path` into a raw handle.
    fn open(&self, path: &Path) -> Result<RawModel, LlmodelError>;

    /// Run one blocking generation. Tokens are forwarded to `sink` as they
    /// are produced; the full accumulated text is returned on completion.
    fn generate(
        &self,
        raw: &RawModel,
        prompt: &str,
        config: &GenerationConfig,
        sink: Option<&mut dyn TokenSink>,
    ) -> Result<String, LlmodelError>;

    /// Release the handle. Must be idempotent: a cleared handle is a no-op.
    fn close(&self, raw: &mut RawModel);

    /// Hint how many CPU threads the engine should use for this handle.
    fn set_thread_count(&self, _raw: &RawModel, _n_threads: i32) {}
}

/// The real engine, loaded from the `llmodel` shared library at runtime.
pub struct NativeEngine {
    lib: Library,
}

impl NativeEngine {
    /// Locate and open the engine shared library, honoring
    /// [`LIBRARY_PATH_ENV`] if set. When the override is present it is also
    /// forwarded to the engine's own implementation search path.
    pub fn load() -> Result<Self, LlmodelError> {
        let lib = Self::open_library()?;
        let engine = Self { lib };
        if let Ok(dir) = env::var(LIBRARY_PATH_ENV) {
            engine.set_implementation_search_path(&dir)?;
        }
        Ok(engine)
    }

    /// Process-wide shared instance, loaded on first use.
    pub fn shared() -> Result<Arc<Self>, LlmodelError> {
        static SHARED: OnceLock<Arc<NativeEngine>> = OnceLock::new();
        if let Some(engine) = SHARED.get() {
            return Ok(engine.clone());
        }
        let engine = Arc::new(Self::load()?);
        Ok(SHARED.get_or_init(|| engine).clone())
    }

    fn open_library() -> Result<Library, LlmodelError> {
        let mut last_failure = None;
        for candidate in candidate_paths() {
            match unsafe { Library::new(&candidate) } {
                Ok(lib) => {
                    tracing::debug!(path = %candidate.display(), "engine library loaded");
                    return Ok(lib);
                }
                Err(e) => last_failure = Some((candidate, e)),
            }
        }
        let detail = last_failure
            .map(|(path, e)| format!("{}: {e}", path.display()))
            .unwrap_or_else(|| "no candidate paths".to_string());
        Err(LlmodelError::EngineLibrary(format!(
            "could not locate the {ENGINE_LIBRARY_NAME} shared library ({detail})"
        )))
    }

    /// Forward a directory to the engine's implementation search path.
    pub fn set_implementation_search_path(&self, dir: &str) -> Result<(), LlmodelError> {
        let c_dir = CString::new(dir).map_err(|_| {
            LlmodelError::Config("library search path contains a NUL byte".to_string())
        })?;
        unsafe {
            let set: Symbol<sys::SetImplSearchPathFn> =
                self.sym(sys::SYM_SET_IMPL_SEARCH_PATH)?;
            set(c_dir.as_ptr());
        }
        Ok(())
    }

    unsafe fn sym<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, LlmodelError> {
        self.lib.get(name).map_err(|e| {
            LlmodelError::EngineLibrary(format!(
                "missing engine symbol {}: {e}",
                String::from_utf8_lossy(&name[..name.len() - 1])
            ))
        })
    }
}

/// Candidate filesystem paths for the engine shared library, in search
/// order: each directory from the env override, then the bare file name for
/// the platform default search path.
fn candidate_paths() -> Vec<PathBuf> {
    let file = PathBuf::from(libloading::library_filename(ENGINE_LIBRARY_NAME));
    let mut candidates = Vec::new();
    if let Some(dirs) = env::var_os(LIBRARY_PATH_ENV) {
        for dir in env::split_paths(&dirs) {
            candidates.push(dir.join(&file));
        }
    }
    candidates.push(file);
    candidates
}

unsafe fn native_error_message(err: &sys::llmodel_error, fallback: &str) -> String {
    if err.message.is_null() {
        fallback.to_string()
    } else {
        CStr::from_ptr(err.message).to_string_lossy().into_owned()
    }
}

// The C callbacks carry no user-data pointer, so per-call state is routed
// through thread-local storage. The raw sink pointer is only valid for the
// duration of the blocking prompt call that installed it.
struct PromptState {
    accumulated: String,
    sink: Option<*mut dyn TokenSink>,
    halted: bool,
}

thread_local! {
    static PROMPT_STATE: RefCell<Option<PromptState>> = RefCell::new(None);
}

unsafe extern "C" fn on_prompt_token(_token_id: i32) -> bool {
    true
}

unsafe extern "C" fn on_response_token(token_id: i32, response: *const c_char) -> bool {
    let text = if response.is_null() {
        String::new()
    } else {
        CStr::from_ptr(response).to_string_lossy().into_owned()
    };
    PROMPT_STATE.with(|slot| {
        let mut slot = slot.borrow_mut();
        let Some(state) = slot.as_mut() else {
            return false;
        };
        state.accumulated.push_str(&text);
        if let Some(sink) = state.sink {
            let token = Token::new(token_id, text);
            if !(*sink).on_token(&token) {
                state.halted = true;
                return false;
            }
        }
        true
    })
}

unsafe extern "C" fn on_recalculate(_is_recalculating: bool) -> bool {
    true
}

impl Engine for NativeEngine {
    fn open(&self, path: &Path) -> Result<RawModel, LlmodelError> {
        if !path.is_file() {
            return Err(LlmodelError::ResourceOpen(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        let c_path = CString::new(path.to_string_lossy().as_bytes()).map_err(|_| {
            LlmodelError::ResourceOpen("model path contains a NUL byte".to_string())
        })?;

        unsafe {
            let create: Symbol<sys::ModelCreate2Fn> = self.sym(sys::SYM_MODEL_CREATE2)?;
            let load: Symbol<sys::LoadModelFn> = self.sym(sys::SYM_LOAD_MODEL)?;
            let is_loaded: Symbol<sys::IsModelLoadedFn> = self.sym(sys::SYM_IS_MODEL_LOADED)?;
            let destroy: Symbol<sys::ModelDestroyFn> = self.sym(sys::SYM_MODEL_DESTROY)?;

            let mut native_err = sys::llmodel_error {
                message: ptr::null(),
                code: 0,
            };
            let raw = create(c_path.as_ptr(), BUILD_VARIANT.as_ptr(), &mut native_err);
            if raw.is_null() {
                return Err(LlmodelError::ResourceOpen(native_error_message(
                    &native_err,
                    "engine refused to create a model for this file",
                )));
            }

            // From here on the native object exists; destroy it on every
            // failure path so a half-open model never escapes.
            if !load(raw, c_path.as_ptr(), 2048, 0) || !is_loaded(raw) {
                destroy(raw);
                return Err(LlmodelError::ResourceOpen(format!(
                    "engine could not load checkpoint: {}",
                    path.display()
                )));
            }

            tracing::debug!(path = %path.display(), "native model opened");
            Ok(RawModel::new(raw))
        }
    }

    fn generate(
        &self,
        raw: &RawModel,
        prompt: &str,
        config: &GenerationConfig,
        sink: Option<&mut dyn TokenSink>,
    ) -> Result<String, LlmodelError> {
        if raw.is_null() {
            return Err(LlmodelError::Generation(
                "model handle has been released".to_string(),
            ));
        }
        let c_prompt = CString::new(prompt).map_err(|_| {
            LlmodelError::Generation("prompt contains a NUL byte".to_string())
        })?;
        // Resolve the symbol before installing callback state so an early
        // return cannot leave a stale sink pointer behind.
        let prompt_fn: Symbol<sys::PromptFn> = unsafe { self.sym(sys::SYM_PROMPT)? };

        let mut ctx = config.to_prompt_context();
        PROMPT_STATE.with(|slot| {
            *slot.borrow_mut() = Some(PromptState {
                accumulated: String::new(),
                // Erase the caller's lifetime; the pointer is cleared before
                // this call returns, so it never outlives the borrow.
                sink: sink.map(|s| unsafe {
                    std::mem::transmute::<*mut dyn TokenSink, *mut (dyn TokenSink + 'static)>(s)
                }),
                halted: false,
            });
        });

        let completed = unsafe {
            prompt_fn(
                raw.as_ptr(),
                c_prompt.as_ptr(),
                Some(on_prompt_token),
                Some(on_response_token),
                Some(on_recalculate),
                &mut ctx,
            )
        };

        let state = PROMPT_STATE
            .with(|slot| slot.borrow_mut().take())
            .ok_or_else(|| {
                LlmodelError::Generation("prompt callback state was lost".to_string())
            })?;

        // A sink asking to stop is not an engine fault.
        if !completed && !state.halted {
            return Err(LlmodelError::Generation(
                "engine fault during prompt processing".to_string(),
            ));
        }
        Ok(state.accumulated)
    }

    fn close(&self, raw: &mut RawModel) {
        if raw.is_null() {
            return;
        }
        match unsafe { self.sym::<sys::ModelDestroyFn>(sys::SYM_MODEL_DESTROY) } {
            Ok(destroy) => unsafe { destroy(raw.as_ptr()) },
            Err(e) => tracing::warn!("leaking native model: {e}"),
        }
        raw.clear();
        tracing::debug!("native model released");
    }

    fn set_thread_count(&self, raw: &RawModel, n_threads: i32) {
        if raw.is_null() {
            return;
        }
        if let Ok(set) = unsafe { self.sym::<sys::SetThreadCountFn>(sys::SYM_SET_THREAD_COUNT) } {
            unsafe { set(raw.as_ptr(), n_threads) };
        }
    }
}
