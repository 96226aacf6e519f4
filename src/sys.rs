//! Low-level C API surface of the llmodel engine
//!
//! This module mirrors the engine's C header: opaque handles, the prompt
//! context struct, callback signatures, and function-pointer types for every
//! entry point the binding uses. The engine library is resolved at runtime
//! (see [`crate::engine::NativeEngine`]), so there is no link-time dependency
//! and no `extern` block here; each entry point is a type alias that a
//! dynamically loaded symbol is cast to.
//!
//! **NOTE**: These are low-level declarations. Use the safe API in the other
//! modules.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_void};

//
// Opaque handle and error/out structs - matching the C header exactly
//

/// Opaque pointer to a native model instance.
pub type llmodel_model = *mut c_void;

/// Out-parameter filled in by `llmodel_model_create2` on failure.
#[repr(C)]
pub struct llmodel_error {
    pub message: *const c_char,
    pub code: c_int,
}

/// Decode-state and sampling parameters for a prompt call.
///
/// The engine reads every field; the safe API populates it from a
/// [`crate::GenerationConfig`].
#[repr(C)]
pub struct llmodel_prompt_context {
    pub n_past: i32,
    pub n_ctx: i32,
    pub n_predict: i32,
    pub top_k: i32,
    pub top_p: f32,
    pub temp: f32,
    pub n_batch: i32,
    pub repeat_penalty: f32,
    pub repeat_last_n: i32,
    pub context_erase: f32,
}

//
// Callback signatures
//
// The C API carries no user-data pointer; callers are expected to route
// state through thread-local storage. Each callback returns whether the
// engine should keep going.
//

pub type llmodel_prompt_callback = unsafe extern "C" fn(token_id: i32) -> bool;
pub type llmodel_response_callback =
    unsafe extern "C" fn(token_id: i32, response: *const c_char) -> bool;
pub type llmodel_recalculate_callback = unsafe extern "C" fn(is_recalculating: bool) -> bool;

//
// Entry points - function-pointer types for runtime symbol resolution
//

pub type ModelCreate2Fn = unsafe extern "C" fn(
    model_path: *const c_char,
    build_variant: *const c_char,
    error: *mut llmodel_error,
) -> llmodel_model;

pub type ModelDestroyFn = unsafe extern "C" fn(model: llmodel_model);

pub type LoadModelFn = unsafe extern "C" fn(
    model: llmodel_model,
    model_path: *const c_char,
    n_ctx: c_int,
    n_gpu_layers: c_int,
) -> bool;

pub type IsModelLoadedFn = unsafe extern "C" fn(model: llmodel_model) -> bool;

/// Blocking prompt call. Returns false on an engine fault.
pub type PromptFn = unsafe extern "C" fn(
    model: llmodel_model,
    prompt: *const c_char,
    prompt_cb: Option<llmodel_prompt_callback>,
    response_cb: Option<llmodel_response_callback>,
    recalculate_cb: Option<llmodel_recalculate_callback>,
    ctx: *mut llmodel_prompt_context,
) -> bool;

pub type SetImplSearchPathFn = unsafe extern "C" fn(path: *const c_char);

pub type SetThreadCountFn = unsafe extern "C" fn(model: llmodel_model, n_threads: c_int);

//
// Symbol names (NUL-terminated for direct lookup)
//

pub const SYM_MODEL_CREATE2: &[u8] = b"llmodel_model_create2\0";
pub const SYM_MODEL_DESTROY: &[u8] = b"llmodel_model_destroy\0";
pub const SYM_LOAD_MODEL: &[u8] = b"llmodel_loadModel\0";
pub const SYM_IS_MODEL_LOADED: &[u8] = b"llmodel_isModelLoaded\0";
pub const SYM_PROMPT: &[u8] = b"llmodel_prompt\0";
pub const SYM_SET_IMPL_SEARCH_PATH: &[u8] = b"llmodel_set_implementation_search_path\0";
pub const SYM_SET_THREAD_COUNT: &[u8] = b"llmodel_setThreadCount\0";
