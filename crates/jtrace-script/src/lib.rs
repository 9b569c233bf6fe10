//! jtrace Script - Hook program compiler
//!
//! Turns an ordered set of [`HookSpec`](jtrace_core::HookSpec)s plus raw
//! global fragments into the text of one instrumentation program. The
//! compiler is pure: it never touches disk and never fails. Hooks that
//! cannot be resolved inside the target only log a diagnostic at run time.
//!
//! # Program layout
//!
//! ```text
//! 'use strict';
//! <global fragments, each under a banner comment>
//! setImmediate(function() {
//!   Java.perform(function() {
//!     <shared helpers>
//!     <one try/catch block per hook, names suffixed _1, _2, ...>
//!   });
//! });
//! ```

mod compiler;
mod helpers;
mod literal;

pub use compiler::{compile, GLOBAL_SCRIPT_BANNER};
pub use literal::{comment_text, constant_literal, js_quote};
