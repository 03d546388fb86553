//! Dynamic code rewriting inside one process.
//!
//! [`Weaver`] is a [`DcrContext`] that keeps advices in memory and brackets
//! calls routed through [`Weaver::invoke`]. [`HostStager`] and
//! [`ScriptStager`] decide what to stage for host and script objects, and
//! [`HostService`] and [`ScriptService`] plug them into a
//! [`ServiceRegistry`].
//!
//! [`DcrContext`]: grinder_core::DcrContext
//! [`ServiceRegistry`]: grinder_core::ServiceRegistry

#![warn(rust_2018_idioms, unreachable_pub)]

use grinder_core::DcrInstrumenter;

pub use crate::{
    config::WeaverConfig,
    host::HostStager,
    script::{ScriptStager, CALL_METHOD},
    services::{HostService, ScriptService},
    weaver::Weaver,
};

pub mod config;

mod advice;
mod host;
mod script;
mod services;
mod weaver;

/// Instruments host classes and instances.
pub type HostInstrumenter = DcrInstrumenter<HostStager>;

/// Instruments script functions, bound methods and script objects.
pub type ScriptInstrumenter = DcrInstrumenter<ScriptStager>;
