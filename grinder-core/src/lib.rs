//! The instrumentation core of grinder.
//!
//! A worker wraps targets of user scripts under [`Test`]s so that every call
//! is bracketed by a [`Recorder`]. [`Instrumenter`]s decide how a target is
//! wrapped, [`CompositeInstrumenter`] chains them by priority, and
//! [`DcrInstrumenter`] stages changes into a [`DcrContext`] and commits them
//! atomically.

#![warn(rust_2018_idioms, unreachable_pub)]

#[macro_use]
extern crate static_assertions;

pub use crate::{
    class::{Class, ClassBuilder, ClassKind, Member, MemberId, MemberKind},
    dcr::{DcrContext, TargetSource},
    errors::{
        InvokeError, NonInstrumentableTypeError, NotWrappableTypeError, RecorderError,
        WeavingError,
    },
    filter::{AllInstrumentation, InstrumentationFilter, ALL_INSTRUMENTATION},
    instrumenter::{
        CompositeInstrumenter, DcrInstrumenter, Instrumenter, MasterInstrumenter,
        RejectNullInstrumenter, Stager, Wrapped,
    },
    object::{Object, ObjectKind},
    recorder::{bracket, Recorder, RecorderFactory},
    registry::{RegisteredTest, TestRegistry},
    services::{ScriptEngineService, ServiceRegistry},
    test_case::{Test, TestNumber},
};

pub mod config;
pub mod errors;

mod class;
mod dcr;
mod filter;
mod instrumenter;
mod object;
mod recorder;
mod registry;
mod services;
mod test_case;
