//! Instrumentation of scripted load tests.
//!
//! A worker builds an [`Instrumentation`] from [`GrinderConfig`], registers
//! its tests and records their targets. Every call of a recorded target is
//! then timed under its test and summarised by [`telemeter::Statistics`].
//!
//! # Example
//! ```
//! use grinder::{dcr::CALL_METHOD, prelude::*};
//!
//! let function = Class::builder("script::Function")
//!     .kind(ClassKind::Script)
//!     .method(CALL_METHOD, 1)
//!     .build();
//! let login = Object::instance(&function, ());
//!
//! let instrumentation = Instrumentation::new(&GrinderConfig::default());
//! let test = instrumentation.register(&Test::new(1, "login"));
//! test.record(&login).unwrap();
//!
//! let weaver = instrumentation.weaver().unwrap();
//! let call = function.find_method(CALL_METHOD).unwrap();
//! weaver.invoke(call, &[login.clone()], || Ok::<_, String>(())).unwrap();
//!
//! let snapshot = instrumentation.statistics().snapshot();
//! assert_eq!(snapshot[0].1.successes, 1);
//! ```

#![warn(rust_2018_idioms, unreachable_pub)]

pub use grinder_core::*;
pub use grinder_dcr as dcr;
pub use grinder_telemeter as telemeter;
#[cfg(feature = "test-util")]
pub use grinder_test as test;

pub use crate::setup::{default_services, GrinderConfig, Instrumentation};

/// Types needed to record tests.
pub mod prelude {
    pub use super::{
        Class, ClassKind, GrinderConfig, Instrumentation, Instrumenter, Object, RegisteredTest,
        Test,
    };
}

mod setup;
