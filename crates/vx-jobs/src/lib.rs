//! Jobs for VX_OS.
//!
//! Each job reads the filesystem, derives one JSON artifact, and writes it
//! back as a root-level file. A failed job writes nothing.

pub mod clock;
pub mod consciousness;
pub mod job;
pub mod omniflow;
pub mod ripple;
pub mod seal;
pub mod xzenith;

pub use clock::{Clock, FixedClock, SystemClock, iso8601};
pub use consciousness::ConsciousnessJob;
pub use job::{Job, JobRegistry, StepReport, failure_reason};
pub use omniflow::OmniflowJob;
pub use ripple::RippleJob;
pub use seal::SealJob;
pub use xzenith::XzenithJob;

/// A registry holding every built-in job, in pipeline order.
pub fn default_registry() -> JobRegistry {
    let mut reg = JobRegistry::new();
    reg.register(Box::new(ConsciousnessJob));
    reg.register(Box::new(RippleJob));
    reg.register(Box::new(SealJob));
    reg.register(Box::new(OmniflowJob));
    reg.register(Box::new(XzenithJob));
    reg
}
