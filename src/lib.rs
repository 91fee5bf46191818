// THEORY:
// This file is the main entry point for the `sphere_seeker` library crate.
// The public API is the `ServoNode` in `pipeline` together with its
// configuration (`SeekerConfig`) and the transport seams (`FrameSource`,
// `VelocitySink`). The vision and control internals live in `core_modules`
// and are public so they can be exercised on their own, e.g. to run the
// detector on a single still image.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod transport;

pub use config::SeekerConfig;
pub use error::{Result, SeekerError};
pub use pipeline::{RunSummary, ServoNode};
