pub mod artifacts;
pub mod canonical;
pub mod certs;
pub mod config;
pub mod detect;
pub mod doctor;
pub mod error;
pub mod git;
pub mod io;
pub mod lifecycle;
pub mod orchestrator;
pub mod paths;
pub mod process;
pub mod registry;
pub mod templates;
pub mod validate;

pub use config::Config;
pub use error::{DevinfraError, ErrorKind, Result};
pub use registry::{Project, Registry, Service};
