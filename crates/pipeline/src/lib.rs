//! Shader build pipeline for the glslplay preview harness.
//!
//! The crate is graphics-API agnostic: everything GL-shaped is reached
//! through the [`ShaderDevice`] capability trait, so the whole
//! assemble → compile → link path (and its failure handling) can be tested
//! against a mock device. The binary crate supplies a glow-backed device.
//!
//! Modules:
//!
//! - `source` concatenates ordered shader fragments and keeps the offset
//!   table that maps assembled lines back to their originating files.
//! - `compile` and `link` drive a device through stage compilation and
//!   program linking, releasing every handle on the failure paths.
//! - `diagnostics` parses driver info logs and translates reported line
//!   numbers back into fragment-relative locations.
//! - `controller` owns the active program and performs atomic hot-reload.
//! - `clock` tracks pause-aware playback time for the time uniforms.

mod clock;
mod compile;
mod controller;
mod device;
mod diagnostics;
mod error;
mod link;
mod source;

#[cfg(test)]
mod mock;

pub use clock::PlaybackClock;
pub use compile::{compile_stage, CompileFailure};
pub use controller::{PipelineController, ProgramRecipe};
pub use device::{ShaderDevice, StageKind};
pub use diagnostics::{
    parse_compile_log, resolve, Diagnostic, ResolvedDiagnostic, UNKNOWN_FRAGMENT,
};
pub use error::{AssembleError, BuildError};
pub use link::{link_program, LinkFailure, POSITION_ATTRIB_NAME};
pub use source::{assemble, AssembledSource, FragmentSpan, SourceFragment};
