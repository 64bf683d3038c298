use crate::device::{ShaderDevice, StageKind};
use crate::diagnostics::{parse_compile_log, Diagnostic};
use crate::source::AssembledSource;

/// Why a stage failed to materialize. `Rejected` carries the first fatal
/// diagnostic parsed from the info log; translation back to a fragment
/// location happens at the controller, which holds the preamble offset.
#[derive(Debug)]
pub enum CompileFailure {
    Device(String),
    Rejected(Diagnostic),
}

/// Compiles one assembled source as the given stage. On rejection the stage
/// object is destroyed before the diagnostic is returned, so the caller
/// never sees a handle for a failed compile. There is no partial recovery:
/// the first fatal diagnostic aborts the stage.
pub fn compile_stage<D: ShaderDevice>(
    device: &D,
    kind: StageKind,
    source: &AssembledSource,
) -> Result<D::Stage, CompileFailure> {
    let stage = device.create_stage(kind).map_err(CompileFailure::Device)?;
    if device.compile(stage, source.text()) {
        return Ok(stage);
    }

    let log = device.compile_log(stage);
    device.destroy_stage(stage);
    tracing::debug!(stage = %kind, log = log.as_str(), "stage compilation rejected");
    Err(CompileFailure::Rejected(parse_compile_log(kind, &log)))
}
