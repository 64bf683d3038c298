use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::ResolvedDiagnostic;

/// Failures while reading and concatenating shader source fragments.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("missing shader fragment {path}")]
    MissingFragment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("assembled shader source is empty")]
    EmptySource,
}

/// Anything that can go wrong while producing a linked program.
///
/// A `BuildError` always describes a fully cleaned-up attempt: whatever
/// stage/program handles the attempt allocated have been released by the
/// time the error reaches the caller.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("{0}")]
    Compile(ResolvedDiagnostic),

    #[error("program link failed: {0}")]
    Link(String),

    #[error("graphics device rejected a request: {0}")]
    Device(String),
}
