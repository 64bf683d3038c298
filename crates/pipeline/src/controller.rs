//! Owns the build pipeline end to end: assemble both stages, compile, link,
//! and keep exactly one program alive for the render loop. Reloads are
//! atomic from the caller's point of view: the previous program stays bound
//! and valid unless and until a complete replacement exists.

use std::path::PathBuf;

use crate::compile::{compile_stage, CompileFailure};
use crate::device::{ShaderDevice, StageKind};
use crate::diagnostics::resolve;
use crate::error::BuildError;
use crate::link::{link_program, LinkFailure};
use crate::source::{assemble, AssembledSource};

/// Ordered source-file lists for the two stages of one program.
#[derive(Debug, Clone)]
pub struct ProgramRecipe {
    pub vertex: Vec<PathBuf>,
    pub fragment: Vec<PathBuf>,
}

/// Drives assemble → compile → link against a [`ShaderDevice`] and owns the
/// resulting program exclusively.
pub struct PipelineController<D: ShaderDevice> {
    device: D,
    recipe: ProgramRecipe,
    preamble_lines: u32,
    position_slot: u32,
    active: Option<D::Program>,
}

impl<D: ShaderDevice> PipelineController<D> {
    /// `preamble_lines` is the driver-specific number of lines the compiler
    /// injects ahead of the assembled buffer; it comes from configuration,
    /// never from guessing.
    pub fn new(device: D, recipe: ProgramRecipe, preamble_lines: u32, position_slot: u32) -> Self {
        Self {
            device,
            recipe,
            preamble_lines,
            position_slot,
            active: None,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Handle of the program currently installed for rendering.
    pub fn active(&self) -> Option<D::Program> {
        self.active
    }

    /// Runs the full pipeline and returns a fresh program without touching
    /// the active one. Every failure path releases whatever the attempt had
    /// allocated before the error is returned.
    pub fn build(&self) -> Result<D::Program, BuildError> {
        let vertex_source = assemble(&self.recipe.vertex)?;
        let fragment_source = assemble(&self.recipe.fragment)?;

        let vertex = compile_stage(&self.device, StageKind::Vertex, &vertex_source)
            .map_err(|failure| self.compile_error(failure, &vertex_source))?;
        let fragment = match compile_stage(&self.device, StageKind::Fragment, &fragment_source) {
            Ok(stage) => stage,
            Err(failure) => {
                self.device.destroy_stage(vertex);
                return Err(self.compile_error(failure, &fragment_source));
            }
        };

        link_program(&self.device, vertex, fragment, self.position_slot).map_err(
            |failure| match failure {
                LinkFailure::Device(err) => BuildError::Device(err),
                LinkFailure::Rejected(log) => BuildError::Link(log),
            },
        )
    }

    /// Rebuilds from the current source files and swaps the active program,
    /// disposing the old one. On failure the previously active program is
    /// left untouched and rendering can continue with it.
    pub fn reload(&mut self) -> Result<(), BuildError> {
        let fresh = self.build()?;
        if let Some(old) = self.active.replace(fresh) {
            self.device.destroy_program(old);
        }
        tracing::info!(
            fragments = self.recipe.fragment.len(),
            "shader program rebuilt"
        );
        Ok(())
    }

    fn compile_error(&self, failure: CompileFailure, source: &AssembledSource) -> BuildError {
        match failure {
            CompileFailure::Device(err) => BuildError::Device(err),
            CompileFailure::Rejected(diag) => {
                BuildError::Compile(resolve(&diag, source, self.preamble_lines))
            }
        }
    }
}

impl<D: ShaderDevice> Drop for PipelineController<D> {
    fn drop(&mut self) {
        if let Some(program) = self.active.take() {
            self.device.destroy_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::error::{AssembleError, BuildError};
    use crate::mock::{MockDevice, COMPILE_ERROR_MARKER};

    const GOOD_VERTEX: &str = "in vec2 position;\nvoid main() {}\n";
    const GOOD_FRAGMENT: &str = "out vec4 color;\nvoid main() { color = vec4(1.0); }\n";

    struct Fixture {
        _dir: TempDir,
        vertex: PathBuf,
        prelude: PathBuf,
        body: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let vertex = dir.path().join("vertex.glsl");
            let prelude = dir.path().join("prelude.glsl");
            let body = dir.path().join("playground.glsl");
            fs::write(&vertex, GOOD_VERTEX).unwrap();
            fs::write(&prelude, "uniform float time;\n").unwrap();
            fs::write(&body, GOOD_FRAGMENT).unwrap();
            Self {
                _dir: dir,
                vertex,
                prelude,
                body,
            }
        }

        fn controller(&self) -> PipelineController<MockDevice> {
            let recipe = ProgramRecipe {
                vertex: vec![self.vertex.clone()],
                fragment: vec![self.prelude.clone(), self.body.clone()],
            };
            PipelineController::new(MockDevice::default(), recipe, 0, 0)
        }
    }

    #[test]
    fn reload_installs_a_program_and_releases_stages() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();

        controller.reload().expect("initial build");
        assert!(controller.active().is_some());
        assert_eq!(controller.device().live_stages(), 0);
        assert_eq!(controller.device().live_programs(), 1);
    }

    #[test]
    fn successful_reload_swaps_and_disposes_the_old_program() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();

        controller.reload().expect("initial build");
        let first = controller.active().unwrap();
        controller.reload().expect("second build");
        let second = controller.active().unwrap();

        assert_ne!(first, second);
        assert_eq!(controller.device().live_programs(), 1);
    }

    #[test]
    fn failed_reload_keeps_the_previous_program() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();

        controller.reload().expect("initial build");
        let survivor = controller.active().unwrap();
        let baseline_stages = controller.device().live_stages();

        fs::write(
            &fixture.body,
            format!("void main() {{ {COMPILE_ERROR_MARKER} }}\n"),
        )
        .unwrap();
        let err = controller.reload().expect_err("broken source must fail");

        match err {
            BuildError::Compile(resolved) => {
                assert_eq!(resolved.fragment_name, fixture.body.display().to_string());
                // The marker sits on line 1 of the body, line 2 of the buffer.
                assert_eq!(resolved.assembled_line, Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(controller.active(), Some(survivor));
        assert_eq!(controller.device().live_stages(), baseline_stages);
        assert_eq!(controller.device().live_programs(), 1);
    }

    #[test]
    fn vertex_failure_aborts_before_fragment_stage() {
        let fixture = Fixture::new();
        fs::write(
            &fixture.vertex,
            format!("{COMPILE_ERROR_MARKER}\n"),
        )
        .unwrap();
        let mut controller = fixture.controller();

        let err = controller.reload().expect_err("vertex stage must fail");
        match err {
            BuildError::Compile(resolved) => {
                assert_eq!(resolved.stage, StageKind::Vertex);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(controller.active().is_none());
        assert_eq!(controller.device().live_stages(), 0);
        assert_eq!(controller.device().live_programs(), 0);
    }

    #[test]
    fn fragment_failure_releases_the_compiled_vertex_stage() {
        let fixture = Fixture::new();
        fs::write(&fixture.body, format!("{COMPILE_ERROR_MARKER}\n")).unwrap();
        let mut controller = fixture.controller();

        controller.reload().expect_err("fragment stage must fail");
        assert_eq!(controller.device().live_stages(), 0);
        assert_eq!(controller.device().live_programs(), 0);
    }

    #[test]
    fn link_failure_releases_every_handle() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();
        controller.device().fail_next_link("attribute mismatch");

        let err = controller.reload().expect_err("link must fail");
        assert!(matches!(err, BuildError::Link(log) if log == "attribute mismatch"));
        assert_eq!(controller.device().live_stages(), 0);
        assert_eq!(controller.device().live_programs(), 0);
        assert!(controller.active().is_none());
    }

    #[test]
    fn missing_fragment_surfaces_as_assemble_error() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();
        fs::remove_file(&fixture.prelude).unwrap();

        let err = controller.reload().expect_err("missing file must fail");
        assert!(matches!(
            err,
            BuildError::Assemble(AssembleError::MissingFragment { .. })
        ));
        assert_eq!(controller.device().live_stages(), 0);
        assert_eq!(controller.device().live_programs(), 0);
    }

    #[test]
    fn drop_disposes_the_active_program() {
        let fixture = Fixture::new();
        let mut controller = fixture.controller();
        controller.reload().expect("initial build");
        let device = controller.device().clone();

        drop(controller);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_stages(), 0);
    }
}
