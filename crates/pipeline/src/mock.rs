//! Scriptable stand-in for a GL context. Tracks live stage/program handles
//! so tests can assert that every failure path releases what it allocated,
//! and fails compilation of any source containing [`COMPILE_ERROR_MARKER`]
//! with an NVIDIA-shaped log pointing at the marker's line.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::device::{ShaderDevice, StageKind};

/// Token that makes the mock reject a compile, the way a syntax error would.
pub const COMPILE_ERROR_MARKER: &str = "__SYNTAX_ERROR__";

#[derive(Default)]
struct MockState {
    next_id: Cell<u32>,
    live_stages: Cell<i32>,
    live_programs: Cell<i32>,
    compile_logs: RefCell<HashMap<u32, String>>,
    link_failure: RefCell<Option<String>>,
}

#[derive(Clone, Default)]
pub struct MockDevice {
    state: Rc<MockState>,
}

impl MockDevice {
    pub fn live_stages(&self) -> i32 {
        self.state.live_stages.get()
    }

    pub fn live_programs(&self) -> i32 {
        self.state.live_programs.get()
    }

    /// Makes the next link attempt fail with the given log.
    pub fn fail_next_link(&self, log: &str) {
        *self.state.link_failure.borrow_mut() = Some(log.to_string());
    }

    fn fresh_id(&self) -> u32 {
        let id = self.state.next_id.get() + 1;
        self.state.next_id.set(id);
        id
    }
}

impl ShaderDevice for MockDevice {
    type Stage = u32;
    type Program = u32;

    fn create_stage(&self, _kind: StageKind) -> Result<Self::Stage, String> {
        self.state.live_stages.set(self.state.live_stages.get() + 1);
        Ok(self.fresh_id())
    }

    fn compile(&self, stage: Self::Stage, source: &str) -> bool {
        let marker_line = source
            .lines()
            .position(|line| line.contains(COMPILE_ERROR_MARKER));
        match marker_line {
            Some(index) => {
                let log = format!("0({}) : error C0000: syntax error", index + 1);
                self.state.compile_logs.borrow_mut().insert(stage, log);
                false
            }
            None => true,
        }
    }

    fn compile_log(&self, stage: Self::Stage) -> String {
        self.state
            .compile_logs
            .borrow()
            .get(&stage)
            .cloned()
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        self.state
            .live_programs
            .set(self.state.live_programs.get() + 1);
        Ok(self.fresh_id())
    }

    fn attach(&self, _program: Self::Program, _stage: Self::Stage) {}

    fn bind_attrib_location(&self, _program: Self::Program, _slot: u32, _name: &str) {}

    fn link(&self, _program: Self::Program) -> bool {
        self.state.link_failure.borrow().is_none()
    }

    fn link_log(&self, _program: Self::Program) -> String {
        self.state
            .link_failure
            .borrow_mut()
            .take()
            .unwrap_or_default()
    }

    fn destroy_stage(&self, _stage: Self::Stage) {
        self.state.live_stages.set(self.state.live_stages.get() - 1);
    }

    fn destroy_program(&self, _program: Self::Program) {
        self.state
            .live_programs
            .set(self.state.live_programs.get() - 1);
    }
}
