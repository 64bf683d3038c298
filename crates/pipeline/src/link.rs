use crate::device::ShaderDevice;

/// Attribute name the position slot is bound to before linking. The vertex
/// stage must declare an input with this name or the link fails.
pub const POSITION_ATTRIB_NAME: &str = "position";

#[derive(Debug)]
pub enum LinkFailure {
    Device(String),
    Rejected(String),
}

/// Links a vertex and fragment stage into a program, binding
/// [`POSITION_ATTRIB_NAME`] to `position_slot` first.
///
/// Both stages are consumed by the call: they are destroyed once the link
/// attempt concludes, whichever way it goes. A failed link additionally
/// destroys the half-built program, so the failure path leaks nothing.
pub fn link_program<D: ShaderDevice>(
    device: &D,
    vertex: D::Stage,
    fragment: D::Stage,
    position_slot: u32,
) -> Result<D::Program, LinkFailure> {
    let program = match device.create_program() {
        Ok(program) => program,
        Err(err) => {
            device.destroy_stage(vertex);
            device.destroy_stage(fragment);
            return Err(LinkFailure::Device(err));
        }
    };

    device.attach(program, vertex);
    device.attach(program, fragment);
    device.bind_attrib_location(program, position_slot, POSITION_ATTRIB_NAME);
    let linked = device.link(program);

    device.destroy_stage(vertex);
    device.destroy_stage(fragment);

    if linked {
        Ok(program)
    } else {
        let log = device.link_log(program);
        device.destroy_program(program);
        Err(LinkFailure::Rejected(log))
    }
}
