use crate::core::Vector;
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// No preconditioning: z = r.
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Preconditioner for Identity {
    fn apply(&self, r: &Vector, z: &mut Vector) -> Result<(), KError> {
        r.ensure_same_layout(z, "identity")?;
        z.values_mut().copy_from_slice(r.values());
        Ok(())
    }
}
