//! Backend selection.
//!
//! A backend is picked with the [`BackendKind`] tag. [`Backend::init`] performs the
//! one-time runtime setup for that kind and returns the handle that every matrix,
//! vector and solver constructor asks for, so nothing tied to a backend can exist
//! before its runtime is up.
//!
//! | Backend | Matrix layout | Algebra |
//! |---------|---------------|---------|
//! | `Native` | local rows, global columns | full contract |
//! | `ParCsr` | diag / offd split | `norm2`, `mult`, `mult_transpose`, `axpy`, `copy`, `dot`, `scal` |

use std::fmt;
use std::str::FromStr;

use crate::core::traits::LinearAlgebra;
use crate::error::KError;
use crate::parallel::UniverseComm;

pub mod native;
pub mod parcsr;
pub mod runtime;

pub use native::NativeAlgebra;
pub use parcsr::ParCsrAlgebra;
pub use runtime::{RuntimeConfig, RuntimeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Native,
    ParCsr,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Native, BackendKind::ParCsr];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::ParCsr => "parcsr",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "parcsr" => Ok(BackendKind::ParCsr),
            _ => Err(KError::InvalidOption(format!("unknown backend '{s}' (native|parcsr)"))),
        }
    }
}

/// Proof that a backend's runtime has been initialized in this process.
#[derive(Debug, Clone, Copy)]
pub struct Backend {
    kind: BackendKind,
    state: &'static RuntimeState,
}

impl Backend {
    /// Initializes `kind` if needed, with device visibility taken from the environment.
    /// Later calls return a handle to the same runtime state.
    pub fn init(kind: BackendKind, comm: &UniverseComm) -> Backend {
        Self::init_with(kind, comm, &RuntimeConfig::from_env())
    }

    /// Like [`init`](Self::init); `config` only has an effect on the first call for `kind`.
    pub fn init_with(kind: BackendKind, comm: &UniverseComm, config: &RuntimeConfig) -> Backend {
        let state = runtime::init_if_needed(kind, comm, config);
        Backend { kind, state }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn runtime(&self) -> &'static RuntimeState {
        self.state
    }

    pub fn algebra(&self) -> Box<dyn LinearAlgebra> {
        algebra_factory(self.kind)
    }
}

/// Algebra implementation bound to `kind`'s native containers.
pub fn algebra_factory(kind: BackendKind) -> Box<dyn LinearAlgebra> {
    match kind {
        BackendKind::Native => Box::new(NativeAlgebra),
        BackendKind::ParCsr => Box::new(ParCsrAlgebra),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.name().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!("ParCSR".parse::<BackendKind>().unwrap(), BackendKind::ParCsr);
        assert!("hypre".parse::<BackendKind>().is_err());
    }

    #[test]
    fn factory_is_tagged_by_kind() {
        for kind in BackendKind::ALL {
            assert_eq!(algebra_factory(kind).backend(), kind);
        }
    }
}
