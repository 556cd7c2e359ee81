//! Solver and preconditioner selection, plus stopping criteria.
//!
//! `SolverOptions` is the construction-time configuration handed to a
//! [`KspContext`](crate::context::KspContext). Names parse case-insensitively
//! from the strings the benchmark driver accepts (`CG`, `GMRES`, `BICG`,
//! `BICGSTAB`; `Jacobi`, `NoPC`).

use std::fmt;
use std::str::FromStr;

use crate::error::KError;

/// Krylov method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Conjugate Gradient (SPD systems)
    Cg,
    /// Restarted GMRES, right preconditioned
    Gmres,
    /// BiConjugate Gradient (uses Aᵀ)
    BiCg,
    /// BiCGSTAB, right preconditioned
    BiCgStab,
}

impl SolverKind {
    pub const ALL: [SolverKind; 4] = [SolverKind::Cg, SolverKind::Gmres, SolverKind::BiCg, SolverKind::BiCgStab];

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Cg => "CG",
            SolverKind::Gmres => "GMRES",
            SolverKind::BiCg => "BICG",
            SolverKind::BiCgStab => "BICGSTAB",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CG" => Ok(SolverKind::Cg),
            "GMRES" => Ok(SolverKind::Gmres),
            "BICG" => Ok(SolverKind::BiCg),
            "BICGSTAB" => Ok(SolverKind::BiCgStab),
            _ => Err(KError::InvalidOption(format!("unknown solver '{s}' (CG|GMRES|BICG|BICGSTAB)"))),
        }
    }
}

/// Preconditioner family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcKind {
    /// Inverse of the matrix diagonal
    Jacobi,
    /// No preconditioning
    NoPc,
}

impl PcKind {
    pub const ALL: [PcKind; 2] = [PcKind::Jacobi, PcKind::NoPc];

    pub fn name(self) -> &'static str {
        match self {
            PcKind::Jacobi => "Jacobi",
            PcKind::NoPc => "NoPC",
        }
    }
}

impl fmt::Display for PcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PcKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jacobi" => Ok(PcKind::Jacobi),
            "nopc" | "none" => Ok(PcKind::NoPc),
            _ => Err(KError::InvalidOption(format!("unknown preconditioner '{s}' (Jacobi|NoPC)"))),
        }
    }
}

/// Solver options.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub solver: SolverKind,
    pub preconditioner: PcKind,

    /// Iteration cap (must be positive)
    pub max_iterations: usize,

    /// Relative residual target ‖b − Ax‖/‖b‖ (must be positive)
    pub tolerance: f64,

    /// Krylov dimension between GMRES restarts
    pub restart: usize,

    /// Start from the incoming `x` instead of zero
    pub nonzero_initial_guess: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            solver: SolverKind::Cg,
            preconditioner: PcKind::Jacobi,
            max_iterations: 500,
            tolerance: 1e-9,
            restart: 30,
            nonzero_initial_guess: false,
        }
    }
}

impl SolverOptions {
    pub fn new(solver: SolverKind, preconditioner: PcKind) -> Self {
        Self { solver, preconditioner, ..Self::default() }
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_restart(mut self, m: usize) -> Self {
        self.restart = m;
        self
    }

    pub fn with_nonzero_initial_guess(mut self, on: bool) -> Self {
        self.nonzero_initial_guess = on;
        self
    }

    pub fn validate(&self) -> Result<(), KError> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(KError::InvalidOption(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        if self.max_iterations == 0 {
            return Err(KError::InvalidOption("max_iterations must be positive".into()));
        }
        if self.restart == 0 {
            return Err(KError::InvalidOption("restart must be positive".into()));
        }
        Ok(())
    }
}
