//! The algebra operation contract every backend implements.

use bitflags::bitflags;

use crate::backend::BackendKind;
use crate::core::vector::Vector;
use crate::error::KError;
use crate::matrix::Matrix;

bitflags! {
    /// Operations a backend implements natively.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct AlgebraOps: u32 {
        const NORM0          = 1 << 0;
        const NORM1          = 1 << 1;
        const NORM2          = 1 << 2;
        const MULT           = 1 << 3;
        const MULT_TRANSPOSE = 1 << 4;
        const AXPY           = 1 << 5;
        const AYPX           = 1 << 6;
        const COPY           = 1 << 7;
        const DOT            = 1 << 8;
        const SCAL           = 1 << 9;
        const DIAGONAL       = 1 << 10;
        const RECIPROCAL     = 1 << 11;
        const POINTWISE_MULT = 1 << 12;
        const NORMS = Self::NORM0.bits() | Self::NORM1.bits() | Self::NORM2.bits();
    }
}

/// Vector and matrix primitives over distributed containers.
///
/// Every provided method fails with [`KError::Unsupported`]; a backend overrides the
/// operations it really implements and lists them in [`capabilities`](Self::capabilities).
/// Nothing here ever falls back to a default value.
///
/// Norms, `dot`, `mult` and `mult_transpose` are collective over the communicator
/// of the operands' distribution. Every other operation is purely local.
pub trait LinearAlgebra: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn capabilities(&self) -> AlgebraOps;

    fn unsupported(&self, op: &'static str) -> KError {
        KError::Unsupported { backend: self.backend(), op }
    }

    /// Infinity norm, `max |x_i|` over all ranks.
    fn norm0(&self, _x: &Vector) -> Result<f64, KError> {
        Err(self.unsupported("norm0"))
    }

    /// `sum |x_i|` over all ranks.
    fn norm1(&self, _x: &Vector) -> Result<f64, KError> {
        Err(self.unsupported("norm1"))
    }

    /// Euclidean norm, `sqrt(dot(x, x))`.
    fn norm2(&self, x: &Vector) -> Result<f64, KError> {
        Ok(self.dot(x, x)?.sqrt())
    }

    /// `r := A x`. `x` lives on the column space of `A`, `r` on its row space.
    fn mult(&self, _a: &Matrix, _x: &Vector, _r: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("mult"))
    }

    /// `r := Aᵀ x`. `x` lives on the row space of `A`, `r` on its column space.
    fn mult_transpose(&self, _a: &Matrix, _x: &Vector, _r: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("mult_transpose"))
    }

    /// `r := alpha x + r`.
    fn axpy(&self, _alpha: f64, _x: &Vector, _r: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("axpy"))
    }

    /// `y := x + alpha y`. Note the scaled operand is `y`, not `x`.
    fn aypx(&self, _alpha: f64, _y: &mut Vector, _x: &Vector) -> Result<(), KError> {
        Err(self.unsupported("aypx"))
    }

    /// `r := x`; `r` keeps its own storage.
    fn copy(&self, _x: &Vector, _r: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("copy"))
    }

    fn dot(&self, _x: &Vector, _y: &Vector) -> Result<f64, KError> {
        Err(self.unsupported("dot"))
    }

    /// `x := alpha x`.
    fn scal(&self, _alpha: f64, _x: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("scal"))
    }

    /// `x_i := A_ii` for the locally owned rows.
    fn diagonal(&self, _a: &Matrix, _x: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("diagonal"))
    }

    /// `x_i := 1 / x_i`.
    ///
    /// Backends that implement this reject zero entries with [`KError::ZeroEntry`]
    /// and leave `x` untouched.
    fn reciprocal(&self, _x: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("reciprocal"))
    }

    /// `w_i := x_i y_i`.
    fn pointwise_mult(&self, _x: &Vector, _y: &Vector, _w: &mut Vector) -> Result<(), KError> {
        Err(self.unsupported("pointwise_mult"))
    }
}
