//! Reading systems from Matrix Market interchange files.

pub mod matrix_market;
pub use matrix_market::{
    parse_matrix_market, parse_vector, read_matrix_market, read_vector, vector_from_values, MatrixMarket, ReadError,
};
