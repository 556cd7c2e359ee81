//! Matrix Market reader.
//!
//! Matrices: `%%MatrixMarket matrix coordinate {real|integer|pattern}
//! {general|symmetric|skew-symmetric}`, 1-based entries, returned 0-based with
//! the symmetric half mirrored. Vectors: `%` comment lines, then a line whose
//! first token is the length, then one value per line (this also accepts the
//! `array` flavour, whose size line is `n 1`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::backend::Backend;
use crate::core::{Distribution, MatrixDistribution, Space, Vector, VectorWriter};
use crate::error::KError;
use crate::matrix::{Matrix, MatrixBuilder};
use crate::parallel::UniverseComm;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}:{line}: {msg}")]
    Parse { origin: String, line: usize, msg: String },
    #[error("{origin}: unsupported Matrix Market header '{header}'")]
    Header { origin: String, header: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

/// A sparse matrix read from a Matrix Market file, 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixMarket {
    pub nrows: usize,
    pub ncols: usize,
    pub entries: Vec<(usize, usize, f64)>,
}

impl MatrixMarket {
    /// Distributes rows uniformly over `comm` and assembles this rank's share.
    pub fn assemble(&self, backend: &Backend, comm: Arc<UniverseComm>) -> Result<Matrix, KError> {
        let row = Arc::new(Distribution::uniform(self.nrows, Arc::clone(&comm)));
        let col = if self.nrows == self.ncols {
            Arc::clone(&row)
        } else {
            Arc::new(Distribution::uniform(self.ncols, comm))
        };
        let mut builder = MatrixBuilder::new(
            Arc::new(Space::named("rows", self.nrows)),
            Arc::new(Space::named("cols", self.ncols)),
            MatrixDistribution::new(Arc::clone(&row), col),
        )?;
        for &(i, j, v) in self.entries.iter().filter(|e| row.to_local(e.0).is_some()) {
            builder.add(i, j, v)?;
        }
        builder.build(backend)
    }
}

struct Lines<R> {
    inner: std::io::Lines<R>,
    origin: String,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R, origin: &str) -> Self {
        Self { inner: reader.lines(), origin: origin.to_string(), line: 0 }
    }

    fn err(&self, msg: impl Into<String>) -> ReadError {
        ReadError::Parse { origin: self.origin.clone(), line: self.line, msg: msg.into() }
    }

    /// Next raw line, or `None` at end of input.
    fn raw(&mut self) -> Result<Option<String>, ReadError> {
        match self.inner.next() {
            None => Ok(None),
            Some(Ok(s)) => {
                self.line += 1;
                Ok(Some(s))
            }
            Some(Err(source)) => Err(ReadError::Io { path: PathBuf::from(&self.origin), source }),
        }
    }

    /// Next line that is neither a comment nor blank.
    fn data(&mut self) -> Result<Option<String>, ReadError> {
        while let Some(s) = self.raw()? {
            let t = s.trim();
            if !t.is_empty() && !t.starts_with('%') {
                return Ok(Some(t.to_string()));
            }
        }
        Ok(None)
    }

    fn parse<T: std::str::FromStr>(&self, token: Option<&str>, what: &str) -> Result<T, ReadError> {
        let token = token.ok_or_else(|| self.err(format!("missing {what}")))?;
        token.parse().map_err(|_| self.err(format!("bad {what} '{token}'")))
    }
}

fn parse_header(header: &str, origin: &str) -> Result<(Field, Symmetry), ReadError> {
    let unsupported = || ReadError::Header { origin: origin.to_string(), header: header.to_string() };
    let words: Vec<String> = header.split_whitespace().map(str::to_ascii_lowercase).collect();
    if words.len() < 5 || words[0] != "%%matrixmarket" || words[1] != "matrix" || words[2] != "coordinate" {
        return Err(unsupported());
    }
    let field = match words[3].as_str() {
        "real" | "integer" | "double" => Field::Real,
        "pattern" => Field::Pattern,
        _ => return Err(unsupported()),
    };
    let symmetry = match words[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        _ => return Err(unsupported()),
    };
    Ok((field, symmetry))
}

/// Parses a coordinate matrix; `origin` names the source in error messages.
pub fn parse_matrix_market<R: BufRead>(reader: R, origin: &str) -> Result<MatrixMarket, ReadError> {
    let mut lines = Lines::new(reader, origin);
    let header = lines.raw()?.ok_or_else(|| lines.err("empty file"))?;
    let (field, symmetry) = parse_header(&header, origin)?;

    let size = lines.data()?.ok_or_else(|| lines.err("missing size line"))?;
    let mut tok = size.split_whitespace();
    let nrows: usize = lines.parse(tok.next(), "row count")?;
    let ncols: usize = lines.parse(tok.next(), "column count")?;
    let nnz: usize = lines.parse(tok.next(), "entry count")?;

    let mut entries = Vec::with_capacity(if symmetry == Symmetry::General { nnz } else { 2 * nnz });
    for _ in 0..nnz {
        let line = lines.data()?.ok_or_else(|| lines.err(format!("expected {nnz} entries")))?;
        let mut tok = line.split_whitespace();
        let i: usize = lines.parse(tok.next(), "row index")?;
        let j: usize = lines.parse(tok.next(), "column index")?;
        if i == 0 || j == 0 || i > nrows || j > ncols {
            return Err(lines.err(format!("entry ({i}, {j}) outside {nrows}x{ncols}")));
        }
        let v = match field {
            Field::Real => lines.parse(tok.next(), "value")?,
            Field::Pattern => 1.0,
        };
        let (i, j) = (i - 1, j - 1);
        entries.push((i, j, v));
        if i != j {
            match symmetry {
                Symmetry::General => {}
                Symmetry::Symmetric => entries.push((j, i, v)),
                Symmetry::SkewSymmetric => entries.push((j, i, -v)),
            }
        }
    }
    log::debug!("{origin}: {nrows}x{ncols}, {} stored entries", entries.len());
    Ok(MatrixMarket { nrows, ncols, entries })
}

/// Parses a vector: size line, then one value per line.
pub fn parse_vector<R: BufRead>(reader: R, origin: &str) -> Result<Vec<f64>, ReadError> {
    let mut lines = Lines::new(reader, origin);
    let size = lines.data()?.ok_or_else(|| lines.err("missing size line"))?;
    let n: usize = lines.parse(size.split_whitespace().next(), "vector length")?;
    let mut values = Vec::with_capacity(n);
    while let Some(line) = lines.data()? {
        if values.len() == n {
            return Err(lines.err(format!("more than {n} values")));
        }
        values.push(lines.parse(line.split_whitespace().next(), "value")?);
    }
    if values.len() != n {
        return Err(lines.err(format!("expected {n} values, found {}", values.len())));
    }
    Ok(values)
}

fn open(path: &Path) -> Result<BufReader<File>, ReadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ReadError::Io { path: path.to_path_buf(), source })
}

pub fn read_matrix_market(path: impl AsRef<Path>) -> Result<MatrixMarket, ReadError> {
    let path = path.as_ref();
    parse_matrix_market(open(path)?, &path.display().to_string())
}

pub fn read_vector(path: impl AsRef<Path>) -> Result<Vec<f64>, ReadError> {
    let path = path.as_ref();
    parse_vector(open(path)?, &path.display().to_string())
}

/// Builds a vector over `space` / `dist` from global `values`, keeping this rank's block.
pub fn vector_from_values(
    backend: &Backend,
    space: Arc<Space>,
    dist: Arc<Distribution>,
    values: &[f64],
) -> Result<Vector, KError> {
    if values.len() != dist.global_size() {
        return Err(KError::shape(
            "vector_from_values",
            format!("{} values for global size {}", values.len(), dist.global_size()),
        ));
    }
    let range = dist.local_range();
    let mut writer = VectorWriter::new(Vector::new(backend, space, dist)?);
    writer.as_mut_slice().copy_from_slice(&values[range]);
    Ok(writer.release())
}
