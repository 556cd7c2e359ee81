//! Index domains (row or column spaces) that vectors and matrices live on.

/// A named index domain of fixed global size.
///
/// Spaces are shared between containers through `Arc<Space>`; two spaces are
/// interchangeable when both name and size agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Space {
    name: String,
    size: usize,
}

impl Space {
    /// Anonymous space of `size` indices.
    pub fn new(size: usize) -> Self {
        Self { name: String::new(), size }
    }

    pub fn named(name: impl Into<String>, size: usize) -> Self {
        Self { name: name.into(), size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "Space({})", self.size)
        } else {
            write!(f, "Space({}, {})", self.name, self.size)
        }
    }
}
