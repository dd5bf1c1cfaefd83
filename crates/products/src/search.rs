use estoque_core::ProductCode;

/// How a free-text search term is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// All-digit term: exact code lookup.
    Code(ProductCode),
    /// All-digit term too large to be a code; matches nothing.
    UnknownCode,
    /// Anything else: case-insensitive substring match on the name.
    Name(String),
}

impl SearchTerm {
    /// Classify a raw term. Returns `None` for an empty term.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return Some(match raw.parse::<i64>() {
                Ok(v) => Self::Code(ProductCode::new(v)),
                Err(_) => Self::UnknownCode,
            });
        }
        Some(Self::Name(raw.to_string()))
    }
}
