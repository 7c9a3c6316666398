//! Pseudo-paths (§4.7 "`/a/b/*` style, `*` only as a standalone segment")
//! identifying a property or a wildcard "every element" position inside a
//! pattern or a value being migrated.

use crate::error::MigrationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Name(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PseudoPath(Vec<PathSegment>);

impl PseudoPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses `/a/b/*`-style text. Rejects a trailing slash (except the bare
    /// root `/`) and any segment mixing `*` with other characters.
    pub fn parse(text: &str) -> Result<Self, MigrationError> {
        if text == "/" {
            return Ok(Self::root());
        }
        if !text.starts_with('/') || text.ends_with('/') {
            return Err(MigrationError::InvalidMigrationPseudoPath(text.to_string()));
        }
        let mut segments = Vec::new();
        for part in text[1..].split('/') {
            if part.is_empty() {
                return Err(MigrationError::InvalidMigrationPseudoPath(text.to_string()));
            }
            if part == "*" {
                segments.push(PathSegment::Wildcard);
            } else if part.contains('*') {
                return Err(MigrationError::InvalidMigrationPseudoPath(text.to_string()));
            } else {
                segments.push(PathSegment::Name(part.to_string()));
            }
        }
        Ok(Self(segments))
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }
}

impl std::fmt::Display for PseudoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            match segment {
                PathSegment::Name(name) => write!(f, "/{name}")?,
                PathSegment::Wildcard => write!(f, "/*")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_wildcard_segments() {
        let path = PseudoPath::parse("/a/b/*").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Name("a".to_string()),
                PathSegment::Name("b".to_string()),
                PathSegment::Wildcard,
            ]
        );
    }

    #[test]
    fn root_parses_to_empty_path() {
        assert_eq!(PseudoPath::parse("/").unwrap(), PseudoPath::root());
    }

    #[test]
    fn trailing_slash_is_invalid() {
        assert!(PseudoPath::parse("/a/").is_err());
    }

    #[test]
    fn wildcard_mixed_with_text_is_invalid() {
        assert!(PseudoPath::parse("/a*b").is_err());
    }
}
