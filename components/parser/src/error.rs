//! Fatal error types for the forgiving reader. Most SGML irregularities
//! are recovered from silently or logged through [`crate::config::ErrorLog`]
//! — `SgmlError` is reserved for conditions the reader cannot recover
//! from at all: a missing resource, a DTD that fails to parse, an entity
//! stack that would recurse forever.

use std::fmt;
use std::io;
use std::sync::Arc;

use sgml_dtd::DtdError;

/// One frame of the entity stack at the point an error was raised,
/// innermost (current) entity last is not assumed — callers push frames
/// from the document entity outward exactly as the stack is laid out at
/// fault time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityContextFrame {
    pub name: String,
    pub line: u64,
    pub column: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityContext {
    pub frames: Vec<EntityContextFrame>,
}

impl EntityContext {
    pub fn push(&mut self, name: impl Into<String>, line: u64, column: u64) {
        self.frames.push(EntityContextFrame {
            name: name.into(),
            line,
            column,
        });
    }
}

impl fmt::Display for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{} ({}:{})", frame.name, frame.line, frame.column)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum SgmlError {
    Io(Arc<io::Error>),
    Dtd(DtdError),
    /// A resource the reader's [`crate::resolver::ResourceResolver`] could
    /// not locate or open (external subset, external entity).
    ResourceNotFound { uri: String, context: EntityContext },
    /// The decoded byte stream could not be interpreted under any
    /// supported encoding (bad BOM, declared label unknown, invalid
    /// UCS-4 scalar value).
    EncodingError { message: String },
    /// The entity stack grew past the reader's recursion guard — almost
    /// always a self-referential entity definition.
    EntityRecursionLimit { name: String, context: EntityContext },
    /// A condition the forgiving engine is deliberately unable to paper
    /// over (e.g. a `DOCTYPE` naming a root element that never appears).
    Fatal { message: String, context: EntityContext },
}

impl fmt::Display for SgmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SgmlError::Io(err) => write!(f, "I/O error: {}", err),
            SgmlError::Dtd(err) => write!(f, "DTD error: {}", err),
            SgmlError::ResourceNotFound { uri, context } => {
                write!(f, "resource not found: {} [{}]", uri, context)
            }
            SgmlError::EncodingError { message } => write!(f, "encoding error: {}", message),
            SgmlError::EntityRecursionLimit { name, context } => {
                write!(f, "entity recursion limit exceeded expanding {:?} [{}]", name, context)
            }
            SgmlError::Fatal { message, context } => write!(f, "{} [{}]", message, context),
        }
    }
}

impl std::error::Error for SgmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SgmlError::Io(err) => Some(err.as_ref()),
            SgmlError::Dtd(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SgmlError {
    fn from(err: io::Error) -> Self {
        SgmlError::Io(Arc::new(err))
    }
}

impl From<DtdError> for SgmlError {
    fn from(err: DtdError) -> Self {
        SgmlError::Dtd(err)
    }
}

pub type SgmlResult<T> = Result<T, SgmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_context_formats_as_chain() {
        let mut ctx = EntityContext::default();
        ctx.push("[document]", 1, 1);
        ctx.push("flow", 12, 4);
        assert_eq!(ctx.to_string(), "[document] (1:1) -> flow (12:4)");
    }
}
