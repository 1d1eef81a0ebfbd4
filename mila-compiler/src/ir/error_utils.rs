use crate::{CompileError, SemanticErrorKind};

/// Helper to create generation faults with a consistent message shape
pub fn make_semantic_error(kind: SemanticErrorKind, message: String) -> CompileError {
    tracing::debug!(%kind, %message, "generation fault");
    CompileError::Semantic {
        kind,
        message,
        statement: None,
        location: None,
    }
}

pub fn unbound(name: &str) -> CompileError {
    make_semantic_error(
        SemanticErrorKind::UnboundIdentifier,
        format!("Identifier '{}' was not declared", name),
    )
}
