//! Errors collected while resolving.
//!
//! Resolution never stops at the first problem. Every failure becomes a
//! [`ResolvingError`] carrying the position of the offending `$ref` key.

use crate::document::Position;
use crate::index::{DocumentId, Reference};
use crate::resolver::CircularReferenceResult;
use derive_more::Display;
use std::fmt;

/// The underlying failure.
#[derive(Debug, Clone, Display, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The pointer leads nowhere.
    #[display("cannot resolve reference `{pointer}`, it's missing")]
    MissingReference {
        /// The pointer as written.
        pointer: String,
    },

    /// A definition that can only ever expand into itself.
    #[display("Circular reference detected: {name}")]
    CircularReference {
        /// Name of the definition at the loop point.
        name: String,
    },

    /// Any other failure.
    #[display("{_0}")]
    Other(String),
}

impl std::error::Error for ResolveFailure {}

/// A failure tied to a location in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvingError {
    /// What went wrong.
    pub error: ResolveFailure,
    /// Document holding the offending `$ref`.
    pub document: DocumentId,
    /// Line and column of the offending `$ref` key.
    pub position: Position,
    /// `$` and the pointer for missing references, the loop as `A -> B -> A` for cycles.
    pub path: String,
    /// Present only for cycle errors.
    pub circular_reference: Option<CircularReferenceResult>,
}

impl ResolvingError {
    /// A hard error for a pointer with no target.
    pub fn missing(reference: &Reference) -> Self {
        Self {
            error: ResolveFailure::MissingReference {
                pointer: reference.pointer.clone(),
            },
            document: reference.document,
            position: reference.position,
            path: format!("${}", reference.pointer),
            circular_reference: None,
        }
    }

    /// A soft error describing an infinite loop.
    pub fn circular(result: CircularReferenceResult) -> Self {
        Self {
            error: ResolveFailure::CircularReference {
                name: result.loop_point.name.clone(),
            },
            document: result.loop_point.document,
            position: result.loop_point.position,
            path: result.journey_path(),
            circular_reference: Some(result),
        }
    }

    /// Returns `true` for cycle errors.
    ///
    /// Model builders may keep going past these; they still hold a finite tree.
    pub fn is_circular(&self) -> bool {
        self.circular_reference.is_some()
    }
}

impl fmt::Display for ResolvingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.error, self.path, self.position)
    }
}

impl std::error::Error for ResolvingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Splits errors into hard failures and tolerable cycle errors, in order.
pub fn partition_errors(errors: &[ResolvingError]) -> (Vec<&ResolvingError>, Vec<&ResolvingError>) {
    errors.iter().partition(|e| !e.is_circular())
}

/// Returns `true` when every error is a cycle error, so a model can still be built.
pub fn is_tolerable(errors: &[ResolvingError]) -> bool {
    errors.iter().all(ResolvingError::is_circular)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SpecIndex;
    use pretty_assertions::assert_eq;

    fn unresolved() -> Reference {
        let index =
            SpecIndex::from_yaml("a:\n  b:\n    $ref: '#/components/schemas/crackers'\n").unwrap();
        index.all_references()[0].clone()
    }

    #[test]
    fn test_display_matches_error_path_and_position() {
        let err = ResolvingError {
            error: ResolveFailure::Other("Je suis une erreur".to_string()),
            document: DocumentId::ROOT,
            position: Position::new(5, 21),
            path: "#/definitions/JeSuisUneErreur".to_string(),
            circular_reference: None,
        };
        assert_eq!(
            err.to_string(),
            "Je suis une erreur: #/definitions/JeSuisUneErreur [5:21]"
        );
    }

    #[test]
    fn test_missing_reference_message() {
        let err = ResolvingError::missing(&unresolved());
        assert_eq!(
            err.to_string(),
            "cannot resolve reference `#/components/schemas/crackers`, it's missing: \
             $#/components/schemas/crackers [3:5]"
        );
        assert!(!err.is_circular());
    }

    #[test]
    fn test_errors_without_cycles_are_hard() {
        let missing = ResolvingError::missing(&unresolved());
        let other = ResolvingError {
            error: ResolveFailure::Other("broken".to_string()),
            ..missing.clone()
        };
        let errors = vec![missing, other];
        let (hard, soft) = partition_errors(&errors);
        assert_eq!(hard.len(), 2);
        assert!(soft.is_empty());
        assert!(!is_tolerable(&errors));
        assert!(is_tolerable(&[]));
    }
}
