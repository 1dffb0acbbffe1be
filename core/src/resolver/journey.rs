//! The depth-first path currently being walked.

use crate::index::{Reference, Target};

/// Ordered hops from a traversal root to the current definition.
///
/// Every hop has a resolved target. Lives for one traversal branch only.
#[derive(Debug, Default)]
pub(crate) struct Journey {
    hops: Vec<Reference>,
}

impl Journey {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.hops.len()
    }

    pub(crate) fn push(&mut self, hop: Reference) {
        self.hops.push(hop);
    }

    pub(crate) fn pop(&mut self) -> Option<Reference> {
        self.hops.pop()
    }

    pub(crate) fn hops(&self) -> &[Reference] {
        &self.hops
    }

    /// Index of the first hop that already led to `target`.
    pub(crate) fn position_of(&self, target: Target) -> Option<usize> {
        self.hops.iter().position(|hop| hop.target == Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SpecIndex;

    #[test]
    fn test_position_of_returns_first_occurrence() {
        let index = SpecIndex::from_yaml(
            "a:\n  $ref: '#/b'\nc:\n  $ref: '#/b'\nb:\n  type: string\n",
        )
        .unwrap();
        let refs = index.all_references();
        let mut journey = Journey::new();
        journey.push(refs[0].clone());
        journey.push(refs[1].clone());

        let b = index.lookup("#/b").unwrap();
        assert_eq!(journey.position_of(b), Some(0));
        assert_eq!(journey.len(), 2);

        journey.pop();
        journey.pop();
        assert_eq!(journey.position_of(b), None);
        assert!(journey.hops().is_empty());
    }
}
