//! Circular reference classification.
//!
//! A cycle is terminable when any hop inside the loop offers an escape: an optional
//! property, a collection that may be empty, or a composition keyword offering
//! alternatives. Only a loop made entirely of mandatory hops is an infinite loop.

use crate::index::Reference;

/// A detected cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularReferenceResult {
    /// Every hop from the traversal root, ending with the hop that closed the loop.
    pub journey: Vec<Reference>,
    /// Index in `journey` of the first visit to the repeated definition.
    pub loop_index: usize,
    /// The hop at `loop_index`.
    pub loop_point: Reference,
    /// A hop inside the loop passes through `anyOf` / `oneOf` / `allOf`.
    pub is_polymorphic: bool,
    /// The first composition keyword inside the loop.
    pub polymorphic_type: Option<String>,
    /// A hop inside the loop passes through an array or map indirection.
    pub is_array: bool,
    /// The loop has no escape. Callers with more context may overwrite this.
    pub is_infinite_loop: bool,
}

impl CircularReferenceResult {
    /// Classifies the loop closed by `closing`, whose target was first reached by
    /// `hops[loop_index]`.
    ///
    /// Returns `None` if `loop_index` is out of range.
    pub(crate) fn classify(hops: &[Reference], loop_index: usize, closing: Reference) -> Option<Self> {
        let loop_point = hops.get(loop_index)?.clone();
        let mut journey = hops.to_vec();
        journey.push(closing);

        // the hop into the loop point comes from outside the loop
        let inside = &journey[loop_index + 1..];
        let polymorphic_type = inside.iter().find_map(|hop| hop.edge.polymorphic.clone());

        Some(Self {
            loop_index,
            loop_point,
            is_polymorphic: polymorphic_type.is_some(),
            polymorphic_type,
            is_array: inside.iter().any(|hop| hop.edge.array),
            is_infinite_loop: inside.iter().all(|hop| hop.edge.is_mandatory()),
            journey,
        })
    }

    /// The hops that form the loop itself, starting at the loop point.
    pub fn loop_hops(&self) -> &[Reference] {
        &self.journey[self.loop_index.min(self.journey.len())..]
    }

    /// Renders the loop as `A -> B -> A`.
    pub fn journey_path(&self) -> String {
        self.loop_hops()
            .iter()
            .map(|hop| hop.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Edge, SpecIndex};
    use pretty_assertions::assert_eq;

    fn hops(edges: &[Edge]) -> Vec<Reference> {
        let index = SpecIndex::from_yaml(
            "A:\n  $ref: '#/B'\nB:\n  $ref: '#/C'\nC:\n  $ref: '#/A'\nD:\n  $ref: '#/A'\n",
        )
        .unwrap();
        index
            .all_references()
            .iter()
            .zip(edges)
            .map(|(r, edge)| Reference {
                edge: edge.clone(),
                ..r.clone()
            })
            .collect()
    }

    fn optional() -> Edge {
        Edge {
            optional: true,
            ..Edge::default()
        }
    }

    fn poly(keyword: &str) -> Edge {
        Edge {
            polymorphic: Some(keyword.to_string()),
            ..Edge::default()
        }
    }

    #[test]
    fn test_all_mandatory_hops_form_an_infinite_loop() {
        let refs = hops(&[Edge::default(), Edge::default(), Edge::default(), Edge::default()]);
        let (path, closing) = (&refs[..3], refs[3].clone());
        let result = CircularReferenceResult::classify(path, 1, closing).unwrap();

        assert!(result.is_infinite_loop);
        assert!(!result.is_polymorphic);
        assert!(!result.is_array);
        assert_eq!(result.loop_index, 1);
        assert_eq!(result.loop_point.name, "C");
        assert_eq!(result.journey.len(), 4);
        assert_eq!(result.journey_path(), "C -> A -> A");
    }

    #[test]
    fn test_escape_outside_the_loop_is_ignored() {
        // the optional hop leads *into* the loop, so it does not break it
        let refs = hops(&[optional(), Edge::default(), Edge::default(), Edge::default()]);
        let result = CircularReferenceResult::classify(&refs[..2], 0, refs[2].clone()).unwrap();
        assert!(result.is_infinite_loop);
    }

    #[test]
    fn test_any_escape_inside_the_loop_breaks_it() {
        let refs = hops(&[Edge::default(), poly("oneOf"), Edge::default(), Edge::default()]);
        let result = CircularReferenceResult::classify(&refs[..2], 0, refs[2].clone()).unwrap();
        assert!(!result.is_infinite_loop);
        assert!(result.is_polymorphic);
        assert_eq!(result.polymorphic_type.as_deref(), Some("oneOf"));

        let array = Edge {
            array: true,
            ..Edge::default()
        };
        let refs = hops(&[Edge::default(), Edge::default(), array, Edge::default()]);
        let result = CircularReferenceResult::classify(&refs[..2], 0, refs[2].clone()).unwrap();
        assert!(result.is_array);
        assert!(!result.is_infinite_loop);
    }

    #[test]
    fn test_out_of_range_loop_index() {
        let refs = hops(&[Edge::default(), Edge::default()]);
        assert!(CircularReferenceResult::classify(&refs[..1], 3, refs[1].clone()).is_none());
    }
}
