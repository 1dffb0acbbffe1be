#![deny(missing_docs)]

//! # Resolver
//!
//! Walks every `$ref` in a [`SpecIndex`], detects and classifies cycles, and
//! optionally inlines each resolvable reference with a deep copy of its target.
//!
//! - **journey**: the depth-first path used for cycle detection.
//! - **circular**: polymorphic / array / infinite-loop classification.
//! - **error**: hard and soft [`ResolvingError`]s.
//!
//! ```
//! use oas_resolver::index::SpecIndex;
//! use oas_resolver::resolver::Resolver;
//!
//! let mut index = SpecIndex::from_yaml(
//!     "components:\n  schemas:\n    A:\n      required: [b]\n      properties:\n        b:\n          $ref: '#/components/schemas/B'\n    B:\n      required: [a]\n      properties:\n        a:\n          $ref: '#/components/schemas/A'\n",
//! )
//! .unwrap();
//! let mut resolver = Resolver::new(Some(&mut index));
//! let errors = resolver.check_for_circular_references();
//! assert_eq!(errors.len(), 1);
//! assert!(resolver.circular_references()[0].is_infinite_loop);
//! ```

pub mod circular;
pub mod error;
pub(crate) mod journey;

pub use circular::CircularReferenceResult;
pub use error::{is_tolerable, partition_errors, ResolveFailure, ResolvingError};

use crate::index::{DocumentId, Reference, SpecIndex, Target};
use journey::Journey;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Default ceiling on journey length.
pub const DEFAULT_MAX_JOURNEY_DEPTH: usize = 200;

/// Resolver policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Branches longer than this are abandoned.
    pub max_journey_depth: usize,
    /// Record polymorphic cycles separately instead of as circular references.
    pub ignore_polymorphic_circular_references: bool,
    /// Record array cycles separately instead of as circular references.
    pub ignore_array_circular_references: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_journey_depth: DEFAULT_MAX_JOURNEY_DEPTH,
            ignore_polymorphic_circular_references: false,
            ignore_array_circular_references: false,
        }
    }
}

impl ResolverConfig {
    /// Sets the journey ceiling.
    pub fn with_max_journey_depth(mut self, depth: usize) -> Self {
        self.max_journey_depth = depth;
        self
    }

    /// Moves polymorphic cycles to [`Resolver::ignored_polymorphic_references`].
    pub fn with_ignore_polymorphic_circular_references(mut self, ignore: bool) -> Self {
        self.ignore_polymorphic_circular_references = ignore;
        self
    }

    /// Moves array cycles to [`Resolver::ignored_array_references`].
    pub fn with_ignore_array_circular_references(mut self, ignore: bool) -> Self {
        self.ignore_array_circular_references = ignore;
        self
    }
}

/// Counters from the last run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Distinct documents touched, root included.
    pub indexes_visited: usize,
    /// Resolved references found inside expanded definitions.
    pub relatives_seen: usize,
    /// Top-level traversals started.
    pub journeys_taken: usize,
    /// References successfully looked up and walked.
    pub references_visited: usize,
}

#[derive(Debug, Default)]
struct Outcome {
    stats: ResolverStats,
    errors: Vec<ResolvingError>,
    circular: Vec<CircularReferenceResult>,
    ignored_polymorphic: Vec<CircularReferenceResult>,
    ignored_array: Vec<CircularReferenceResult>,
    depth_ceiling_hits: Vec<String>,
}

/// Resolves the references of one index.
///
/// Holding the index mutably keeps two resolutions of the same index apart.
#[derive(Debug)]
pub struct Resolver<'a> {
    index: Option<&'a mut SpecIndex>,
    config: ResolverConfig,
    outcome: Outcome,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver. Without an index every operation is a no-op.
    pub fn new(index: Option<&'a mut SpecIndex>) -> Self {
        Self::with_config(index, ResolverConfig::default())
    }

    /// Creates a resolver with an explicit policy.
    pub fn with_config(index: Option<&'a mut SpecIndex>, config: ResolverConfig) -> Self {
        Self {
            index,
            config,
            outcome: Outcome::default(),
        }
    }

    /// The index being resolved.
    pub fn index(&self) -> Option<&SpecIndex> {
        self.index.as_deref()
    }

    /// The active policy.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Inlines every resolvable reference in place.
    ///
    /// Cycles stay as `$ref` nodes where they close, so the tree stays finite.
    /// Returns hard errors for missing references and soft errors for infinite loops.
    pub fn resolve(&mut self) -> Vec<ResolvingError> {
        self.run(true)
    }

    /// Same walk as [`Resolver::resolve`] without touching the documents.
    pub fn check_for_circular_references(&mut self) -> Vec<ResolvingError> {
        self.run(false)
    }

    fn run(&mut self, inline: bool) -> Vec<ResolvingError> {
        self.outcome = Outcome::default();
        let Some(index) = self.index.as_deref_mut() else {
            return Vec::new();
        };

        let mut walk = Walk::new(index, &self.config);
        walk.run();
        self.outcome = walk.finish(inline);

        debug!(
            inline,
            errors = self.outcome.errors.len(),
            circular = self.outcome.circular.len(),
            journeys = self.outcome.stats.journeys_taken,
            "resolver run finished"
        );
        self.outcome.errors.clone()
    }

    /// Errors from the last run, hard errors in walk order followed by soft ones.
    pub fn resolving_errors(&self) -> &[ResolvingError] {
        &self.outcome.errors
    }

    /// Cycles recorded by the last run.
    pub fn circular_references(&self) -> &[CircularReferenceResult] {
        &self.outcome.circular
    }

    /// Recorded cycles, mutably, for callers that reclassify loops.
    pub fn circular_references_mut(&mut self) -> &mut [CircularReferenceResult] {
        &mut self.outcome.circular
    }

    /// Recorded cycles that pass through a composition keyword.
    pub fn polymorphic_circular_references(&self) -> Vec<&CircularReferenceResult> {
        self.outcome
            .circular
            .iter()
            .filter(|c| c.is_polymorphic)
            .collect()
    }

    /// Recorded cycles that do not pass through a composition keyword.
    pub fn non_polymorphic_circular_references(&self) -> Vec<&CircularReferenceResult> {
        self.outcome
            .circular
            .iter()
            .filter(|c| !c.is_polymorphic)
            .collect()
    }

    /// Polymorphic cycles set aside by configuration.
    pub fn ignored_polymorphic_references(&self) -> &[CircularReferenceResult] {
        &self.outcome.ignored_polymorphic
    }

    /// Array cycles set aside by configuration.
    pub fn ignored_array_references(&self) -> &[CircularReferenceResult] {
        &self.outcome.ignored_array
    }

    /// Pointers whose branch was abandoned at the journey ceiling.
    pub fn depth_ceiling_hits(&self) -> &[String] {
        &self.outcome.depth_ceiling_hits
    }

    /// All counters of the last run.
    pub fn stats(&self) -> ResolverStats {
        self.outcome.stats
    }

    /// Distinct documents touched.
    pub fn indexes_visited(&self) -> usize {
        self.outcome.stats.indexes_visited
    }

    /// Resolved references found inside expanded definitions.
    pub fn relatives_seen(&self) -> usize {
        self.outcome.stats.relatives_seen
    }

    /// Top-level traversals started.
    pub fn journeys_taken(&self) -> usize {
        self.outcome.stats.journeys_taken
    }

    /// References successfully looked up and walked.
    pub fn references_visited(&self) -> usize {
        self.outcome.stats.references_visited
    }
}

/// State of a single run.
struct Walk<'r> {
    index: &'r mut SpecIndex,
    config: &'r ResolverConfig,
    // occurrences already dealt with
    handled: HashSet<Target>,
    // definitions whose relatives have all been walked
    completed: HashSet<Target>,
    // loops already recorded, keyed by their hop occurrences
    closed: HashSet<Vec<Target>>,
    documents: HashSet<DocumentId>,
    // (occurrence, target) in post-order
    splices: Vec<(Target, Target)>,
    outcome: Outcome,
}

impl<'r> Walk<'r> {
    fn new(index: &'r mut SpecIndex, config: &'r ResolverConfig) -> Self {
        Self {
            index,
            config,
            handled: HashSet::new(),
            completed: HashSet::new(),
            closed: HashSet::new(),
            documents: HashSet::new(),
            splices: Vec::new(),
            outcome: Outcome::default(),
        }
    }

    fn run(&mut self) {
        self.touch(DocumentId::ROOT);

        let roots = self.index.all_references().to_vec();
        for reference in roots {
            if self.handled.contains(&reference.occurrence()) {
                continue;
            }
            self.outcome.stats.journeys_taken += 1;
            debug!(pointer = %reference.pointer, position = %reference.position, "journey started");
            let mut journey = Journey::new();
            self.visit(reference, &mut journey);
        }
    }

    fn visit(&mut self, reference: Reference, journey: &mut Journey) {
        let Some(target) = reference.target else {
            self.handled.insert(reference.occurrence());
            self.missing(&reference);
            return;
        };
        // left unhandled so a shallower journey can still reach it
        if journey.len() >= self.config.max_journey_depth {
            warn!(
                pointer = %reference.pointer,
                depth = journey.len(),
                "journey ceiling reached, abandoning branch"
            );
            self.outcome.depth_ceiling_hits.push(reference.pointer);
            return;
        }
        self.handled.insert(reference.occurrence());

        self.outcome.stats.references_visited += 1;
        self.touch(reference.document);
        self.touch(target.document);

        if !self.completed.contains(&target) {
            journey.push(reference.clone());
            self.expand(target, journey);
            journey.pop();
        }
        self.splices.push((reference.occurrence(), target));
    }

    fn expand(&mut self, target: Target, journey: &mut Journey) {
        let relatives = self.index.relatives_of(target);
        self.outcome.stats.relatives_seen += relatives.iter().filter(|r| r.is_resolved()).count();

        for relative in relatives {
            let Some(next) = relative.target else {
                if self.handled.insert(relative.occurrence()) {
                    self.missing(&relative);
                }
                continue;
            };
            if let Some(loop_index) = journey.position_of(next) {
                self.handled.insert(relative.occurrence());
                self.record(journey, loop_index, relative);
                continue;
            }
            if self.handled.contains(&relative.occurrence()) {
                continue;
            }
            self.visit(relative, journey);
        }
        self.completed.insert(target);
    }

    fn missing(&mut self, reference: &Reference) {
        warn!(
            pointer = %reference.pointer,
            position = %reference.position,
            "unable to resolve reference"
        );
        self.outcome.errors.push(ResolvingError::missing(reference));
    }

    fn record(&mut self, journey: &Journey, loop_index: usize, closing: Reference) {
        let Some(result) = CircularReferenceResult::classify(journey.hops(), loop_index, closing)
        else {
            return;
        };
        // the hop into the loop point depends on how the loop was entered
        let key: Vec<Target> = result
            .loop_hops()
            .iter()
            .skip(1)
            .map(Reference::occurrence)
            .collect();
        if !self.closed.insert(key) {
            return;
        }
        trace!(
            path = %result.journey_path(),
            polymorphic = result.is_polymorphic,
            array = result.is_array,
            infinite = result.is_infinite_loop,
            "circular reference"
        );

        if self.config.ignore_polymorphic_circular_references && result.is_polymorphic {
            self.outcome.ignored_polymorphic.push(result);
        } else if self.config.ignore_array_circular_references && result.is_array {
            self.outcome.ignored_array.push(result);
        } else {
            self.outcome.circular.push(result);
        }
    }

    fn touch(&mut self, document: DocumentId) {
        if self.documents.insert(document) {
            self.outcome.stats.indexes_visited += 1;
        }
    }

    fn finish(mut self, inline: bool) -> Outcome {
        if inline {
            // post-order: a target is complete before it is copied anywhere
            for (occurrence, target) in std::mem::take(&mut self.splices) {
                let Some(subtree) = self
                    .index
                    .document(target.document)
                    .map(|doc| doc.export_subtree(target.node))
                else {
                    continue;
                };
                if let Some(doc) = self.index.document_mut(occurrence.document) {
                    doc.splice(occurrence.node, subtree);
                }
            }
        }

        let infinite: Vec<ResolvingError> = self
            .outcome
            .circular
            .iter()
            .filter(|c| c.is_infinite_loop)
            .cloned()
            .map(ResolvingError::circular)
            .collect();
        self.outcome.errors.extend(infinite);

        self.index
            .set_circular_references(self.outcome.circular.clone());
        self.outcome
    }
}
