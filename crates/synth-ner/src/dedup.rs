//! Entity admission: stopword filtering and case-insensitive deduplication.

use synth_common::{Entity, EntityCollection};
use tracing::trace;

use crate::labels::Category;
use crate::stopwords::StopwordFilter;

/// Decides whether a finished span becomes an entity.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    stopwords: StopwordFilter,
    keep_unclassified: bool,
}

impl Deduplicator {
    pub fn new(stopwords: StopwordFilter) -> Self {
        Self { stopwords, keep_unclassified: false }
    }

    /// Emit spans that began with an orphan fragment as `UNCLASSIFIED`
    /// instead of dropping them.
    pub fn keep_unclassified(mut self, keep: bool) -> Self {
        self.keep_unclassified = keep;
        self
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    /// Finalize one span into `seen`. Returns whether an entity was added.
    ///
    /// Nothing is added for an empty term, a dropped unclassified span, a
    /// stopword, or a term whose lowercase form is already in `seen`.
    pub fn finalize(&self, term: String, category: Category, seen: &mut EntityCollection) -> bool {
        if term.is_empty() {
            return false;
        }
        if category.is_unclassified() && !self.keep_unclassified {
            trace!(term = %term, "dropping unclassified span");
            return false;
        }
        if self.stopwords.contains(&term) {
            trace!(term = %term, "dropping stopword");
            return false;
        }
        let admitted = seen.push_unique(Entity::new(term, category.as_str()));
        if !admitted {
            trace!("dropping duplicate term");
        }
        admitted
    }

    /// Apply the same admission rule to an existing entity sequence.
    /// Running it on its own output returns the input unchanged.
    pub fn dedup<I>(&self, entities: I) -> EntityCollection
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut seen = EntityCollection::new();
        for entity in entities {
            let category = if entity.entity_type == Category::UNCLASSIFIED {
                Category::Unclassified
            } else {
                Category::Named(entity.entity_type)
            };
            self.finalize(entity.term, category, &mut seen);
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(s: &str) -> Category {
        Category::Named(s.to_string())
    }

    #[test]
    fn test_finalize_rejects_empty_stopword_and_duplicate() {
        let d = Deduplicator::default();
        let mut seen = EntityCollection::new();

        assert!(!d.finalize(String::new(), named("Sign_symptom"), &mut seen));
        assert!(!d.finalize("The".into(), named("Sign_symptom"), &mut seen));
        assert!(d.finalize("Fever".into(), named("Sign_symptom"), &mut seen));
        assert!(!d.finalize("fever".into(), named("Disease_disorder"), &mut seen));

        assert_eq!(seen.as_slice(), &[Entity::new("Fever", "Sign_symptom")]);
    }

    #[test]
    fn test_unclassified_dropped_unless_kept() {
        let mut seen = EntityCollection::new();
        assert!(!Deduplicator::default().finalize("itis".into(), Category::Unclassified, &mut seen));
        assert!(seen.is_empty());

        let keeping = Deduplicator::default().keep_unclassified(true);
        assert!(keeping.finalize("itis".into(), Category::Unclassified, &mut seen));
        assert_eq!(seen.as_slice(), &[Entity::new("itis", "UNCLASSIFIED")]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let d = Deduplicator::default();
        let input = vec![
            Entity::new("Fever", "Sign_symptom"),
            Entity::new("with", "Sign_symptom"),
            Entity::new("cough", "Sign_symptom"),
            Entity::new("FEVER", "Disease_disorder"),
            Entity::new("aspirin", "Medication"),
        ];
        let once = d.dedup(input);
        assert_eq!(once.terms(), vec!["Fever", "cough", "aspirin"]);

        let twice = d.dedup(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_extra_stopwords_respected() {
        let d = Deduplicator::new(StopwordFilter::new().with_extra(["patient"]));
        let mut seen = EntityCollection::new();
        assert!(!d.finalize("Patient".into(), named("Subject"), &mut seen));
    }
}
