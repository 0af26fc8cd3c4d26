// ── Invalidation rules ──
//
// The single table that says which cached reads go stale when a write on
// a resource type succeeds. Derived resources (stats, analytics) are listed
// here rather than at each mutation site.

use std::collections::HashMap;

use indexmap::IndexSet;

use campus_api::ResourceKind;

/// Resource type → resource types to invalidate after a successful write.
///
/// Every type always invalidates itself, first.
#[derive(Debug, Clone)]
pub struct InvalidationRules {
    targets: HashMap<ResourceKind, IndexSet<ResourceKind>>,
}

impl InvalidationRules {
    /// A table where every type invalidates only itself.
    pub fn empty() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Add `related` to the invalidation set of `source`.
    #[must_use]
    pub fn with_rule(
        mut self,
        source: ResourceKind,
        related: impl IntoIterator<Item = ResourceKind>,
    ) -> Self {
        let set = self
            .targets
            .entry(source)
            .or_insert_with(|| IndexSet::from([source]));
        set.extend(related);
        self
    }

    /// Resource types to invalidate after a write on `source`.
    pub fn targets(&self, source: ResourceKind) -> IndexSet<ResourceKind> {
        self.targets
            .get(&source)
            .cloned()
            .unwrap_or_else(|| IndexSet::from([source]))
    }

    /// Sources with at least one related type, for display.
    pub fn rules(&self) -> impl Iterator<Item = (ResourceKind, &IndexSet<ResourceKind>)> {
        self.targets.iter().map(|(k, v)| (*k, v))
    }
}

impl Default for InvalidationRules {
    fn default() -> Self {
        use ResourceKind as R;

        Self::empty()
            .with_rule(R::Students, [R::StudentStats, R::Analytics])
            .with_rule(R::Staff, [R::Timetable, R::Analytics])
            .with_rule(R::FeeStructures, [R::FeePayments])
            .with_rule(R::FeePayments, [R::StudentStats, R::Analytics])
            .with_rule(R::Exams, [R::ExamResults, R::Timetable])
            .with_rule(R::ExamResults, [R::StudentStats, R::Analytics])
            .with_rule(R::Attendance, [R::StudentStats, R::Analytics])
            .with_rule(R::Messages, [R::Notifications])
    }
}
