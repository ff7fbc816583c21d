use goalgraph_core::{FlatGoal, GoalId};
use std::collections::HashMap;

/// Per-goal collapsed/expanded flags, kept apart from structural data so a
/// refetch never loses UI state.
///
/// Toggling only ever changes `ui.collapsed`; structural fields are
/// untouched, which keeps the rest of each node referentially stable for
/// memoization upstream.
#[derive(Debug, Default, Clone)]
pub struct CollapseStore {
    flags: HashMap<GoalId, bool>,
}

impl CollapseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the current id set from a freshly fetched collection: new ids
    /// are seeded from the incoming flags, known ids keep their local state,
    /// ids that disappeared are dropped.
    pub fn sync(&mut self, nodes: &[FlatGoal]) {
        let mut next = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let flag = self
                .flags
                .get(&node.id)
                .copied()
                .unwrap_or(node.ui.collapsed);
            next.insert(node.id.clone(), flag);
        }
        self.flags = next;
    }

    /// Flip the flag for `id`. Unknown ids are a silent no-op — toggles
    /// racing against unmount are expected and must never fail.
    pub fn toggle(&mut self, id: &GoalId) -> bool {
        match self.flags.get_mut(id) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    pub fn is_collapsed(&self, id: &GoalId) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    /// Produce a new collection with each node's `ui.collapsed` updated from
    /// the store. The input is not mutated.
    pub fn merge(&self, nodes: &[FlatGoal]) -> Vec<FlatGoal> {
        nodes
            .iter()
            .map(|node| {
                let mut merged = node.clone();
                if let Some(&flag) = self.flags.get(&node.id) {
                    merged.ui.collapsed = flag;
                }
                merged
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> Vec<FlatGoal> {
        vec![
            FlatGoal::new("root", None, "Root"),
            FlatGoal::new("leaf", Some(GoalId::from("root")), "Leaf"),
        ]
    }

    #[test]
    fn toggle_flips_known_ids_only() {
        let mut store = CollapseStore::new();
        store.sync(&collection());

        assert!(store.toggle(&GoalId::from("leaf")));
        assert!(store.is_collapsed(&GoalId::from("leaf")));

        assert!(!store.toggle(&GoalId::from("ghost")));
        assert!(!store.is_collapsed(&GoalId::from("ghost")));
    }

    #[test]
    fn double_toggle_restores_original_collection() {
        let nodes = collection();
        let mut store = CollapseStore::new();
        store.sync(&nodes);

        store.toggle(&GoalId::from("leaf"));
        store.toggle(&GoalId::from("leaf"));

        assert_eq!(store.merge(&nodes), nodes);
    }

    #[test]
    fn merge_updates_flags_without_mutating_input() {
        let nodes = collection();
        let before = nodes.clone();

        let mut store = CollapseStore::new();
        store.sync(&nodes);
        store.toggle(&GoalId::from("root"));

        let merged = store.merge(&nodes);
        assert!(merged[0].ui.collapsed);
        assert!(!merged[1].ui.collapsed);
        // Only the collapse flag may differ.
        assert_eq!(merged[0].id, nodes[0].id);
        assert_eq!(merged[0].parent_id, nodes[0].parent_id);
        assert_eq!(merged[0].children, nodes[0].children);
        assert_eq!(nodes, before);
    }

    #[test]
    fn sync_preserves_local_state_and_prunes_stale_ids() {
        let mut store = CollapseStore::new();
        store.sync(&collection());
        store.toggle(&GoalId::from("leaf"));

        // Refetch returns the same leaf (expanded server-side) plus a new
        // node, and drops "root".
        let mut refetched = vec![
            FlatGoal::new("leaf", None, "Leaf"),
            FlatGoal::new("fresh", Some(GoalId::from("leaf")), "Fresh"),
        ];
        refetched[1].ui.collapsed = true;
        store.sync(&refetched);

        assert_eq!(store.len(), 2);
        // Local toggle wins over the incoming flag.
        assert!(store.is_collapsed(&GoalId::from("leaf")));
        // Unknown ids are seeded from the wire.
        assert!(store.is_collapsed(&GoalId::from("fresh")));
        // Dropped ids are forgotten.
        assert!(!store.toggle(&GoalId::from("root")));
    }
}
