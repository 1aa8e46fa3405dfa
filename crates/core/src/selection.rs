use std::collections::BTreeSet;

/// Row selection with a select-all toggle, as used by the list tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSet<K: Ord> {
    selected: BTreeSet<K>,
}

impl<K: Ord> Default for SelectionSet<K> {
    fn default() -> Self {
        Self { selected: BTreeSet::new() }
    }
}

impl<K: Ord + Clone> SelectionSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `key` is selected afterwards.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.selected.remove(&key) {
            return false;
        }
        self.selected.insert(key);
        true
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.selected.contains(key)
    }

    pub fn all_selected(&self, visible: &[K]) -> bool {
        !visible.is_empty() && visible.iter().all(|key| self.selected.contains(key))
    }

    /// Clears when every visible row is already selected, otherwise selects them all.
    pub fn toggle_all(&mut self, visible: &[K]) {
        if self.all_selected(visible) {
            self.selected.clear();
        } else {
            self.selected.extend(visible.iter().cloned());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }

    /// Drops selections for rows that are no longer listed.
    pub fn retain_visible(&mut self, visible: &[K]) {
        self.selected.retain(|key| visible.contains(key));
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionSet;

    #[test]
    fn toggling_select_all_twice_restores_empty_selection() {
        let rows = [3_u64, 5, 8];
        let mut selection = SelectionSet::new();

        selection.toggle_all(&rows);
        assert!(selection.all_selected(&rows));
        selection.toggle_all(&rows);

        assert!(selection.is_empty());
    }

    #[test]
    fn partial_selection_is_completed_by_select_all() {
        let rows = [1_u64, 2, 3];
        let mut selection = SelectionSet::new();
        selection.toggle(2);

        selection.toggle_all(&rows);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn single_toggle_flips_membership() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle("acme"));
        assert!(selection.is_selected(&"acme"));
        assert!(!selection.toggle("acme"));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_on_empty_list_stays_empty() {
        let mut selection: SelectionSet<u64> = SelectionSet::new();
        selection.toggle_all(&[]);
        assert!(selection.is_empty());
        assert!(!selection.all_selected(&[]));
    }

    #[test]
    fn retain_visible_prunes_filtered_rows() {
        let mut selection = SelectionSet::new();
        selection.toggle_all(&[1_u64, 2, 3]);
        selection.retain_visible(&[2, 3]);
        assert_eq!(selection.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    }
}
