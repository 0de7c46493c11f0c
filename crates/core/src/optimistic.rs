/// Local identity of a speculative entry. Never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeculativeId(u64);

#[derive(Debug, Clone, PartialEq)]
enum Entry<T> {
    Confirmed(T),
    Speculative(SpeculativeId, T),
}

impl<T> Entry<T> {
    fn value(&self) -> &T {
        match self {
            Self::Confirmed(value) | Self::Speculative(_, value) => value,
        }
    }
}

/// A list that shows local guesses immediately and later either replaces
/// everything with authoritative data or removes exactly the failed guess.
///
/// Entries are stored newest first, which is also the order the backend
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticList<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T> OptimisticList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply_speculative(&mut self, value: T) -> SpeculativeId {
        let id = SpeculativeId(self.next_id);
        self.next_id += 1;
        self.entries.insert(0, Entry::Speculative(id, value));
        id
    }

    /// Discards all local state, speculative or not.
    pub fn reconcile(&mut self, authoritative: Vec<T>) {
        self.entries = authoritative.into_iter().map(Entry::Confirmed).collect();
    }

    /// Removes the tagged entry. Returns `false` if it was already gone,
    /// e.g. because a reconcile ran first.
    pub fn rollback(&mut self, id: SpeculativeId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, Entry::Speculative(tag, _) if *tag == id));
        self.entries.len() != before
    }

    #[must_use]
    pub fn is_speculative(&self, id: SpeculativeId) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Speculative(tag, _) if *tag == id))
    }

    #[must_use]
    pub fn has_speculative(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Speculative(..)))
    }

    pub fn newest_first(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter().map(Entry::value)
    }

    pub fn oldest_first(&self) -> impl Iterator<Item = &T> + '_ {
        self.newest_first().rev()
    }
}
