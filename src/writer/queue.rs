use crate::domain::LogEntry;

/// FIFO of entries awaiting their write, with a read cursor.
///
/// Entries before the cursor are already on disk. They stay in the vector
/// until the queue is caught up, at which point `compact` drops them all at
/// once. Invariant: `cursor <= entries.len()`.
#[derive(Debug, Default)]
pub struct WriteQueue {
    entries: Vec<LogEntry>,
    cursor: usize,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Entry at the cursor, if any is still unwritten.
    pub fn current(&self) -> Option<&LogEntry> {
        self.entries.get(self.cursor)
    }

    /// Marks the entry at the cursor as durably written.
    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }

    pub fn is_caught_up(&self) -> bool {
        self.cursor == self.entries.len()
    }

    /// Drops every consumed entry once the queue is caught up.
    ///
    /// Returns false (and does nothing) while unwritten entries remain.
    pub fn compact(&mut self) -> bool {
        if !self.is_caught_up() {
            return false;
        }
        self.entries.clear();
        self.cursor = 0;
        true
    }

    /// Number of entries not yet written.
    pub fn pending(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(EntryKind::Info, message)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = WriteQueue::new();
        queue.push(entry("a"));
        queue.push(entry("b"));

        assert_eq!(queue.current().unwrap().message(), "a");
        queue.advance();
        assert_eq!(queue.current().unwrap().message(), "b");
        queue.advance();
        assert!(queue.current().is_none());
        assert!(queue.is_caught_up());
    }

    #[test]
    fn test_cursor_stays_until_advanced() {
        let mut queue = WriteQueue::new();
        queue.push(entry("a"));
        queue.push(entry("b"));

        // A failed write leaves the cursor where it was.
        assert_eq!(queue.current().unwrap().message(), "a");
        assert_eq!(queue.current().unwrap().message(), "a");
        assert_eq!(queue.cursor(), 0);
        assert_eq!(queue.pending(), 2);
    }

    #[test]
    fn test_compact_only_when_caught_up() {
        let mut queue = WriteQueue::new();
        queue.push(entry("a"));
        queue.push(entry("b"));
        queue.advance();

        assert!(!queue.compact());
        assert_eq!(queue.len(), 2);

        queue.advance();
        assert!(queue.compact());
        assert!(queue.is_empty());
        assert_eq!(queue.cursor(), 0);

        queue.push(entry("c"));
        assert_eq!(queue.current().unwrap().message(), "c");
    }

    #[test]
    fn test_advance_never_passes_len() {
        let mut queue = WriteQueue::new();
        queue.advance();
        assert_eq!(queue.cursor(), 0);

        queue.push(entry("a"));
        queue.advance();
        queue.advance();
        assert_eq!(queue.cursor(), 1);
        assert_eq!(queue.pending(), 0);
    }
}
