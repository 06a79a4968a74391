//! Monotonic id generators for synthesized graph nodes and edges.

use crate::error::CompilerError;

/// Integer id of an activity, resource, node or edge.
pub type Id = i32;

/// Hands out ids that never repeat.
///
/// Ascending generators count up from a seed; descending generators count
/// down, which is how clones stay clear of ids already in use by the graph
/// they were copied from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    next: Id,
    step: Id,
}

impl IdGenerator {
    /// Generator yielding `start, start + 1, ...`.
    pub fn ascending(start: Id) -> Self {
        Self { next: start, step: 1 }
    }

    /// Generator yielding `start, start - 1, ...`.
    pub fn descending(start: Id) -> Self {
        Self {
            next: start,
            step: -1,
        }
    }

    /// Generator that continues from one below the lowest of `existing`.
    ///
    /// With no existing ids it starts at -1 so synthesized ids never collide
    /// with the non-negative ids callers assign. Fails when the lowest id is
    /// already `Id::MIN`.
    pub fn below<I: IntoIterator<Item = Id>>(existing: I) -> Result<Self, CompilerError> {
        let lowest = existing.into_iter().min().unwrap_or(0).min(0);
        let start = lowest.checked_sub(1).ok_or_else(|| {
            CompilerError::InvalidGraph(format!("no ids left below {}", lowest))
        })?;
        Ok(Self::descending(start))
    }

    /// Take the next id.
    pub fn next_id(&mut self) -> Id {
        let id = self.next;
        // wraps at the range end; graphs skip ids already in use
        self.next = self.next.wrapping_add(self.step);
        id
    }

    /// Peek at the id the next call will return.
    pub fn peek(&self) -> Id {
        self.next
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::ascending(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending() {
        let mut ids = IdGenerator::ascending(10);
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
        assert_eq!(ids.peek(), 12);
    }

    #[test]
    fn test_below_existing() {
        let mut ids = IdGenerator::below([3, -4, 8]).unwrap();
        assert_eq!(ids.next_id(), -5);
        assert_eq!(ids.next_id(), -6);

        let mut ids = IdGenerator::below([1, 2]).unwrap();
        assert_eq!(ids.next_id(), -1);

        let mut ids = IdGenerator::below(std::iter::empty()).unwrap();
        assert_eq!(ids.next_id(), -1);
    }

    #[test]
    fn test_below_lowest_possible_id_fails() {
        assert!(matches!(
            IdGenerator::below([5, Id::MIN]),
            Err(CompilerError::InvalidGraph(_))
        ));
        let mut ids = IdGenerator::below([Id::MIN + 1]).unwrap();
        assert_eq!(ids.next_id(), Id::MIN);
    }
}
