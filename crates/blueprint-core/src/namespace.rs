//! Reservation registry for project and archive names
//!
//! Two requests that settle on the same name race for it here before either
//! touches the filesystem. Keys are compared case-insensitively so the
//! registry agrees with case-insensitive filesystems.

use dashmap::DashSet;

/// Concurrent set of names currently claimed
#[derive(Debug, Default)]
pub struct Namespace {
    reserved: DashSet<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Claim `name`. Returns `false` when another caller already holds it.
    pub fn reserve(&self, name: &str) -> bool {
        self.reserved.insert(Self::key(name))
    }

    /// Give up a claim so the name can be handed out again
    pub fn release(&self, name: &str) {
        self.reserved.remove(&Self::key(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reserved.contains(&Self::key(name))
    }

    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reserve_is_exclusive() {
        let ns = Namespace::new();
        assert!(ns.reserve("book-api"));
        assert!(!ns.reserve("Book-API"));
        assert!(ns.contains("BOOK-api"));

        ns.release("book-api");
        assert!(!ns.contains("book-api"));
        assert!(ns.reserve("book-api"));
    }

    #[test]
    fn test_concurrent_reservations_have_one_winner() {
        let ns = Arc::new(Namespace::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ns = Arc::clone(&ns);
                thread::spawn(move || ns.reserve("contested"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(ns.len(), 1);
    }
}
