//! The server's pre-authentication display name (§3: "display name
//! (initially `Guest<N>` on server...)").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared across every connection the server accepts, so two concurrent
/// in-progress handshakes never log under the same placeholder name.
#[derive(Clone, Default)]
pub struct GuestNames {
    next: Arc<AtomicU64>,
}

impl GuestNames {
    pub fn new() -> Self {
        Self { next: Arc::new(AtomicU64::new(1)) }
    }

    pub fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("Guest{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_distinct_and_ordered() {
        let names = GuestNames::new();
        assert_eq!(names.next_name(), "Guest1");
        assert_eq!(names.next_name(), "Guest2");
    }
}
