use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Number of full rounds over the pool after which the cursor is rewound to zero.
const RESET_ROUNDS: u64 = 100;

/// Spreads calls over a fixed pool of webhook tokens in round-robin order.
///
/// Selection only touches an atomic counter, so a single selector can be shared by any number of
/// concurrent callers. To keep the counter bounded over long process lifetimes it is rewound to
/// zero once it has gone `100` times around the pool; the sequence then restarts at the first
/// token, which can show up as a skip in the rotation at that point.
pub struct EndpointSelector {
    tokens: Vec<String>,
    cursor: AtomicU64,
}

impl EndpointSelector {
    /// Creates a selector over `tokens`, in registration order.
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            cursor: AtomicU64::new(0),
        }
    }

    /// Returns the next token, or `None` when the pool is empty.
    pub fn next(&self) -> Option<&str> {
        let total = self.tokens.len() as u64;
        if total == 0 {
            return None;
        }

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        if idx >= total * RESET_ROUNDS {
            self.cursor.store(0, Ordering::Relaxed);
        }

        self.tokens.get((idx % total) as usize).map(String::as_str)
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Debug for EndpointSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Tokens are credentials, only report how many there are.
        f.debug_struct("EndpointSelector")
            .field("tokens", &self.tokens.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}
