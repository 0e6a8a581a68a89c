//! Content fingerprints.
//!
//! A [`Fingerprint`] is a 128-bit hash computed over the runtime type and the
//! payload of a value, or over the structure of an expression node. Two
//! entities with the same fingerprint are treated as equal, which is what the
//! encoder relies on to emit a shared sub-graph only once.
//!
//! The hash is built from two independently salted SipHash streams
//! (`DefaultHasher::new()` uses fixed keys, so results are deterministic
//! within a build).
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(pub u128);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Incremental builder of a [`Fingerprint`].
///
/// ```rust
/// # use hyexpr::fingerprint::FingerprintHasher;
/// let a = FingerprintHasher::new("::example").combine(&42i64).finish();
/// let b = FingerprintHasher::new("::example").combine(&42i64).finish();
/// let c = FingerprintHasher::new("::other").combine(&42i64).finish();
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
pub struct FingerprintHasher {
    lo: DefaultHasher,
    hi: DefaultHasher,
}

impl FingerprintHasher {
    /// Start a new fingerprint; `salt` separates unrelated entity kinds.
    pub fn new(salt: &str) -> Self {
        let mut lo = DefaultHasher::new();
        let mut hi = DefaultHasher::new();
        0x5a17u16.hash(&mut hi);
        salt.hash(&mut lo);
        salt.hash(&mut hi);
        Self { lo, hi }
    }

    /// Feed a hashable item.
    pub fn combine<T: Hash + ?Sized>(mut self, item: &T) -> Self {
        item.hash(&mut self.lo);
        item.hash(&mut self.hi);
        self
    }

    /// Feed a nested fingerprint.
    pub fn combine_fingerprint(self, fingerprint: Fingerprint) -> Self {
        self.combine(&fingerprint.0)
    }

    /// Feed a sequence, length-prefixed so that `[a, b] + [c]` differs from `[a] + [b, c]`.
    pub fn combine_all<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = Fingerprint>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self = self.combine(&items.len());
        for item in items {
            self = self.combine_fingerprint(item);
        }
        self
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(((self.hi.finish() as u128) << 64) | self.lo.finish() as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_length_prefixed() {
        let a = Fingerprint(1);
        let b = Fingerprint(2);
        let c = Fingerprint(3);

        let left = FingerprintHasher::new("seq")
            .combine_all([a, b])
            .combine_all([c])
            .finish();
        let right = FingerprintHasher::new("seq")
            .combine_all([a])
            .combine_all([b, c])
            .finish();
        assert_ne!(left, right);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(Fingerprint(0xff).to_string().len(), 32);
    }
}
