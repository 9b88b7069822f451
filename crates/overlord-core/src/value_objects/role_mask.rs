//! Role mask - a user's role set encoded against the dense role index
//!
//! Every role in the snapshot gets an index (roles ordered by id). A mask is a
//! string of `'0'`/`'1'` with one position per index, which is how it is
//! persisted on the user row.

use std::fmt;

/// Per-user role bitmask over the dense role index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleMask(Vec<bool>);

impl RoleMask {
    /// Empty mask sized for `len` roles
    pub fn empty(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// Build a mask of size `len` with the given indices set.
    ///
    /// Indices outside the mask are ignored.
    pub fn from_indices<I>(len: usize, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut bits = vec![false; len];
        for idx in indices {
            if let Some(bit) = bits.get_mut(idx) {
                *bit = true;
            }
        }
        Self(bits)
    }

    /// Parse the persisted `'0'`/`'1'` representation
    pub fn parse(s: &str) -> Option<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Some(false),
                '1' => Some(true),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether the role at `idx` is set
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0.get(idx).copied().unwrap_or(false)
    }

    /// Indices of all set roles
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(idx, set)| set.then_some(idx))
    }

    /// Number of set roles
    pub fn count(&self) -> usize {
        self.0.iter().filter(|set| **set).count()
    }
}

impl fmt::Display for RoleMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in &self.0 {
            f.write_str(if *set { "1" } else { "0" })?;
        }
        Ok(())
    }
}
