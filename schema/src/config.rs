//! Limits applied while encoding and decoding.

use core::ops::{Bound, RangeBounds};

/// The default maximum nesting depth of model references.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// An allowed range of values, built from any Rust range expression.
///
/// Used to bound the length prefixes of text, bytes, lists, and maps read from untrusted input.
///
/// ```
/// use commonware_schema::RangeCfg;
///
/// let lengths = RangeCfg::from(..=1024);
/// assert!(lengths.contains(&1024));
/// assert!(!lengths.contains(&1025));
///
/// let non_empty = RangeCfg::new(1usize..);
/// assert!(!non_empty.contains(&0));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg<T: Copy + PartialOrd> {
    lower: Bound<T>,
    upper: Bound<T>,
}

impl<T: Copy + PartialOrd> RangeCfg<T> {
    pub fn new(range: impl RangeBounds<T>) -> Self {
        Self {
            lower: range.start_bound().cloned(),
            upper: range.end_bound().cloned(),
        }
    }

    /// Returns true if `value` lies within the range.
    pub fn contains(&self, value: &T) -> bool {
        RangeBounds::contains(self, value)
    }
}

impl<T: Copy + PartialOrd> RangeBounds<T> for RangeCfg<T> {
    fn start_bound(&self) -> Bound<&T> {
        self.lower.as_ref()
    }

    fn end_bound(&self) -> Bound<&T> {
        self.upper.as_ref()
    }
}

macro_rules! impl_from_range {
    ($($range:ty),*) => {
        $(
            impl<T: Copy + PartialOrd> From<$range> for RangeCfg<T> {
                fn from(range: $range) -> Self {
                    Self::new(range)
                }
            }
        )*
    };
}

impl_from_range!(
    core::ops::Range<T>,
    core::ops::RangeInclusive<T>,
    core::ops::RangeFrom<T>,
    core::ops::RangeTo<T>,
    core::ops::RangeToInclusive<T>
);

impl<T: Copy + PartialOrd> From<core::ops::RangeFull> for RangeCfg<T> {
    fn from(_: core::ops::RangeFull) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }
}

/// Limits shared by every encode and decode issued through a [crate::Codec].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of nested model references below the outermost message.
    pub max_depth: usize,

    /// Allowed length of every text, bytes, list, and map read from a buffer.
    pub lengths: RangeCfg<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            lengths: RangeCfg::from(..),
        }
    }
}

/// Tracks the nesting depth of a single encode or decode call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scope<'a> {
    pub(crate) cfg: &'a Config,
    depth: usize,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(cfg: &'a Config) -> Self {
        Self { cfg, depth: 0 }
    }

    /// Enters a nested model, or returns `None` once the configured depth is reached.
    pub(crate) fn nested(self) -> Option<Self> {
        (self.depth < self.cfg.max_depth).then_some(Self {
            cfg: self.cfg,
            depth: self.depth + 1,
        })
    }
}
