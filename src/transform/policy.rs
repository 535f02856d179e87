//! Argument synthesis and rewrite strategies.

use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// How the injected `i32` argument is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArgumentPolicy {
    /// Use the current [`ReplacementCounter`] value, then advance it.
    #[default]
    Counter,
    /// Use the same configured constant at every site.
    Fixed,
}

/// How a call instruction is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RewriteStrategy {
    /// Build a fresh call instruction and splice it in place of the old one.
    #[default]
    Replace,
    /// Change the callee and arguments of the existing instruction in place.
    Mutate,
}

/// The value fed to the next counter-policy replacement.
///
/// The counter is plain data: it is created with a seed, threaded through a
/// replacer and handed back, so callers decide whether numbering restarts per
/// run or continues across runs.
///
/// # Examples
///
/// ```rust
/// use callswap::transform::ReplacementCounter;
///
/// let mut counter = ReplacementCounter::default();
/// assert_eq!(counter.take()?, 1);
/// assert_eq!(counter.take()?, 2);
/// assert_eq!(counter.peek(), Some(3));
/// # Ok::<(), callswap::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplacementCounter {
    next: i64,
}

impl ReplacementCounter {
    /// The value a counter starts from unless configured otherwise.
    pub const DEFAULT_SEED: i32 = 1;

    /// Creates a counter whose first value is `seed`.
    #[must_use]
    pub const fn new(seed: i32) -> Self {
        ReplacementCounter {
            next: seed as i64,
        }
    }

    /// Returns the value the next [`ReplacementCounter::take`] will produce, or
    /// `None` once the counter has left the `i32` range.
    #[must_use]
    pub fn peek(&self) -> Option<i32> {
        i32::try_from(self.next).ok()
    }

    /// Returns the current value and advances the counter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterOverflow`] once `i32::MAX` has been handed out.
    pub fn take(&mut self) -> Result<i32> {
        let value = i32::try_from(self.next).map_err(|_| Error::CounterOverflow(i32::MAX))?;
        self.next += 1;
        Ok(value)
    }
}

impl Default for ReplacementCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}
