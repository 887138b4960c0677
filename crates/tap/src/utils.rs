//! Utility macros shared across the crate.

/// Early-return with an error when a condition does not hold.
///
/// Like `assert!`, but produces an `Err` instead of panicking, which keeps
/// validation checks on the fallible path.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
