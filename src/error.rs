use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt;

/// The error type for fallible table construction and growth.
///
/// Returned by every `try_*` method. When one of these errors is returned
/// the table is left exactly as it was before the call: growth allocates the
/// new slot array first and only swaps it in once it exists.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested slot count does not fit in a power of two that the
    /// platform can address.
    CapacityOverflow,

    /// The allocator refused to provide memory for the slot array.
    AllocError {
        /// The layout of the allocation that failed.
        layout: Layout,
    },
}

impl TryReserveError {
    /// Turn a fallible growth result into the infallible behavior used by the
    /// non-`try_` methods: abort through the global allocation error handler,
    /// or panic on capacity overflow.
    #[cold]
    #[inline(never)]
    pub(crate) fn handle(self) -> ! {
        match self {
            TryReserveError::CapacityOverflow => panic!("hash table capacity overflow"),
            TryReserveError::AllocError { layout } => handle_alloc_error(layout),
        }
    }
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str("requested capacity exceeds the maximum table size")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes for the slot array failed",
                layout.size()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

#[inline(always)]
pub(crate) fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => err.handle(),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            TryReserveError::CapacityOverflow.to_string(),
            "requested capacity exceeds the maximum table size"
        );

        let layout = Layout::array::<u64>(16).unwrap();
        assert_eq!(
            TryReserveError::AllocError { layout }.to_string(),
            "memory allocation of 128 bytes for the slot array failed"
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn overflow_panics_when_infallible() {
        infallible::<()>(Err(TryReserveError::CapacityOverflow));
    }
}
