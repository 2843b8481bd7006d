use crate::mesh_error::MeshFlowError;

/// Trait for validating data structure invariants.
///
/// Merge and extraction engines call [`validate_invariants`](Self::validate_invariants)
/// on their inputs before touching any output.
pub trait DebugInvariants {
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshFlowError>;

    /// Panic on a broken invariant in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "debug_assert_invariants");
    }
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
