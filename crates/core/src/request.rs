//! Client request tracking.

/// Key of one watched submission.
///
/// The runner hands one out per accepted extrinsic and keeps the matching
/// status sender; the chain only ever sees the id and echoes it back in
/// `Action::EmitTransactionStatus`. Ids are never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The id handed out after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}
