//! Determinism flags
//!
//! Replicas execute the same serialized plan independently; the engine
//! replays plans during recovery. Both require knowing whether repeated
//! execution yields the same rows (content determinism) in the same order
//! (order determinism). The two flags are coupled: a deterministic order
//! implies deterministic content, and nondeterministic content rules out a
//! deterministic order. This type only exposes operations that preserve that
//! coupling.

/// Determinism flag pair with an explanation for any nondeterminism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Determinism {
    order_deterministic: bool,
    content_deterministic: bool,
    nondeterminism_detail: Option<String>,
}

impl Default for Determinism {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl Determinism {
    /// Fully deterministic: same rows, same order, no explanation
    pub fn deterministic() -> Self {
        Self {
            order_deterministic: true,
            content_deterministic: true,
            nondeterminism_detail: None,
        }
    }

    /// Reconstruct a flag pair from raw parts, rejecting inconsistent states
    ///
    /// Returns `None` if order determinism is claimed without content
    /// determinism, or if the explanation's presence does not match the
    /// flags (present iff either flag is false).
    pub fn from_flags(
        order_deterministic: bool,
        content_deterministic: bool,
        nondeterminism_detail: Option<String>,
    ) -> Option<Self> {
        if order_deterministic && !content_deterministic {
            return None;
        }
        let fully = order_deterministic && content_deterministic;
        if fully == nondeterminism_detail.is_some() {
            return None;
        }
        Some(Self {
            order_deterministic,
            content_deterministic,
            nondeterminism_detail,
        })
    }

    /// Whether repeated execution yields rows in the same order
    pub fn is_order_deterministic(&self) -> bool {
        self.order_deterministic
    }

    /// Whether repeated execution yields the same rows, order aside
    pub fn is_content_deterministic(&self) -> bool {
        self.content_deterministic
    }

    /// Why this plan fragment is nondeterministic, if it is
    pub fn nondeterminism_detail(&self) -> Option<&str> {
        self.nondeterminism_detail.as_deref()
    }

    /// Set the order determinism flag
    ///
    /// Setting it true also forces content determinism and clears the
    /// explanation; setting it false records the explanation.
    pub fn set_order_determinism(&mut self, flag: bool, explanation: &str) {
        self.order_deterministic = flag;
        if flag {
            self.content_deterministic = true;
            self.nondeterminism_detail = None;
        } else {
            self.nondeterminism_detail = Some(explanation.to_string());
        }
    }

    /// Set the content determinism flag
    ///
    /// Setting it false also forces order determinism false and records the
    /// explanation.
    pub fn set_content_determinism(&mut self, flag: bool, explanation: &str) {
        self.content_deterministic = flag;
        if !flag {
            self.order_deterministic = false;
            self.nondeterminism_detail = Some(explanation.to_string());
        } else if self.order_deterministic {
            self.nondeterminism_detail = None;
        }
    }

    /// Fold a child's determinism into this node's (conjunction)
    ///
    /// Degrades only: a nondeterministic child makes the parent at most as
    /// deterministic, carrying the child's explanation up the tree.
    pub fn combine(&mut self, child: &Determinism) {
        let detail = child
            .nondeterminism_detail
            .as_deref()
            .unwrap_or("nondeterministic input");
        if !child.content_deterministic {
            self.set_content_determinism(false, detail);
        } else if !child.order_deterministic && self.order_deterministic {
            self.set_order_determinism(false, detail);
        }
    }
}
