//! Priority override between competing setups on one symbol.
//!
//! Two setups compete when they share a symbol and their validity windows
//! overlap. Priority 1 beats priority 2; at equal priority the higher
//! confidence wins. Equal priority and equal confidence do not compete.

use crate::domain::{Setup, SetupId, SetupStatus};

/// True if `a` overrides `b`.
pub fn supersedes(a: &Setup, b: &Setup) -> bool {
    if a.id == b.id || a.symbol != b.symbol || !a.overlaps(b) {
        return false;
    }
    match a.priority.cmp(&b.priority) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => a.confidence > b.confidence,
    }
}

/// True if activating `active` cancels `pending`: same symbol, overlapping
/// windows and strictly lower priority.
pub fn cancels_on_activation(active: &Setup, pending: &Setup) -> bool {
    active.id != pending.id
        && active.symbol == pending.symbol
        && active.priority < pending.priority
        && active.overlaps(pending)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Keep the incoming setup and cancel the listed pending ones.
    Accept { cancel: Vec<SetupId> },
    /// Drop the incoming setup; an existing pending setup outranks it.
    Reject { by: SetupId },
}

/// Compare a new setup with the pending setups already on its symbol.
pub fn resolve_conflicts(incoming: &Setup, pending: &[Setup]) -> Resolution {
    let competing = pending
        .iter()
        .filter(|p| p.status == SetupStatus::Pending && p.symbol == incoming.symbol);

    let mut cancel = Vec::new();
    for existing in competing {
        if supersedes(existing, incoming) {
            return Resolution::Reject {
                by: existing.id.clone(),
            };
        }
        if supersedes(incoming, existing) {
            cancel.push(existing.id.clone());
        }
    }
    Resolution::Accept { cancel }
}
