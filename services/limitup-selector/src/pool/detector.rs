//! First-board detection across consecutive sessions.
//!
//! A first board is an instrument that sealed the limit on the most
//! recent session without having sealed it the session before. The
//! fresh not-closed pool is the analogue for boards that broke open:
//! touched the limit most recently, but did not seal the prior
//! session either.

use std::collections::HashSet;

use super::SessionPools;

/// Instruments sealed on `latest` that were not sealed on `prior`.
/// Candidate order follows `latest.closed`.
pub fn first_board_pool(latest: &SessionPools, prior: &SessionPools) -> Vec<String> {
    let sealed_before: HashSet<&str> = prior.closed.iter().map(String::as_str).collect();
    latest
        .closed
        .iter()
        .filter(|s| !sealed_before.contains(s.as_str()))
        .cloned()
        .collect()
}

/// Instruments that touched but did not seal on `latest`, excluding
/// anything sealed on `prior`.
pub fn fresh_not_closed_pool(latest: &SessionPools, prior: &SessionPools) -> Vec<String> {
    let sealed_before: HashSet<&str> = prior.closed.iter().map(String::as_str).collect();
    latest
        .not_closed
        .iter()
        .filter(|s| !sealed_before.contains(s.as_str()))
        .cloned()
        .collect()
}
