//! Consensus resolution.
//!
//! Picks the plurality reaction from a tally. Ties break by position in
//! `Reaction::CANONICAL_ORDER`, never by map iteration order, so results are
//! stable across runs and platforms.

use std::collections::HashMap;

use crate::config::ActionMapping;
use crate::signals::{Action, Reaction};

/// Returns the reaction with the highest count, or `None` for an empty tally.
pub fn resolve(tally: &HashMap<Reaction, usize>) -> Option<Reaction> {
    let mut winner: Option<(Reaction, usize)> = None;

    for reaction in Reaction::CANONICAL_ORDER {
        let Some(&count) = tally.get(&reaction) else {
            continue;
        };
        if count == 0 {
            continue;
        }
        match winner {
            Some((_, best)) if best >= count => {}
            _ => winner = Some((reaction, count)),
        }
    }

    winner.map(|(reaction, _)| reaction)
}

/// Resolves a tally all the way to a dispatchable action.
///
/// A winning reaction with no mapped action is treated identically to "no
/// signal".
pub fn resolve_action(tally: &HashMap<Reaction, usize>, mapping: &ActionMapping) -> Option<Action> {
    resolve(tally).and_then(|reaction| mapping.action_for(reaction))
}
