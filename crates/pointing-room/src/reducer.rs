//! The replicated game state reducer.
//!
//! Every peer folds the events it receives through these functions, in the
//! order the relay delivered them, so identical inputs always yield
//! identical states. Each function takes the current state by reference
//! and returns the next one.

use pointing_protocol::{GameState, Player, PlayerEntry, SessionEvent, Vote};

/// Records `player`'s vote, adding the player if they are unknown.
///
/// Joining is a vote of [`Vote::Unset`].
pub fn apply_vote(state: &GameState, player: &Player, vote: Vote) -> GameState {
    let mut next = state.clone();
    next.players.insert(
        player.id.clone(),
        PlayerEntry {
            name: player.name.clone(),
            vote,
        },
    );
    next
}

/// Removes `player`. Unknown players are ignored.
pub fn apply_player_leave(state: &GameState, player: &Player) -> GameState {
    let mut next = state.clone();
    next.players.remove(&player.id);
    next
}

/// Shows or hides votes without touching them.
pub fn apply_set_votes_visible(state: &GameState, visible: bool) -> GameState {
    GameState {
        players: state.players.clone(),
        votes_visible: visible,
    }
}

/// Starts a new round: every vote unset, votes hidden.
pub fn apply_clear_votes(state: &GameState) -> GameState {
    GameState {
        players: state
            .players
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    PlayerEntry {
                        name: entry.name.clone(),
                        vote: Vote::Unset,
                    },
                )
            })
            .collect(),
        votes_visible: false,
    }
}

/// Replaces the whole state with a snapshot.
pub fn apply_sync_state(_state: &GameState, full: &GameState) -> GameState {
    full.clone()
}

/// Applies one [`SessionEvent`].
pub fn apply(state: &GameState, event: &SessionEvent) -> GameState {
    match event {
        SessionEvent::Vote { player, vote } => apply_vote(state, player, *vote),
        SessionEvent::PlayerJoin { player } => apply_vote(state, player, Vote::Unset),
        SessionEvent::PlayerLeave { player } => apply_player_leave(state, player),
        SessionEvent::ToggleVotesShown { shown } => apply_set_votes_visible(state, *shown),
        SessionEvent::ClearVotes => apply_clear_votes(state),
        SessionEvent::SyncState { game_state } => apply_sync_state(state, game_state),
    }
}
