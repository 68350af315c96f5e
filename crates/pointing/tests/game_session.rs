//! Integration tests for session composition: token checks, relay
//! election and the full voting flow.

use std::time::Duration;

use pointing::prelude::*;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

async fn until<F>(session: &GameSession, pred: F) -> GameState
where
    F: FnMut(&GameState) -> bool,
{
    let mut rx = session.participant().watch_state();
    let state = timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for state")
        .expect("participant stopped")
        .clone();
    state
}

async fn until_players(session: &GameSession, count: usize) -> GameState {
    until(session, |state| state.player_count() == count).await
}

fn my_id(session: &GameSession) -> PlayerId {
    session.participant().player().expect("connected").id
}

// =========================================================================
// Relay election
// =========================================================================

#[tokio::test]
async fn test_creator_is_relay_and_joiner_is_not() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();

    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();
    let flynn = GameSession::join(&net, holly.token().as_str(), "Flynn", &config)
        .await
        .unwrap();

    assert!(holly.is_relay());
    assert!(!flynn.is_relay());
    assert_eq!(holly.token(), flynn.token());
    assert_eq!(flynn.address(), holly.token().as_str());

    let holly_state = until_players(&holly, 2).await;
    let flynn_state = until_players(&flynn, 2).await;
    assert_eq!(holly_state, flynn_state);

    assert!(flynn.relay().is_none());
    let info = holly
        .relay()
        .expect("creator holds the relay")
        .info()
        .await
        .unwrap();
    assert!(info.state.is_active());
    assert_eq!(info.peer_count, 2);
    assert_eq!(info.snapshot, holly_state);
}

#[tokio::test]
async fn test_first_peer_on_a_valid_token_becomes_relay() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let token = TokenAuthority::new(config.token.clone()).generate().unwrap();

    let session = GameSession::join(&net, token.as_str(), "Holly", &config)
        .await
        .unwrap();

    assert!(session.is_relay());
    assert!(net.is_claimed(token.as_str()));
}

// =========================================================================
// Token checks
// =========================================================================

#[tokio::test]
async fn test_invalid_game_id_is_rejected_before_networking() {
    let net = MemoryNetwork::new();

    let err = GameSession::join(&net, "not-a-game", "Holly", &PointingConfig::default())
        .await
        .unwrap_err();

    assert!(err.is_invalid_game_id(), "got {err:?}");
    assert!(!net.is_claimed("not-a-game"));
}

#[tokio::test]
async fn test_token_from_other_deployment_is_rejected() {
    let net = MemoryNetwork::new();
    let other = TokenAuthority::new(TokenConfig::with_secret("elsewhere"))
        .generate()
        .unwrap();

    let err = GameSession::join(&net, other.as_str(), "Holly", &PointingConfig::default())
        .await
        .unwrap_err();

    assert!(err.is_invalid_game_id());
    assert!(!net.is_claimed(other.as_str()));
}

#[tokio::test]
async fn test_join_trims_pasted_game_id() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();

    let pasted = format!("  {}\n", holly.token());
    let flynn = GameSession::join(&net, &pasted, "Flynn", &config).await.unwrap();

    assert_eq!(flynn.token(), holly.token());
}

// =========================================================================
// Links
// =========================================================================

#[tokio::test]
async fn test_link_joins_the_same_session_without_a_name() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();

    let link = holly.link().to_string();
    assert!(link.starts_with("http://localhost:4321/game?gameId="));
    assert!(!link.contains("name="));

    let mut parsed = SessionLink::parse(&link).unwrap().with_name("Flynn");
    let name = parsed.take_name().unwrap();
    let flynn = GameSession::join(&net, parsed.game_id(), &name, &config)
        .await
        .unwrap();

    let state = until_players(&flynn, 2).await;
    assert_eq!(state.player(&my_id(&flynn)).unwrap().name, "Flynn");
}

// =========================================================================
// Voting flow
// =========================================================================

#[tokio::test]
async fn test_round_vote_reveal_and_clear() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();
    let flynn = GameSession::join(&net, holly.token().as_str(), "Flynn", &config)
        .await
        .unwrap();
    until_players(&holly, 2).await;
    until_players(&flynn, 2).await;

    holly.participant().send_vote(Vote::Points(3)).await.unwrap();
    flynn.participant().send_vote(Vote::Points(5)).await.unwrap();
    flynn.participant().send_set_votes_shown(true).await.unwrap();

    let revealed = until(&holly, |s| s.votes_visible && s.cast_count() == 2).await;
    let summary = RoundSummary::of(&revealed, &EstimationScale::default());
    assert_eq!(summary.average, Some(4.0));
    assert_eq!(summary.closest, Some(3));

    holly.participant().send_clear_votes().await.unwrap();

    let cleared = until(&flynn, |s| !s.votes_visible && s.cast_count() == 0).await;
    assert_eq!(cleared.player_count(), 2);
}

#[tokio::test]
async fn test_joiner_leaving_is_seen_by_host() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();
    let flynn = GameSession::join(&net, holly.token().as_str(), "Flynn", &config)
        .await
        .unwrap();
    until_players(&holly, 2).await;
    let flynn_id = my_id(&flynn);

    flynn.leave().await.unwrap();

    let state = until_players(&holly, 1).await;
    assert!(state.player(&flynn_id).is_none());
}

#[tokio::test]
async fn test_host_leaving_closes_everyone() {
    let net = MemoryNetwork::new();
    let config = PointingConfig::default();
    let holly = GameSession::create(&net, "Holly", &config).await.unwrap();
    let flynn = GameSession::join(&net, holly.token().as_str(), "Flynn", &config)
        .await
        .unwrap();
    until_players(&flynn, 2).await;
    let token = holly.token().clone();

    holly.leave().await.unwrap();

    let status = timeout(WAIT, flynn.participant().closed()).await.unwrap();
    assert_eq!(status, ParticipantStatus::Closed);
    assert!(!net.is_claimed(token.as_str()));
}

// =========================================================================
// WebSocket
// =========================================================================

#[tokio::test]
async fn test_websocket_join_and_vote() {
    let transport = WebSocketTransport::new();
    let host_config = PointingConfig {
        rendezvous: Some("127.0.0.1:0".into()),
        ..PointingConfig::default()
    };
    let holly = GameSession::create(&transport, "Holly", &host_config)
        .await
        .unwrap();
    assert!(holly.is_relay());

    // The relay resolved the ephemeral port; joiners dial that.
    let (rendezvous, path) = holly.address().split_once('/').unwrap();
    assert_eq!(path, holly.token().as_str());
    let joiner_config = PointingConfig {
        rendezvous: Some(rendezvous.to_string()),
        ..PointingConfig::default()
    };
    let flynn = GameSession::join(&transport, holly.token().as_str(), "Flynn", &joiner_config)
        .await
        .unwrap();
    assert!(!flynn.is_relay());

    let holly_state = until_players(&holly, 2).await;
    let flynn_state = until_players(&flynn, 2).await;
    assert_eq!(holly_state, flynn_state);

    let flynn_id = my_id(&flynn);
    flynn.participant().send_vote(Vote::Abstain).await.unwrap();
    let state = until(&holly, |s| s.vote_of(&flynn_id) == Some(Vote::Abstain)).await;
    assert_eq!(state.player(&flynn_id).unwrap().name, "Flynn");

    flynn.leave().await.unwrap();
    until_players(&holly, 1).await;
    holly.leave().await.unwrap();
}
