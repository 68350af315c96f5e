//! Terminal client for pointing sessions.
//!
//! Without `--game-id` or `--link` a new session is created and its share
//! link printed. The first peer on a session becomes its relay, listening
//! on `--server`; later peers connect there.

mod command;

use std::fmt::Write as _;

use clap::Parser;
use pointing::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "pointing", version, about = "Planning poker without a server")]
struct Cli {
    /// `host:port` the session relay listens on.
    #[arg(long, default_value = "127.0.0.1:4444")]
    server: String,

    /// Session to join. Without one, a new session is created.
    #[arg(long, conflicts_with = "link")]
    game_id: Option<String>,

    /// Session link to join. A `name` in the link is used when `--name` is
    /// not given.
    #[arg(long)]
    link: Option<String>,

    /// Display name.
    #[arg(long)]
    name: Option<String>,

    /// Token signing secret shared by every client of the deployment.
    #[arg(long, env = "POINTING_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        if e.is_invalid_game_id() {
            eprintln!("Invalid Game ID");
        } else {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), PointingError> {
    let mut config = PointingConfig::from_env();
    if let Some(secret) = cli.secret {
        config.token = TokenConfig::with_secret(secret);
    }
    config.rendezvous = Some(cli.server);

    let (game_id, link_name) = match (cli.game_id, cli.link) {
        (Some(game_id), _) => (Some(game_id), None),
        (None, Some(link)) => {
            let mut link = SessionLink::parse(&link)?;
            let name = link.take_name();
            (Some(link.game_id().to_string()), name)
        }
        (None, None) => (None, None),
    };
    let name = cli
        .name
        .or(link_name)
        .unwrap_or_else(|| "Anonymous".to_string());

    let transport = WebSocketTransport::new();
    let session = match game_id {
        Some(game_id) => GameSession::join(&transport, &game_id, &name, &config).await?,
        None => GameSession::create(&transport, &name, &config).await?,
    };

    let role = if session.is_relay() { " (hosting)" } else { "" };
    println!("Joined session {} as {name}{role}", session.token());
    println!("Share this link: {}", session.link());
    println!("{HELP}");

    command_loop(&session).await;
    session.leave().await
}

/// Reads commands until `quit`, end of input, or the session closing.
async fn command_loop(session: &GameSession) {
    let participant = session.participant();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut state = participant.watch_state();
    let mut status = participant.watch_status();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => return,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read stdin");
                        return;
                    }
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => return,
                    Ok(command) => {
                        if let Err(e) = execute(session, command).await {
                            eprintln!("{e}");
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            Ok(()) = state.changed() => {
                let snapshot = state.borrow_and_update().clone();
                print!("{}", render(&snapshot, participant.scale()));
            }
            changed = status.changed() => {
                let current = status.borrow_and_update().clone();
                match current {
                    ParticipantStatus::Connected(_) if changed.is_ok() => {}
                    ParticipantStatus::Failed(reason) => {
                        eprintln!("Session failed: {reason}");
                        return;
                    }
                    _ => {
                        println!("Session closed.");
                        return;
                    }
                }
            }
        }
    }
}

async fn execute(session: &GameSession, command: Command) -> Result<(), RoomError> {
    let participant = session.participant();
    match command {
        Command::Vote(points) => participant.send_vote(Vote::Points(points)).await,
        Command::Abstain => participant.send_vote(Vote::Abstain).await,
        Command::Show => participant.send_set_votes_shown(true).await,
        Command::Hide => participant.send_set_votes_shown(false).await,
        Command::Clear => participant.send_clear_votes().await,
        Command::State => {
            print!("{}", render(&participant.state(), participant.scale()));
            if let Some(relay) = session.relay() {
                let info = relay.info().await?;
                if info.state.is_active() {
                    println!("Hosting {} connection(s) at {}", info.peer_count, info.address);
                } else {
                    println!("Relay is {}", info.state);
                }
            }
            Ok(())
        }
        Command::Link => {
            println!("{}", session.link());
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

/// Renders the table. Votes stay hidden until revealed; only whether a
/// player has voted shows.
fn render(state: &GameState, scale: &EstimationScale) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Players:");
    for entry in state.players.values() {
        let shown = match (state.votes_visible, entry.vote) {
            (true, Vote::Unset) => "-".to_string(),
            (true, vote) => vote.to_string(),
            (false, Vote::Unset) => "thinking".to_string(),
            (false, _) => "voted".to_string(),
        };
        let _ = writeln!(out, "  {:<16} {shown}", entry.name);
    }

    if !state.votes_visible {
        let _ = writeln!(out, "Votes hidden ({}/{} in)", state.cast_count(), state.player_count());
        return out;
    }

    let summary = RoundSummary::of(state, scale);
    let average = summary
        .average
        .map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}"));
    let closest = summary
        .closest
        .map_or_else(|| "-".to_string(), |value| value.to_string());
    let _ = writeln!(out, "Average: {average}  Closest: {closest}");
    for (value, count) in &summary.distribution {
        let _ = writeln!(out, "  {value:>3} {}", "#".repeat(*count));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(votes: &[(&str, Vote)], visible: bool) -> GameState {
        let mut state = GameState {
            votes_visible: visible,
            ..GameState::default()
        };
        for (name, vote) in votes {
            state.players.insert(
                PlayerId(name.to_lowercase()),
                pointing_protocol::PlayerEntry {
                    name: name.to_string(),
                    vote: *vote,
                },
            );
        }
        state
    }

    #[test]
    fn test_render_hidden_votes_show_progress_only() {
        let table = state(&[("Holly", Vote::Points(3)), ("Flynn", Vote::Unset)], false);

        let out = render(&table, &EstimationScale::default());

        assert!(out.contains("voted"));
        assert!(out.contains("thinking"));
        assert!(!out.contains(" 3\n"));
        assert!(out.contains("(1/2 in)"));
    }

    #[test]
    fn test_render_visible_votes_include_summary() {
        let table = state(
            &[
                ("Holly", Vote::Points(3)),
                ("Flynn", Vote::Points(5)),
                ("Marie", Vote::Points(5)),
                ("Mike", Vote::Points(2)),
            ],
            true,
        );

        let out = render(&table, &EstimationScale::default());

        assert!(out.contains("Average: 3.8  Closest: 3"));
        assert!(out.contains("    5 ##\n"));
    }

    #[test]
    fn test_cli_rejects_game_id_with_link() {
        let parsed = Cli::try_parse_from(["pointing", "--game-id", "abc", "--link", "/game?gameId=abc"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["pointing"]).unwrap();
        assert_eq!(cli.server, "127.0.0.1:4444");
        assert!(cli.game_id.is_none());
        assert!(cli.name.is_none());
    }
}
