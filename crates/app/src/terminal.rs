//! Terminal participant
//!
//! Joins one channel, prints everything the channel delivers and sends
//! each stdin line as chat text.

use std::net::SocketAddr;

use anyhow::{bail, Result};
use rostrum_core::{ChatMessage, SenderKind};
use rostrum_net::{Client, ClientEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Line that signals readiness in the lobby
const ENGAGE_COMMAND: &str = "/engage";
/// Line that leaves the channel
const QUIT_COMMAND: &str = "/quit";

pub async fn run(addr: SocketAddr, channel: &str, name: &str, secret: Option<&str>) -> Result<()> {
    let mut client = Client::connect(addr).await?;
    client.join(channel, name, secret).await?;

    match client.next_event().await {
        Some(ClientEvent::Joined { channel, can_send, .. }) => {
            if can_send {
                println!("Joined {} as a participant. Type {} when ready, {} to leave.", channel, ENGAGE_COMMAND, QUIT_COMMAND);
            } else {
                println!("Joined {} as an observer (read-only). Type {} to leave.", channel, QUIT_COMMAND);
            }
        }
        Some(ClientEvent::JoinRejected { reason }) => bail!("join rejected: {}", reason),
        other => bail!("unexpected response to join: {:?}", other),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    match line {
                        "" => {}
                        QUIT_COMMAND => break,
                        ENGAGE_COMMAND => client.engage().await?,
                        text => client.send_text(text).await?,
                    }
                }
                None => break,
            },
            event = client.next_event() => match event {
                Some(ClientEvent::Message(msg)) => println!("{}", render(&msg)),
                Some(ClientEvent::ServerShutdown) => {
                    println!("Channel closed by the server.");
                    break;
                }
                Some(ClientEvent::Disconnected) | None => {
                    println!("Disconnected.");
                    break;
                }
                Some(_) => {}
            },
        }
    }

    client.disconnect();
    Ok(())
}

/// One message as terminal text
pub fn render(msg: &ChatMessage) -> String {
    let prefix = format!("[{}] {}:", msg.format_timestamp(), msg.sender);

    match (&msg.sender_kind, &msg.judge_report) {
        (SenderKind::Judge, Some(report)) if !report.is_empty() => {
            let mut out = format!("{} FINAL VERDICT", prefix);
            for (field, body) in report.sections() {
                out.push_str(&format!("\n\n== {} ==\n{}", field.heading(), body));
            }
            out
        }
        _ => format!("{} {}", prefix, msg.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostrum_core::parse_verdict;

    #[test]
    fn test_render_plain() {
        let msg = ChatMessage::user("alice", "Hello");
        let line = render(&msg);
        assert!(line.ends_with("alice: Hello"));
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_render_judge_sections() {
        let report = parse_verdict("#### Winner Declaration\nAlice\n\n#### Final Score\n8-6");
        let msg = ChatMessage::judge("**FINAL VERDICT**\n\n...", report);
        let out = render(&msg);

        assert!(out.contains("AI Judge: FINAL VERDICT"));
        assert!(out.contains("== Winner Declaration ==\nAlice"));
        assert!(out.contains("== Final Score ==\n8-6"));
        assert!(!out.contains("Persuasiveness"));
    }

    #[test]
    fn test_render_unstructured_judge_falls_back_to_text() {
        let msg = ChatMessage::judge("**FINAL VERDICT**\n\nA draw.", parse_verdict("A draw."));
        assert!(render(&msg).ends_with("A draw."));
    }
}
