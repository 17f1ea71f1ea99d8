use crate::events::PlayerEvent;
use crate::item::ItemId;
use crate::scan::{self, ScanOptions};
use anyhow::{Context, Result, bail};
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Finish(ItemId),
    Delete(ItemId),
    Open(PathBuf),
    Quit,
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "end" | "done" | "finish" => Command::Finish(parse_id(verb, arg)?),
        "del" | "rm" | "delete" => Command::Delete(parse_id(verb, arg)?),
        "open" => {
            if arg.is_empty() {
                bail!("open needs a folder");
            }
            Command::Open(PathBuf::from(arg))
        }
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?} (try end, del, open, quit)"),
    };
    Ok(Some(command))
}

fn parse_id(verb: &str, arg: &str) -> Result<ItemId> {
    if arg.is_empty() {
        bail!("{verb} needs an item id");
    }
    arg.parse().with_context(|| format!("{verb}: bad item id"))
}

/// Read stdin on a dedicated thread and forward it line by line.
///
/// A plain thread rather than a blocking task: a pending terminal read must
/// not keep the runtime from shutting down.
pub fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

/// Turn console lines into player events until `quit`, end of input or cancellation.
#[instrument(skip_all)]
pub async fn run(
    mut lines: Receiver<String>,
    scan_options: ScanOptions,
    to_player: Sender<PlayerEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            info!("console input closed; initiating shutdown");
            break;
        };

        let event = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => {
                info!("quit requested");
                break;
            }
            Ok(Some(Command::Finish(id))) => PlayerEvent::Finished(id),
            Ok(Some(Command::Delete(id))) => PlayerEvent::DeleteRequested(id),
            Ok(Some(Command::Open(dir))) => {
                let opts = scan_options.clone();
                let selected = tokio::task::spawn_blocking(move || {
                    scan::select_folder(&dir, &opts)
                })
                .await?;
                match selected {
                    Ok(items) => PlayerEvent::Load(items),
                    Err(err) => {
                        warn!("{err}");
                        continue;
                    }
                }
            }
            Err(err) => {
                warn!("{err:#}");
                continue;
            }
        };

        if to_player.send(event).await.is_err() {
            warn!("player channel closed");
            break;
        }
    }

    cancel.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbs_and_aliases() {
        assert_eq!(
            parse_command("end #4").unwrap(),
            Some(Command::Finish("4".parse().unwrap()))
        );
        assert_eq!(
            parse_command("  RM 12 ").unwrap(),
            Some(Command::Delete("12".parse().unwrap()))
        );
        assert_eq!(
            parse_command("open /media/My Clips").unwrap(),
            Some(Command::Open(PathBuf::from("/media/My Clips")))
        );
        assert_eq!(parse_command("q").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_command("end").is_err());
        assert!(parse_command("del abc").is_err());
        assert!(parse_command("open").is_err());
        assert!(parse_command("rewind 3").is_err());
    }
}
