mod classify;
mod clock;
mod config;
mod db;
mod error;
mod ipc;
mod ledger;
mod paging;
mod roll;
mod roster;
mod session;
mod tally;
mod ticker;

use anyhow::Context;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

use crate::clock::PinnableClock;
use crate::roll::RollCall;
use crate::ticker::TickSink;

/// Everything the event loop reacts to, in arrival order.
enum Inbound {
    Line(String),
    Tick(u64),
    Eof,
}

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn spawn_stdin_reader(tx: mpsc::Sender<Inbound>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(Inbound::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(Inbound::Eof);
        })
        .context("failed to spawn stdin reader")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cfg = config::Config::from_env()?;

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cfg.log_filter).context("ROLLCALL_LOG")?)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let (tx, rx) = mpsc::channel::<Inbound>();
    let tick_tx = tx.clone();
    let sink: TickSink = Arc::new(move |generation| tick_tx.send(Inbound::Tick(generation)).is_ok());

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        roll: RollCall::new(cfg.roll_settings(), Some(sink)),
        clock: PinnableClock::default(),
    };
    if let Some(path) = cfg.workspace.clone() {
        ipc::select_workspace(&mut state, path).context("failed to open configured workspace")?;
    }

    spawn_stdin_reader(tx)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rollcalld ready");

    let mut stdout = io::stdout();
    for inbound in rx {
        match inbound {
            Inbound::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let req: ipc::Request = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        // Can't reply without id.
                        tracing::warn!(error = %e, "bad request line");
                        write_line(
                            &mut stdout,
                            &serde_json::json!({
                                "ok": false,
                                "error": { "code": "bad_json", "message": e.to_string() }
                            }),
                        );
                        continue;
                    }
                };
                let resp = ipc::handle_request(&mut state, req);
                write_line(&mut stdout, &resp);
            }
            Inbound::Tick(generation) => {
                if let Some(event) = ipc::handle_tick(&mut state, generation) {
                    write_line(&mut stdout, &event);
                }
            }
            Inbound::Eof => break,
        }
    }

    state.roll.close();
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
