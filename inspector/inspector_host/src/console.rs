use inspector_runtime::{InputDescriptor, LocalEdit, RenderSurface};
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;

/// Line-oriented stand-in for a graphical inspector: changes are logged,
/// edits are read from stdin.
pub struct ConsoleSurface;

impl RenderSurface for ConsoleSurface {
    fn inputs_replaced(&mut self, inputs: &[InputDescriptor]) {
        tracing::info!(count = inputs.len(), "inputs updated");
        for (index, input) in inputs.iter().enumerate() {
            tracing::info!(index, input = %input.0, "input");
        }
    }

    fn connection_changed(&mut self, connected: bool) {
        tracing::info!(connected, "connection state changed");
    }
}

pub fn spawn_edit_reader(tx: mpsc::Sender<LocalEdit>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(%err, "stdin read failed; local edits disabled");
                    return;
                }
            };

            match parse_edit(&line) {
                Ok(Some(edit)) => {
                    if tx.blocking_send(edit).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(reason) => tracing::warn!(%reason, "ignoring edit command"),
            }
        }
    })
}

fn parse_edit(line: &str) -> Result<Option<LocalEdit>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "function" => Ok(Some(LocalEdit::FunctionName(arg.to_string()))),
        "select" => arg
            .parse::<i64>()
            .map(|index| Some(LocalEdit::SelectedIndex(index)))
            .map_err(|_| format!("invalid index '{arg}'")),
        other => Err(format!("unknown command '{other}'")),
    }
}
