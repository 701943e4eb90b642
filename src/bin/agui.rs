use agui::api::{logging, AgentClient, DecodeSummary, ProtocolError};
use agui::config::Config;
use agui::dispatch::ComponentRegistry;
use agui::state::{Conversation, ConversationUpdate};
use agui::ui::render::TranscriptPrinter;
use anyhow::Result;
use crossterm::style::Stylize;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Routes Ctrl-C for the whole session: it cancels the in-flight turn, or
/// ends the session when no turn is running.
#[derive(Clone, Default)]
struct Interrupts {
    session: CancellationToken,
    turn: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    fn listen(&self) -> JoinHandle<()> {
        let interrupts = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts.interrupt();
            }
        })
    }

    fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.turn.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn end_turn(&self) {
        self.turn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn interrupt(&self) {
        let turn = self.turn.lock().unwrap_or_else(PoisonError::into_inner);
        match turn.as_ref().filter(|token| !token.is_cancelled()) {
            Some(token) => token.cancel(),
            None => self.session.cancel(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    logging::init_tracing()?;

    let client = AgentClient::new(&config)?;
    let mut conversation = Conversation::new(client, config.merge_policy);
    let registry = Arc::new(ComponentRegistry::with_builtin_widgets());
    let color = std::io::stdout().is_terminal();

    let interrupts = Interrupts::default();
    let listener = interrupts.listen();

    let one_shot = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !one_shot.trim().is_empty() {
        let printer = TranscriptPrinter::new(registry).with_color(color);
        let result = run_one_shot(&mut conversation, one_shot, printer, &interrupts).await;
        listener.abort();
        return result;
    }

    tracing::info!(
        endpoint = %conversation.client().endpoint_url(),
        merge_policy = ?conversation.merge_policy(),
        "agui ready"
    );
    let mut printer = TranscriptPrinter::new(registry)
        .with_color(color)
        .echo_user(false);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(color)?;
        let line = tokio::select! {
            biased;
            () = interrupts.session.cancelled() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&input) {
            break;
        }

        let (next, outcome) =
            run_turn(&mut conversation, input.to_string(), printer, &interrupts).await?;
        printer = next;
        if let Err(error) = outcome {
            eprintln!("error: {error}");
        }
    }

    listener.abort();
    Ok(())
}

/// One message from argv. A transport failure becomes the process error.
async fn run_one_shot(
    conversation: &mut Conversation,
    text: String,
    printer: TranscriptPrinter,
    interrupts: &Interrupts,
) -> Result<()> {
    let (_, outcome) = run_turn(conversation, text, printer, interrupts).await?;
    outcome?;
    Ok(())
}

/// Run one request, rendering snapshots as they arrive. The transport
/// outcome is handed back so the caller decides how to report it.
async fn run_turn(
    conversation: &mut Conversation,
    text: String,
    mut printer: TranscriptPrinter,
    interrupts: &Interrupts,
) -> Result<(TranscriptPrinter, Result<DecodeSummary, ProtocolError>)> {
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let cancel = interrupts.begin_turn();

    let render = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(update) = update_rx.recv().await {
            let out = match update {
                ConversationUpdate::TurnsChanged(snapshot) => printer.advance(&snapshot),
                ConversationUpdate::Error(_) => printer.finish(),
                ConversationUpdate::TurnComplete(summary) if summary.cancelled => {
                    format!("{}[cancelled]\n", printer.finish())
                }
                ConversationUpdate::TurnComplete(summary) if summary.malformed > 0 => format!(
                    "{}[skipped {} undecodable line(s)]\n",
                    printer.finish(),
                    summary.malformed
                ),
                ConversationUpdate::TurnStarted
                | ConversationUpdate::Event(_)
                | ConversationUpdate::TurnComplete(_) => continue,
            };
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
        let tail = printer.finish();
        let _ = stdout.write_all(tail.as_bytes());
        let _ = stdout.flush();
        printer
    });

    let outcome = conversation
        .send_message(text, Some(&update_tx), &cancel)
        .await;
    interrupts.end_turn();
    drop(update_tx);
    let printer = render.await?;

    Ok((printer, outcome))
}

fn print_prompt(color: bool) -> Result<()> {
    let mut stdout = std::io::stdout();
    if color {
        write!(stdout, "{} ", "you>".green().bold())?;
    } else {
        write!(stdout, "you> ")?;
    }
    stdout.flush()?;
    Ok(())
}
