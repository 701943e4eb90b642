use crate::dispatch::ComponentRegistry;
use crate::state::{ConversationTurn, Role, TurnPayload};
use crossterm::style::Stylize;
use std::sync::Arc;

const USER_LABEL: &str = "you>";
const AGENT_LABEL: &str = "agent>";
const WIDGET_INDENT: &str = "  ";

/// Incremental terminal rendering of turn snapshots. Each call to
/// [`TranscriptPrinter::advance`] returns only what is new since the last
/// snapshot: the text appended to the open turn, then any new turns.
pub struct TranscriptPrinter {
    registry: Arc<ComponentRegistry>,
    color: bool,
    echo_user: bool,
    printed_turns: usize,
    printed_text_len: usize,
    line_open: bool,
}

impl TranscriptPrinter {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            color: false,
            echo_user: true,
            printed_turns: 0,
            printed_text_len: 0,
            line_open: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Skip user turns, e.g. when the terminal already shows what was typed.
    pub fn echo_user(mut self, echo_user: bool) -> Self {
        self.echo_user = echo_user;
        self
    }

    pub fn advance(&mut self, turns: &[ConversationTurn]) -> String {
        let mut out = String::new();

        if turns.len() < self.printed_turns {
            // A different conversation; start over.
            self.printed_turns = 0;
            self.printed_text_len = 0;
            out.push_str(&self.close_line());
        }

        let open_turn = self.printed_turns.checked_sub(1).and_then(|i| turns.get(i));
        if let (true, Some(open)) = (self.line_open, open_turn) {
            if let TurnPayload::Text { text } = &open.payload {
                if let Some(suffix) = text.get(self.printed_text_len..) {
                    out.push_str(suffix);
                }
                self.printed_text_len = text.len();
            }
        }

        for turn in &turns[self.printed_turns..] {
            out.push_str(&self.close_line());
            self.printed_text_len = 0;

            if turn.role == Role::User && !self.echo_user {
                continue;
            }

            match &turn.payload {
                TurnPayload::Text { text } => {
                    out.push_str(&self.label(turn.role));
                    out.push(' ');
                    out.push_str(text);
                    self.printed_text_len = text.len();
                    self.line_open = true;
                }
                TurnPayload::Ui { component, props } => {
                    out.push_str(&self.label(turn.role));
                    out.push('\n');
                    for line in self.registry.render(component, props) {
                        out.push_str(WIDGET_INDENT);
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
            }
        }

        self.printed_turns = turns.len();
        out
    }

    /// Terminate a text line left open by the last snapshot.
    pub fn finish(&mut self) -> String {
        self.close_line()
    }

    fn close_line(&mut self) -> String {
        if std::mem::take(&mut self.line_open) {
            "\n".to_string()
        } else {
            String::new()
        }
    }

    fn label(&self, role: Role) -> String {
        let label = match role {
            Role::User => USER_LABEL,
            Role::Assistant => AGENT_LABEL,
        };
        if !self.color {
            return label.to_string();
        }
        match role {
            Role::User => label.green().bold().to_string(),
            Role::Assistant => label.cyan().bold().to_string(),
        }
    }
}
