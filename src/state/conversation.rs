use super::reducer::{apply_event_with, MergePolicy};
use super::turn::ConversationTurn;
use crate::api::{AgentClient, DecodeSummary, ProtocolError};
use crate::types::ProtocolEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Immutable view of the whole turn sequence at one point in time.
pub type TurnSnapshot = Arc<Vec<ConversationTurn>>;

#[derive(Debug, Clone)]
pub enum ConversationUpdate {
    TurnStarted,
    /// Every decoded event, including the ones that do not touch the turns.
    Event(ProtocolEvent),
    TurnsChanged(TurnSnapshot),
    TurnComplete(DecodeSummary),
    Error(String),
}

/// Read-only view of a conversation's in-flight flag.
#[derive(Debug, Clone, Default)]
pub struct BusyHandle(Arc<AtomicBool>);

impl BusyHandle {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Conversation {
    client: Arc<AgentClient>,
    merge_policy: MergePolicy,
    turns: TurnSnapshot,
    busy: Arc<AtomicBool>,
}

impl Conversation {
    pub fn new(client: AgentClient, merge_policy: MergePolicy) -> Self {
        Self {
            client: Arc::new(client),
            merge_policy,
            turns: Arc::new(Vec::new()),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn turns(&self) -> TurnSnapshot {
        Arc::clone(&self.turns)
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn busy_handle(&self) -> BusyHandle {
        BusyHandle(Arc::clone(&self.busy))
    }

    pub fn client(&self) -> Arc<AgentClient> {
        Arc::clone(&self.client)
    }

    pub fn push_user_message(&mut self, text: impl Into<String>) -> TurnSnapshot {
        let mut next = self.turns.to_vec();
        next.push(ConversationTurn::user(text));
        self.turns = Arc::new(next);
        self.turns()
    }

    pub fn apply(&mut self, event: &ProtocolEvent) -> TurnSnapshot {
        self.turns = Arc::new(apply_event_with(self.merge_policy, &self.turns, event));
        self.turns()
    }

    /// Record the user's turn, then stream the agent's reply into the
    /// conversation. Turns applied before a failure are kept.
    pub async fn send_message(
        &mut self,
        text: String,
        update_tx: Option<&mpsc::UnboundedSender<ConversationUpdate>>,
        cancel: &CancellationToken,
    ) -> Result<DecodeSummary, ProtocolError> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ProtocolError::Busy)?;

        let snapshot = self.push_user_message(text.as_str());
        emit_update(update_tx, ConversationUpdate::TurnsChanged(snapshot));
        emit_update(update_tx, ConversationUpdate::TurnStarted);

        let client = Arc::clone(&self.client);
        let policy = self.merge_policy;
        let turns = &mut self.turns;
        let result = client
            .decode(&text, cancel, |event| {
                let next: TurnSnapshot =
                    Arc::new(apply_event_with(policy, turns.as_slice(), &event));
                *turns = Arc::clone(&next);
                emit_update(update_tx, ConversationUpdate::Event(event));
                emit_update(update_tx, ConversationUpdate::TurnsChanged(next));
            })
            .await;

        match &result {
            Ok(summary) => {
                tracing::debug!(
                    events = summary.events,
                    malformed = summary.malformed,
                    cancelled = summary.cancelled,
                    "turn complete"
                );
                emit_update(update_tx, ConversationUpdate::TurnComplete(*summary));
            }
            Err(error) => {
                tracing::warn!(%error, "agent request failed");
                emit_update(update_tx, ConversationUpdate::Error(error.to_string()));
            }
        }

        result
    }
}

fn emit_update(
    update_tx: Option<&mpsc::UnboundedSender<ConversationUpdate>>,
    update: ConversationUpdate,
) {
    if let Some(tx) = update_tx {
        let _ = tx.send(update);
    }
}
