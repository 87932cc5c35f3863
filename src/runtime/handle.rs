use std::sync::Arc;

use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    card::{ExportLine, Stack},
    core::{
        store::{Bucket, StoreSnapshotV1},
        transfer::Destination,
    },
    op::{DragPayload, Gesture},
    persist::{self, PersistError, RecordSlot, StateStore},
    selection::SelectionTracker,
    session::{Effect, Organizer, Outcome},
    types::{BucketId, DeckKey, GestureSeq, StackId},
};

use super::events::OrganizerEvent;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("organizer task is no longer running")]
    ChannelClosed,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command_queue_bound: usize,
    pub persist_queue_bound: usize,
    /// How long the persistence worker coalesces saves before writing.
    pub persist_max_latency_ms: u64,
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            persist_queue_bound: 64,
            persist_max_latency_ms: 50,
            event_capacity: 1024,
        }
    }
}

pub struct OrganizerHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<OrganizerEvent>,
}

impl Clone for OrganizerHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Apply {
        gesture: Gesture,
        resp: oneshot::Sender<Outcome>,
    },
    DragPayload {
        dragged: StackId,
        resp: oneshot::Sender<Option<DragPayload>>,
    },
    Buckets {
        resp: oneshot::Sender<Vec<Bucket>>,
    },
    Visible {
        resp: oneshot::Sender<Vec<Stack>>,
    },
    Selection {
        resp: oneshot::Sender<Vec<StackId>>,
    },
    Export {
        bucket: BucketId,
        resp: oneshot::Sender<Option<Vec<ExportLine>>>,
    },
    Flush {
        resp: oneshot::Sender<Result<GestureSeq, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    Save(PendingSave),
    Flush {
        resp: oneshot::Sender<Result<GestureSeq, PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Slots changed since their last save reached the persistence queue.
#[derive(Debug, Default, Clone, Copy)]
struct Unsaved {
    buckets: bool,
    selection: bool,
}

/// Latest unsaved state. Newer saves replace older ones slot by slot.
#[derive(Default)]
struct PendingSave {
    seq: GestureSeq,
    buckets: Option<StoreSnapshotV1>,
    selection: Option<SelectionTracker>,
}

impl PendingSave {
    fn is_empty(&self) -> bool {
        self.buckets.is_none() && self.selection.is_none()
    }

    /// Both records as they stand now.
    fn full(organizer: &Organizer) -> Self {
        Self {
            seq: organizer.latest_seq(),
            buckets: Some(organizer.store().export_snapshot()),
            selection: organizer
                .config()
                .persist_selection
                .then(|| organizer.selection().clone()),
        }
    }

    fn absorb(&mut self, newer: PendingSave) {
        self.seq = self.seq.max(newer.seq);
        if newer.buckets.is_some() {
            self.buckets = newer.buckets;
        }
        if newer.selection.is_some() {
            self.selection = newer.selection;
        }
    }
}

/// Runs `organizer` on its own task. Gestures are applied one at a time in
/// arrival order; saves go to `sink` on a separate worker.
///
/// Open the organizer without a store of its own when passing a `sink`.
pub fn spawn_organizer(
    organizer: Organizer,
    sink: Option<Box<dyn StateStore>>,
    config: RuntimeConfig,
) -> OrganizerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<OrganizerEvent>(config.event_capacity);

    let persist_tx = sink.map(|sink| {
        let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound);
        spawn_persistence_worker(
            sink,
            organizer.deck().to_string(),
            persist_rx,
            events_tx.clone(),
            config.clone(),
        );
        persist_tx
    });

    let events_tx_loop = events_tx.clone();
    tokio::spawn(async move {
        let mut organizer = organizer;
        let mut unsaved = Unsaved::default();
        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(
                cmd,
                &mut organizer,
                &events_tx_loop,
                persist_tx.as_ref(),
                &mut unsaved,
            )
            .await;
            if done {
                break;
            }
        }
        debug!(deck = %organizer.deck(), "organizer loop stopped");
    });

    OrganizerHandle { cmd_tx, events_tx }
}

impl OrganizerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<OrganizerEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    pub async fn apply(&self, gesture: Gesture) -> Result<Outcome, RuntimeError> {
        self.request(|resp| Command::Apply { gesture, resp }).await
    }

    pub async fn drag_payload(&self, dragged: impl Into<StackId>) -> Result<Option<DragPayload>, RuntimeError> {
        let dragged = dragged.into();
        self.request(|resp| Command::DragPayload { dragged, resp }).await
    }

    /// Drags `dragged` (with the selection, if it is selected) onto `destination`.
    pub async fn drag_and_drop(
        &self,
        dragged: impl Into<StackId>,
        destination: Destination,
    ) -> Result<Option<Outcome>, RuntimeError> {
        let Some(payload) = self.drag_payload(dragged).await? else {
            return Ok(None);
        };
        self.apply(Gesture::Drop {
            payload,
            destination,
        })
        .await
        .map(Some)
    }

    pub async fn buckets(&self) -> Result<Vec<Bucket>, RuntimeError> {
        self.request(|resp| Command::Buckets { resp }).await
    }

    pub async fn visible_stacks(&self) -> Result<Vec<Stack>, RuntimeError> {
        self.request(|resp| Command::Visible { resp }).await
    }

    pub async fn selected_ids(&self) -> Result<Vec<StackId>, RuntimeError> {
        self.request(|resp| Command::Selection { resp }).await
    }

    pub async fn export(&self, bucket: impl Into<BucketId>) -> Result<Option<Vec<ExportLine>>, RuntimeError> {
        let bucket = bucket.into();
        self.request(|resp| Command::Export { bucket, resp }).await
    }

    /// Saves the current state and waits for the write.
    pub async fn flush(&self) -> Result<GestureSeq, RuntimeError> {
        self.request(|resp| Command::Flush { resp }).await?
    }

    /// Queues a save of the current state, waits for the worker to write it,
    /// and stops the organizer task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await?
    }
}

async fn handle_command(
    cmd: Command,
    organizer: &mut Organizer,
    events_tx: &broadcast::Sender<OrganizerEvent>,
    persist_tx: Option<&mpsc::Sender<PersistMsg>>,
    unsaved: &mut Unsaved,
) -> bool {
    match cmd {
        Command::Apply { gesture, resp } => {
            let kind = gesture.kind();
            let outcome = organizer.apply(gesture);
            publish_outcome(kind, &outcome, events_tx);

            if let (Some(tx), Some(applied)) = (persist_tx, outcome.applied.as_ref()) {
                // Slots dropped by an earlier full queue ride along with this save.
                let save_buckets = outcome.buckets_changed || unsaved.buckets;
                let save_selection = organizer.config().persist_selection
                    && (outcome.buckets_changed || outcome.selection_changed || unsaved.selection);
                let save = PendingSave {
                    seq: applied.seq,
                    buckets: save_buckets.then(|| organizer.store().export_snapshot()),
                    selection: save_selection.then(|| organizer.selection().clone()),
                };
                if !save.is_empty() {
                    match tx.try_send(PersistMsg::Save(save)) {
                        Ok(()) => *unsaved = Unsaved::default(),
                        Err(err) => {
                            unsaved.buckets |= save_buckets;
                            unsaved.selection |= save_selection;
                            warn!(deck = %organizer.deck(), error = %err, "save queue full; state will be saved with the next change");
                            let _ = events_tx.send(OrganizerEvent::PersistFailed {
                                message: format!("persist queue error: {err}"),
                            });
                        }
                    }
                }
            }
            let _ = resp.send(outcome);
        }
        Command::DragPayload { dragged, resp } => {
            let _ = resp.send(organizer.drag_payload(&dragged));
        }
        Command::Buckets { resp } => {
            let _ = resp.send(organizer.buckets().to_vec());
        }
        Command::Visible { resp } => {
            let _ = resp.send(organizer.visible_stacks().into_iter().cloned().collect());
        }
        Command::Selection { resp } => {
            let _ = resp.send(organizer.selected_ids());
        }
        Command::Export { bucket, resp } => {
            let _ = resp.send(organizer.export(&bucket));
        }
        Command::Flush { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (flush_tx, flush_rx) = oneshot::channel();
                if tx.send(PersistMsg::Save(PendingSave::full(organizer))).await.is_err()
                    || tx.send(PersistMsg::Flush { resp: flush_tx }).await.is_err()
                {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    *unsaved = Unsaved::default();
                    flush_rx
                        .await
                        .map_err(|_| RuntimeError::ChannelClosed)
                        .and_then(|r| r.map_err(RuntimeError::from))
                }
            } else {
                Ok(organizer.latest_seq())
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = if let Some(tx) = persist_tx {
                let (done_tx, done_rx) = oneshot::channel();
                if tx.send(PersistMsg::Save(PendingSave::full(organizer))).await.is_err()
                    || tx.send(PersistMsg::Shutdown { resp: done_tx }).await.is_err()
                {
                    Err(RuntimeError::ChannelClosed)
                } else {
                    done_rx.await.map_err(|_| RuntimeError::ChannelClosed)
                }
            } else {
                Ok(())
            };
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

fn publish_outcome(kind: &'static str, outcome: &Outcome, events_tx: &broadcast::Sender<OrganizerEvent>) {
    if let Some(reason) = &outcome.rejected {
        let _ = events_tx.send(OrganizerEvent::Rejected {
            gesture: kind,
            reason: reason.to_string(),
        });
    }

    if let Some(applied) = &outcome.applied {
        let seq = applied.seq;
        if outcome.buckets_changed {
            let _ = events_tx.send(OrganizerEvent::BucketsChanged { seq });
        }
        if outcome.selection_changed {
            let _ = events_tx.send(OrganizerEvent::SelectionChanged { seq });
        }
        if matches!(outcome.effect, Effect::Filter) {
            let _ = events_tx.send(OrganizerEvent::FilterChanged { seq });
        }
    }

    if let Some(message) = &outcome.persist_warning {
        let _ = events_tx.send(OrganizerEvent::PersistFailed {
            message: message.clone(),
        });
    }
}

fn spawn_persistence_worker(
    sink: Box<dyn StateStore>,
    deck: DeckKey,
    mut rx: mpsc::Receiver<PersistMsg>,
    events_tx: broadcast::Sender<OrganizerEvent>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    let latency = Duration::from_millis(config.persist_max_latency_ms);
    tokio::spawn(async move {
        let mut pending = PendingSave::default();
        let mut deadline = Instant::now() + latency;
        let mut last_saved: GestureSeq = 0;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = write_pending(&sink, &deck, &mut pending, &mut last_saved, &events_tx).await;
                        break;
                    };

                    match msg {
                        PersistMsg::Save(save) => {
                            if pending.is_empty() {
                                deadline = Instant::now() + latency;
                            }
                            pending.absorb(save);
                        }
                        PersistMsg::Flush { resp } => {
                            let result = write_pending(&sink, &deck, &mut pending, &mut last_saved, &events_tx).await;
                            let _ = resp.send(result.map(|_| last_saved));
                        }
                        PersistMsg::Shutdown { resp } => {
                            let _ = write_pending(&sink, &deck, &mut pending, &mut last_saved, &events_tx).await;
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !pending.is_empty() => {
                    let _ = write_pending(&sink, &deck, &mut pending, &mut last_saved, &events_tx).await;
                }
            }
        }
    });
}

async fn write_pending(
    sink: &Arc<Mutex<Box<dyn StateStore>>>,
    deck: &str,
    pending: &mut PendingSave,
    last_saved: &mut GestureSeq,
    events_tx: &broadcast::Sender<OrganizerEvent>,
) -> Result<(), PersistError> {
    let batch = std::mem::take(pending);
    let sink_ref = Arc::clone(sink);
    let deck_owned = deck.to_string();

    let write_res: Result<GestureSeq, PersistError> = tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        if let Some(snapshot) = &batch.buckets {
            let payload = persist::encode_buckets(snapshot)?;
            sink.write(&deck_owned, RecordSlot::Buckets, &payload)?;
        }
        if let Some(selection) = &batch.selection {
            let payload = persist::encode_selection(selection)?;
            sink.write(&deck_owned, RecordSlot::Selection, &payload)?;
        }
        sink.flush()?;
        Ok(batch.seq)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?;

    match write_res {
        Ok(seq) => {
            *last_saved = (*last_saved).max(seq);
            let _ = events_tx.send(OrganizerEvent::Persisted { seq: *last_saved });
            Ok(())
        }
        Err(err) => {
            warn!(deck = %deck, error = %err, "failed to save organizer state; keeping in-memory state");
            let _ = events_tx.send(OrganizerEvent::PersistFailed {
                message: err.to_string(),
            });
            Err(err)
        }
    }
}
