//! The attachment upload controller.
//!
//! Owns the single in-flight attachment and drives the chunked transfer
//! protocol: `capture` stages a file or image, announces it with an
//! `attach` event, then the server pulls chunks with `read_attachment`
//! until the buffer is exhausted.
//!
//! Capture runs through long-latency steps (file read upstream, image
//! decode and resize here), so a `clear` or a newer capture can interleave
//! before it lands.  Every capture takes a generation number up front and
//! commits only if the slot still carries that generation; a stale result
//! is dropped without installing anything.  Last writer wins, no locks
//! held across suspension points.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use gara_shared::constants::{
    CHUNK_SIZE, MAX_ATTACHMENT_SIZE, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH,
};
use gara_shared::ClientEvent;

use crate::connection::SessionNotification;
use crate::encoder::{effective_len, encode_chunk};
use crate::error::ClientError;
use crate::preview::PreviewRegistry;

/// Upload state machine: `Idle -> Captured -> Transferring -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// No attachment staged.
    Idle,
    /// An attachment is staged and announced, no pull seen yet.
    Captured,
    /// At least one chunk has been pulled.
    Transferring,
}

/// What to do with a pull whose offset equals the attachment length.
///
/// Only reachable when the length is an exact multiple of the chunk size:
/// every prior chunk came back full, so the server cannot tell the
/// transfer is over without one more pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailPull {
    /// Answer with a zero-length chunk, then complete.
    EmitEmpty,
    /// Ignore the pull and complete; the server infers the end from the
    /// total length it has already received.
    Reject,
}

/// Tunables for the upload pipeline.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Bytes per transfer chunk.
    pub chunk_size: usize,
    /// Hard cap on attachment size; larger captures fail.
    pub max_size: usize,
    /// Image bound before downscaling.
    pub max_width: u32,
    /// Image bound before downscaling.
    pub max_height: u32,
    /// Policy for a pull at exactly the end of the buffer.
    pub tail_pull: TailPull,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_size: MAX_ATTACHMENT_SIZE,
            max_width: MAX_IMAGE_WIDTH,
            max_height: MAX_IMAGE_HEIGHT,
            tail_pull: TailPull::EmitEmpty,
        }
    }
}

/// What the user picked for upload.  Images are routed through the
/// normalizer; plain files keep their bytes and name.
#[derive(Debug, Clone)]
pub enum CaptureInput {
    File { name: String, data: Vec<u8> },
    Image { data: Vec<u8> },
}

/// The staged attachment.  Immutable once captured.
#[derive(Debug, Clone)]
struct Attachment {
    data: Bytes,
    name: Option<String>,
    url: String,
}

/// Single-slot attachment state guarded by the capture generation.
struct SlotState {
    attachment: Option<Attachment>,
    state: UploadState,
    generation: u64,
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            attachment: None,
            state: UploadState::Idle,
            generation: 0,
        }
    }
}

/// Orchestrates capture, preview lifecycle, and the pull-driven chunk
/// transfer.  Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct UploadController {
    slot: Arc<Mutex<SlotState>>,
    previews: PreviewRegistry,
    events: mpsc::Sender<ClientEvent>,
    notify: mpsc::Sender<SessionNotification>,
    config: UploadConfig,
}

impl UploadController {
    pub fn new(
        previews: PreviewRegistry,
        events: mpsc::Sender<ClientEvent>,
        notify: mpsc::Sender<SessionNotification>,
        config: UploadConfig,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(SlotState::default())),
            previews,
            events,
            notify,
            config,
        }
    }

    /// Current state of the upload state machine.
    pub async fn state(&self) -> UploadState {
        self.slot.lock().await.state
    }

    /// Stage a new attachment.
    ///
    /// The generation is taken before returning, so captures supersede each
    /// other in call order even though the heavy work runs in a background
    /// task.  The returned handle is only useful for tests that want to
    /// await completion.
    pub async fn capture(&self, input: CaptureInput) -> JoinHandle<()> {
        let generation = self.begin_capture().await;
        let this = self.clone();
        tokio::spawn(async move { this.run_capture(generation, input).await })
    }

    /// Answer a `read_attachment` pull.
    ///
    /// Only meaningful in `Captured` or `Transferring`; pulls while idle or
    /// beyond the end of the buffer are logged and ignored, the server
    /// being trusted but not infallible.
    pub async fn on_pull(&self, offset: u64) {
        let event = {
            let mut slot = self.slot.lock().await;

            if slot.state == UploadState::Idle {
                warn!(offset, "attachment pull while idle, ignoring");
                return;
            }

            let Some(attachment) = slot.attachment.as_ref() else {
                warn!(offset, "attachment pull with empty slot, ignoring");
                return;
            };

            let total = attachment.data.len();
            let offset = offset as usize;

            if offset > total {
                warn!(offset, total, "attachment pull beyond end, ignoring");
                return;
            }

            if offset == total {
                // Exact-multiple transfers land here: the last full chunk
                // could not signal the end on its own.
                slot.state = UploadState::Idle;
                debug!(total, "attachment transfer complete");
                match self.config.tail_pull {
                    TailPull::EmitEmpty => Some(ClientEvent::AttachmentChunk {
                        chunk: String::new(),
                    }),
                    TailPull::Reject => None,
                }
            } else {
                let len = effective_len(total, offset, self.config.chunk_size);
                let chunk = encode_chunk(&attachment.data, offset, self.config.chunk_size);

                if len < self.config.chunk_size {
                    slot.state = UploadState::Idle;
                    debug!(total, "attachment transfer complete");
                } else {
                    slot.state = UploadState::Transferring;
                }

                Some(ClientEvent::AttachmentChunk { chunk })
            }
        };

        if let Some(event) = event {
            if self.events.send(event).await.is_err() {
                warn!("outbound event channel closed, dropping chunk");
            }
        }
    }

    /// Discard the attachment and release its preview handle.  Safe from
    /// any state, including `Idle`; also invalidates any capture still in
    /// flight.
    pub async fn clear(&self) {
        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        if let Some(attachment) = slot.attachment.take() {
            self.previews.revoke(&attachment.url);
            debug!(url = %attachment.url, "attachment cleared");
        }
        slot.state = UploadState::Idle;
    }

    // ------------------------------------------------------------------
    // Capture internals
    // ------------------------------------------------------------------

    async fn begin_capture(&self) -> u64 {
        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        slot.generation
    }

    async fn run_capture(&self, generation: u64, input: CaptureInput) {
        let (data, name) = match self.prepare(input).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.fail_capture(generation, e).await;
                return;
            }
        };

        if data.len() > self.config.max_size {
            let e = ClientError::AttachmentTooLarge {
                size: data.len(),
                max: self.config.max_size,
            };
            self.fail_capture(generation, e).await;
            return;
        }

        if !self.commit(generation, data, name).await {
            debug!(generation, "capture superseded before commit, dropping");
        }
    }

    /// Turn the raw input into transferable bytes.  Images run through the
    /// normalizer on the blocking pool; decode and resize are CPU-bound.
    async fn prepare(&self, input: CaptureInput) -> Result<(Bytes, Option<String>), ClientError> {
        match input {
            CaptureInput::File { name, data } => Ok((Bytes::from(data), Some(name))),
            CaptureInput::Image { data } => {
                let (max_width, max_height) = (self.config.max_width, self.config.max_height);
                let normalized = tokio::task::spawn_blocking(move || {
                    gara_media::normalize(&data, max_width, max_height)
                })
                .await
                .map_err(|e| ClientError::TaskFailed(e.to_string()))??;

                debug!(
                    width = normalized.width,
                    height = normalized.height,
                    bytes = normalized.data.len(),
                    "image normalized"
                );
                Ok((Bytes::from(normalized.data), None))
            }
        }
    }

    /// Install the prepared attachment if this capture is still current.
    /// Returns `false` when a newer capture or a clear got there first.
    async fn commit(&self, generation: u64, data: Bytes, name: Option<String>) -> bool {
        let (size, url) = {
            let mut slot = self.slot.lock().await;

            if slot.generation != generation {
                return false;
            }

            if let Some(previous) = slot.attachment.take() {
                self.previews.revoke(&previous.url);
            }

            let url = self.previews.create(data.clone());
            let size = data.len() as u64;

            slot.attachment = Some(Attachment {
                data,
                name: name.clone(),
                url: url.clone(),
            });
            slot.state = UploadState::Captured;

            debug!(size, url = %url, name = ?name, "attachment captured");

            (size, url)
        };

        let event = ClientEvent::Attach {
            size,
            url: url.clone(),
            name: name.clone(),
        };
        if self.events.send(event).await.is_err() {
            warn!("outbound event channel closed, dropping attach");
        }
        let _ = self
            .notify
            .send(SessionNotification::AttachmentReady { size, url, name })
            .await;

        true
    }

    async fn fail_capture(&self, generation: u64, error: ClientError) {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            debug!(generation, error = %error, "stale capture failed, ignoring");
            return;
        }

        warn!(error = %error, "capture failed");
        if let Some(attachment) = slot.attachment.take() {
            self.previews.revoke(&attachment.url);
        }
        slot.state = UploadState::Idle;
        drop(slot);

        let _ = self
            .notify
            .send(SessionNotification::CaptureFailed {
                reason: error.to_string(),
            })
            .await;
    }
}
