//! Host/viewer playback synchronization.
//!
//! Both sides hold an independent [`PlaybackState`] copy and converge via
//! partial updates; the controller never mutates state directly from the
//! network. Every inbound patch is applied to the local document, then the
//! new snapshot is **diffed** against the previous one and only changed
//! fields trigger local effects. Locally-triggered actions write through
//! at the specific field path, never by resending the whole state, so the
//! echo coming back diffs to nothing and feedback loops cannot form.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use synccast_protocol::{
    apply_at, decode_frame, BufferWindow, MediaSource, PlaybackState, ProtocolError,
};

use crate::client::ModelClient;
use crate::config::SyncConfig;
use crate::error::ClientResult;
use crate::transfer::ChunkSender;

/// Which side of the session this player is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Authoritative: pushes its state on connect and streams media.
    Host,
    /// Follower: fetches state on connect and applies diffs.
    Viewer,
}

/// External media pipeline the controller drives: decoding, rendering and
/// presentation live behind this seam.
///
/// `append` is asynchronous on real pipelines; the embedder reports
/// completion via [`SyncPlayer::append_complete`] and readiness via
/// [`SyncPlayer::pipeline_open`] / [`SyncPlayer::playable`].
pub trait MediaPipeline: Send {
    fn attach(&mut self, source: &MediaSource);
    fn detach(&mut self);
    fn append(&mut self, bytes: Vec<u8>);
    /// Aborts any in-flight append.
    fn abort(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn set_muted(&mut self, muted: bool);
    fn set_position(&mut self, seconds: f64);
    /// Current playback position in seconds.
    fn position(&self) -> f64;
    /// Media duration in seconds, zero until known.
    fn duration(&self) -> f64;
    fn set_pip(&mut self, on: bool);
    fn set_full_screen(&mut self, on: bool);
}

/// Byte access to the media file being cast (host side).
///
/// Chunk offsets travel in a 32-bit wire field, so sources larger than
/// `u32::MAX` bytes cannot be streamed.
pub trait ChunkSource: Send {
    fn len(&self) -> u64;
    /// Reads up to `len` bytes starting at `offset`.
    fn read(&self, offset: u64, len: usize) -> Vec<u8>;
}

/// Fraction of the buffer window that may be consumed before the next
/// fill is scheduled.
const REFILL_THRESHOLD: f64 = 0.5;

/// Playback synchronization controller over one [`ModelClient`].
pub struct SyncPlayer<P: MediaPipeline> {
    role: Role,
    client: Arc<ModelClient>,
    pipeline: P,
    chunker: ChunkSender,
    config: SyncConfig,

    /// Local copy of the shared document; patches mutate it in place.
    document: Value,
    state: PlaybackState,

    // Host-side streaming.
    source_file: Option<Box<dyn ChunkSource>>,
    window: BufferWindow,
    stream_id: u32,
    last_sync_broadcast: f64,

    // Viewer-side reception.
    received: u64,
    append_queue: VecDeque<Vec<u8>>,
    appending: bool,
    attached: bool,
    /// Pipeline-local readiness. Lives outside [`PlaybackState`] so patch
    /// application cannot revert it; only the pipeline reports it.
    can_play: bool,
    to_play: bool,
}

impl<P: MediaPipeline> SyncPlayer<P> {
    pub fn new(role: Role, client: Arc<ModelClient>, pipeline: P) -> Self {
        Self::with_config(role, client, pipeline, SyncConfig::default())
    }

    pub fn with_config(
        role: Role,
        client: Arc<ModelClient>,
        pipeline: P,
        config: SyncConfig,
    ) -> Self {
        let state = PlaybackState::default();
        let document = state
            .to_document()
            .unwrap_or(Value::Null);
        Self {
            role,
            client,
            chunker: ChunkSender::new(config.transfer.clone()),
            config,
            pipeline,
            document,
            state,
            source_file: None,
            window: BufferWindow::default(),
            stream_id: 0,
            last_sync_broadcast: 0.0,
            received: 0,
            append_queue: VecDeque::new(),
            appending: false,
            attached: false,
            can_play: false,
            to_play: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn window(&self) -> BufferWindow {
        self.window
    }

    /// Total payload bytes received on this side so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// On open: the host pushes its full state, a viewer fetches the
    /// host's and merges it over its local defaults.
    pub async fn connection_opened(&mut self) -> ClientResult<()> {
        match self.role {
            Role::Host => {
                let document = self.state.to_document()?;
                self.client.set_data(document, ".")
            }
            Role::Viewer => {
                let remote = self.client.get_data(".").await?;
                self.merge_remote(remote)
            }
        }
    }

    /// Connection loss or reconnect: the media pipeline is torn down and
    /// all transfer state abandoned. A stream resumed after reconnect
    /// starts over, not mid-offset.
    pub fn connection_lost(&mut self) {
        info!(role = ?self.role, "connection lost, resetting playback");
        self.teardown_media();
        self.reset_state();
    }

    // ------------------------------------------------------------------
    // Inbound updates
    // ------------------------------------------------------------------

    /// Applies a partial update received over the protocol, then diffs
    /// the new snapshot against the previous one and runs the side
    /// effects of changed fields only.
    pub fn apply_update(&mut self, value: Option<&Value>, path: &str) -> ClientResult<()> {
        let previous = self.state.clone();
        apply_at(&mut self.document, path, value.cloned())?;
        self.state = PlaybackState::from_document(&self.document)?;
        self.apply_effects(&previous);
        Ok(())
    }

    /// Merges a whole remote document over the local one, field by field,
    /// and applies effects for whatever changed.
    fn merge_remote(&mut self, remote: Value) -> ClientResult<()> {
        let previous = self.state.clone();
        match (self.document.as_object_mut(), remote) {
            (Some(local), Value::Object(fields)) => {
                for (key, value) in fields {
                    local.insert(key, value);
                }
            }
            (_, remote) => self.document = remote,
        }
        self.state = PlaybackState::from_document(&self.document)?;
        self.apply_effects(&previous);
        Ok(())
    }

    fn apply_effects(&mut self, previous: &PlaybackState) {
        let current = self.state.clone();

        if current.source != previous.source {
            self.teardown_media();
            if let Some(source) = &current.source {
                debug!(name = %source.name, size = source.size, "attaching new media source");
                self.pipeline.attach(source);
            }
        }

        if current.playing != previous.playing {
            if current.playing {
                self.request_resume();
            } else {
                self.pipeline.pause();
                self.to_play = false;
            }
        }

        if current.muted != previous.muted {
            self.pipeline.set_muted(current.muted);
        }

        if current.syncing != previous.syncing && current.sync {
            self.correct_gap(current.syncing);
        }

        if current.pip != previous.pip {
            self.pipeline.set_pip(current.pip);
        }

        if current.full_screen != previous.full_screen {
            self.pipeline.set_full_screen(current.full_screen);
        }
    }

    /// Resumes playback now, or defers it until the pipeline reports it
    /// can play.
    fn request_resume(&mut self) {
        if self.can_play {
            self.pipeline.play();
        } else {
            debug!("not yet able to play, deferring resume");
            self.to_play = true;
        }
    }

    /// Forces the local position to `target` only when the divergence
    /// exceeds the tolerance; normal clock drift stays untouched.
    fn correct_gap(&mut self, target: f64) {
        let gap = (self.pipeline.position() - target).abs();
        if gap > self.config.max_gap {
            debug!(gap, target, "sync gap over tolerance, correcting");
            self.pipeline.set_position(target);
        }
    }

    /// The pipeline reports it has buffered enough to start. Runs a
    /// deferred resume if one is pending.
    pub fn playable(&mut self) {
        self.can_play = true;
        if self.to_play {
            self.to_play = false;
            self.pipeline.play();
        }
    }

    // ------------------------------------------------------------------
    // Local intents (write-through at field paths)
    // ------------------------------------------------------------------

    /// Writes one field locally and through to the peers. Peers apply the
    /// same diff logic, so the echo of this write is a no-op for us.
    fn set_field(&mut self, path: &str, value: Value) -> ClientResult<()> {
        self.client.set_data(value.clone(), path)?;
        apply_at(&mut self.document, path, Some(value))?;
        self.state = PlaybackState::from_document(&self.document)?;
        Ok(())
    }

    pub fn play(&mut self) -> ClientResult<()> {
        self.set_field("playing", json!(true))?;
        self.pipeline.play();
        Ok(())
    }

    pub fn pause(&mut self) -> ClientResult<()> {
        self.set_field("playing", json!(false))?;
        self.pipeline.pause();
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) -> ClientResult<()> {
        self.set_field("muted", json!(muted))?;
        self.pipeline.set_muted(muted);
        Ok(())
    }

    pub fn set_pip(&mut self, on: bool) -> ClientResult<()> {
        self.set_field("pip", json!(on))?;
        self.pipeline.set_pip(on);
        Ok(())
    }

    pub fn set_full_screen(&mut self, on: bool) -> ClientResult<()> {
        self.set_field("fullScreen", json!(on))?;
        self.pipeline.set_full_screen(on);
        Ok(())
    }

    /// Grants or revokes viewer-side controls.
    pub fn set_controls(&mut self, controls: bool) -> ClientResult<()> {
        self.set_field("controls", json!(controls))
    }

    /// Records the media duration once the pipeline knows it.
    pub fn set_duration(&mut self, seconds: f64) -> ClientResult<()> {
        self.set_field("duration", json!(seconds))
    }

    // ------------------------------------------------------------------
    // Host-side chunk scheduling
    // ------------------------------------------------------------------

    /// Opens a media file for casting: allocates the server-side buffer
    /// handle, attaches the local pipeline, announces the source and
    /// streams the first buffer fill.
    pub async fn open_media(
        &mut self,
        source: MediaSource,
        file: Box<dyn ChunkSource>,
    ) -> ClientResult<()> {
        self.teardown_media();
        let handle = self.client.instant_file(&source).await?;
        info!(stream_id = handle.id, url = %handle.url, name = %source.name, "media buffer allocated");
        self.stream_id = handle.id;
        self.pipeline.attach(&source);
        self.attached = true;
        self.source_file = Some(file);
        self.set_field("source", serde_json::to_value(&source).map_err(ProtocolError::from)?)?;
        self.fill_buffer(0).await
    }

    /// Closes the current media source and resets playback state to its
    /// defaults.
    pub fn close_media(&mut self) -> ClientResult<()> {
        self.teardown_media();
        self.reset_state();
        self.client.del_data("source")
    }

    /// Advances playback time. Broadcasts the position on the sync
    /// interval and keeps the buffer window ahead of the estimated byte
    /// position; called by the embedder as local playback progresses.
    pub async fn time_update(&mut self, current_time: f64) -> ClientResult<()> {
        self.state.current_time = current_time;
        apply_at(&mut self.document, "currentTime", Some(json!(current_time)))?;

        if self.state.sync
            && (current_time - self.last_sync_broadcast).abs() >= self.state.sync_interval
        {
            self.last_sync_broadcast = current_time;
            self.set_field("syncing", json!(current_time))?;
        }

        let Some(size) = self.source_len() else {
            return Ok(());
        };
        if self.window.high > 0 && self.window.high >= size {
            // Source exhausted; nothing further to schedule.
            return Ok(());
        }
        let duration = self.pipeline.duration();
        if duration <= 0.0 {
            return Ok(());
        }

        let position = (current_time / duration * size as f64) as u64;
        if !self.window.contains(position) {
            // Discontinuity: the play head left the fetched range.
            self.pipeline.abort();
            return self.fill_buffer(position).await;
        }

        let consumed =
            position.saturating_sub(self.window.low) as f64 / self.config.buffer_size as f64;
        if consumed > REFILL_THRESHOLD {
            let next = self.window.high;
            return self.fill_buffer(next).await;
        }
        Ok(())
    }

    /// Seeks to `to` seconds: broadcasts the new position and, when the
    /// target falls outside the buffer window, aborts the in-flight
    /// append and refills from there.
    pub async fn seek(&mut self, to: f64) -> ClientResult<()> {
        self.set_field("syncing", json!(to))?;
        self.last_sync_broadcast = to;

        let Some(size) = self.source_len() else {
            return Ok(());
        };
        let duration = self.pipeline.duration();
        if duration <= 0.0 {
            return Ok(());
        }
        let position = (to / duration * size as f64) as u64;
        if !self.window.contains(position) {
            self.pipeline.abort();
            return self.fill_buffer(position).await;
        }
        Ok(())
    }

    fn source_len(&self) -> Option<u64> {
        self.source_file.as_ref().map(|file| file.len())
    }

    /// Fetches one buffer-sized chunk starting at `position`, appends it
    /// to the local pipeline and streams it to the peers.
    async fn fill_buffer(&mut self, position: u64) -> ClientResult<()> {
        debug_assert!(
            position <= u64::from(u32::MAX),
            "chunk position {position} exceeds the 32-bit wire offset"
        );
        let chunk = {
            let Some(file) = self.source_file.as_ref() else {
                return Ok(());
            };
            if position >= file.len() {
                return Ok(());
            }
            let len = (file.len() - position).min(self.config.buffer_size) as usize;
            file.read(position, len)
        };
        self.window.refill(position, chunk.len() as u64);
        debug!(
            low = self.window.low,
            high = self.window.high,
            stream_id = self.stream_id,
            "filling buffer"
        );
        self.pipeline.append(chunk.clone());
        self.chunker
            .stream_all(
                self.client.connection().as_ref(),
                &chunk,
                self.stream_id,
                position as u32,
            )
            .await
    }

    // ------------------------------------------------------------------
    // Viewer-side chunk reception
    // ------------------------------------------------------------------

    /// Takes one raw binary frame from the streaming handler. Payloads
    /// are appended strictly in the order received: a new append is only
    /// issued once the previous one completed, queued data first.
    pub fn receive_chunk(&mut self, frame: &[u8]) -> ClientResult<()> {
        let (header, payload) = decode_frame(frame)?;
        self.received += payload.len() as u64;
        debug!(
            stream_id = header.stream_id,
            offset = header.offset,
            len = payload.len(),
            "chunk received"
        );
        self.append_queue.push_back(payload.to_vec());
        self.pump_queue();
        Ok(())
    }

    /// The pipeline finished the previous append; flush the next queued
    /// payload.
    pub fn append_complete(&mut self) {
        self.appending = false;
        self.pump_queue();
    }

    /// The pipeline opened and accepts appends; flush anything queued
    /// before it was ready.
    pub fn pipeline_open(&mut self) {
        self.attached = true;
        self.pump_queue();
    }

    fn pump_queue(&mut self) {
        if !self.attached || self.appending {
            return;
        }
        if let Some(next) = self.append_queue.pop_front() {
            self.appending = true;
            self.pipeline.append(next);
        }
    }

    // ------------------------------------------------------------------
    // Remote playback commands (multicast)
    // ------------------------------------------------------------------

    /// Handles a playback command fanned out by the host
    /// (`prepare`/`play`/`pause`/`sync`).
    pub fn handle_command(&mut self, params: &Value) -> ClientResult<()> {
        let raw = params.get(0).unwrap_or(params);
        let command: RemoteCommand =
            serde_json::from_value(raw.clone()).map_err(ProtocolError::from)?;
        match command.command.as_str() {
            "prepare" => {
                let source: MediaSource =
                    serde_json::from_value(command.param.unwrap_or(Value::Null))
                        .map_err(ProtocolError::from)?;
                self.teardown_media();
                self.pipeline.attach(&source);
                apply_at(
                    &mut self.document,
                    "source",
                    Some(serde_json::to_value(&source).map_err(ProtocolError::from)?),
                )?;
                self.state.source = Some(source);
            }
            "play" => {
                if let Some(offset) = command.param.as_ref().and_then(Value::as_f64) {
                    self.pipeline.set_position(offset);
                }
                self.request_resume();
            }
            "pause" => {
                self.pipeline.pause();
                self.to_play = false;
            }
            "sync" => {
                if let Some(position) = command.param.as_ref().and_then(Value::as_f64)
                    && self.state.sync
                {
                    self.correct_gap(position);
                }
            }
            other => warn!(command = other, "unknown remote command, ignoring"),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    fn teardown_media(&mut self) {
        self.pipeline.abort();
        self.pipeline.detach();
        self.source_file = None;
        self.window.reset();
        self.stream_id = 0;
        self.received = 0;
        self.append_queue.clear();
        self.appending = false;
        self.attached = false;
        self.can_play = false;
        self.to_play = false;
        self.last_sync_broadcast = 0.0;
    }

    fn reset_state(&mut self) {
        self.state = PlaybackState::default();
        self.document = self.state.to_document().unwrap_or(Value::Null);
    }
}

/// Shape of a fanned-out playback command.
#[derive(Debug, serde::Deserialize)]
struct RemoteCommand {
    command: String,
    #[serde(default)]
    param: Option<Value>,
}
