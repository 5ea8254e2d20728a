use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::events::{LineResult, SessionEvent, SessionStats};
use super::state::{CancellationToken, Language, SessionSettings};
use crate::audio::{CaptureHandle, CaptureOptions, CaptureSource, ChunkQueue};
use crate::config::{Config, TranslationProvider};
use crate::conversation::Conversation;
use crate::error::{LuminoError, Result};
use crate::scenario::ScenarioCatalog;
use crate::segment::{LineBoundary, SegmentBuffer};
use crate::services::{
    ContextGenerator, DeeplTranslate, GeminiClient, GoogleTranslate, TranscriptionEngine,
    TranslationRequest, Translator, WhisperApi,
};

/// Session lifecycle: Idle -> Listening -> Stopping -> Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Listening,
    Stopping,
}

/// Injected collaborators. Everything the loop calls out to sits behind a
/// trait so sessions carry no global state and tests can script them.
pub struct SessionDeps {
    pub capture: Arc<dyn CaptureSource>,
    pub transcriber: Arc<dyn TranscriptionEngine>,
    pub translator: Arc<dyn Translator>,
    pub context: Arc<dyn ContextGenerator>,
}

/// Timing knobs for the consumer loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    /// Gap after which drained audio starts a new conversation line.
    pub line_timeout: Duration,
    /// Duration of each chunk the capture source delivers.
    pub chunk_duration: Duration,
    /// Ambient-noise measurement window at capture startup.
    pub calibration_duration: Duration,
    /// Tick used while blocking on the queue, bounding cancellation latency.
    pub poll_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_secs(3),
            chunk_duration: Duration::from_secs(2),
            calibration_duration: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Owns the conversation, the audio queue, and the consumer loop for one
/// logical session. Created once per session (e.g. per web connection) and
/// reused across start/stop cycles; the conversation survives stops and is
/// only cleared explicitly.
pub struct SessionController {
    deps: SessionDeps,
    opts: LoopOptions,
    scenarios: ScenarioCatalog,
    settings: Arc<RwLock<SessionSettings>>,
    conversation: Arc<Mutex<Conversation>>,
    queue: Arc<ChunkQueue>,
    cancel: CancellationToken,
    run_state: Arc<Mutex<RunState>>,
    capture_handle: Mutex<Option<CaptureHandle>>,
    loop_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    stream_rx: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    started_at: Mutex<Option<chrono::DateTime<Utc>>>,
}

impl SessionController {
    pub fn new(
        deps: SessionDeps,
        scenarios: ScenarioCatalog,
        settings: SessionSettings,
        opts: LoopOptions,
    ) -> Self {
        Self {
            deps,
            opts,
            scenarios,
            settings: Arc::new(RwLock::new(settings)),
            conversation: Arc::new(Mutex::new(Conversation::new())),
            queue: Arc::new(ChunkQueue::new()),
            cancel: CancellationToken::new(),
            run_state: Arc::new(Mutex::new(RunState::Idle)),
            capture_handle: Mutex::new(None),
            loop_handle: tokio::sync::Mutex::new(None),
            stream_rx: Mutex::new(None),
            started_at: Mutex::new(None),
        }
    }

    /// Build a controller with the real adapters from configuration.
    ///
    /// Credentials are resolved here, before any capture thread can exist:
    /// a missing key fails the session with a configuration error and
    /// nothing is ever recorded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let translator: Arc<dyn Translator> = match config.translation.provider {
            TranslationProvider::Google => Arc::new(GoogleTranslate::new(
                config.translation.google_endpoint.clone(),
            )),
            TranslationProvider::Deepl => Arc::new(DeeplTranslate::new(
                config.translation.deepl_endpoint.clone(),
                std::env::var("DEEPL_API_KEY").ok(),
            )?),
        };
        let context: Arc<dyn ContextGenerator> = Arc::new(GeminiClient::new(
            config.context.endpoint.clone(),
            config.context.model.clone(),
            std::env::var("GEMINI_API_KEY").ok(),
        )?);
        let deps = SessionDeps {
            capture: Arc::new(crate::audio::MicCapture),
            transcriber: Arc::new(WhisperApi::new(config.asr.endpoint.clone())),
            translator,
            context,
        };

        let mut scenarios = ScenarioCatalog::with_defaults();
        scenarios.extend(config.scenarios.clone());

        let settings = SessionSettings {
            input_device: config.audio.input_device,
            formality: config.translation.formality,
            ..SessionSettings::default()
        };

        Ok(Self::new(deps, scenarios, settings, config.loop_options()))
    }

    /// Begin capturing and processing. Valid only from Idle; a second
    /// `start` while listening is rejected rather than spawning a second
    /// capture thread. The result stream is claimed via [`take_stream`].
    ///
    /// [`take_stream`]: SessionController::take_stream
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.run_state.lock();
            if *state != RunState::Idle {
                return Err(LuminoError::AlreadyRunning);
            }
            *state = RunState::Listening;
        }

        self.cancel.reset();
        self.queue.clear();

        let capture_opts = CaptureOptions {
            device_index: self.settings.read().input_device,
            chunk_duration: self.opts.chunk_duration,
            calibration_duration: self.opts.calibration_duration,
        };
        let handle = match self
            .deps
            .capture
            .start(capture_opts, Arc::clone(&self.queue))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                *self.run_state.lock() = RunState::Idle;
                return Err(e);
            }
        };
        info!(
            device = %handle.selection().resolved_name,
            fell_back = handle.selection().fell_back,
            ambient_rms = handle.ambient_rms(),
            "capture started"
        );
        *self.capture_handle.lock() = Some(handle);

        let (tx, rx) = mpsc::channel(64);
        let consumer = ConsumerLoop {
            queue: Arc::clone(&self.queue),
            settings: Arc::clone(&self.settings),
            conversation: Arc::clone(&self.conversation),
            scenarios: self.scenarios.clone(),
            cancel: self.cancel.clone(),
            transcriber: Arc::clone(&self.deps.transcriber),
            translator: Arc::clone(&self.deps.translator),
            context: Arc::clone(&self.deps.context),
            opts: self.opts,
            tx,
        };
        let task = tokio::spawn(consumer.run());
        *self.loop_handle.lock().await = Some(task);
        *self.stream_rx.lock() = Some(rx);
        *self.started_at.lock() = Some(Utc::now());

        info!("session started");
        Ok(())
    }

    /// Claim the lazy result stream for the current run. Yields `Line`
    /// events until `stop()`, then a terminal `Stopped` event carrying the
    /// accumulated conversation.
    pub fn take_stream(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.stream_rx.lock().take()
    }

    /// Halt streaming: arm the cancellation token, deregister the capture
    /// callback, wait for the loop to unwind, and discard any queued
    /// audio. Idempotent from Idle.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.run_state.lock();
            match *state {
                RunState::Idle | RunState::Stopping => return Ok(()),
                RunState::Listening => *state = RunState::Stopping,
            }
        }
        info!("stopping session");

        self.cancel.arm();

        // Capture goes first so no audio arrives past the logical stop.
        let handle = self.capture_handle.lock().take();
        if let Some(mut handle) = handle {
            handle.stop();
        }

        // If no transport claimed the stream, closing our end here keeps the
        // loop from blocking on a full channel while we wait for it.
        *self.stream_rx.lock() = None;

        let task = self.loop_handle.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("consumer loop panicked: {e}");
            }
        }

        let discarded = self.queue.clear();
        if discarded > 0 {
            info!(chunks = discarded, "discarded queued audio on stop");
        }

        self.cancel.reset();
        *self.stream_rx.lock() = None;
        *self.run_state.lock() = RunState::Idle;
        info!("session stopped");
        Ok(())
    }

    /// Reset the conversation to its initial single-empty-line state.
    /// Valid only while Idle; the conversation is never cleared by `stop`.
    pub fn clear_conversation(&self) -> Result<()> {
        if *self.run_state.lock() != RunState::Idle {
            return Err(LuminoError::NotIdle("clear_conversation"));
        }
        self.conversation.lock().clear();
        Ok(())
    }

    /// Switch the spoken language; the target becomes its counterpart.
    /// Safe while listening: the loop snapshots settings once per
    /// iteration, so the new direction applies from the next translation
    /// call without restarting the stream.
    pub fn switch_language(&self, spoken: Language) {
        let mut settings = self.settings.write();
        settings.spoken_language = spoken;
        settings.target_language = spoken.counterpart();
        info!(
            spoken = spoken.code(),
            target = settings.target_language.code(),
            "language switched"
        );
    }

    pub fn set_languages(&self, spoken: Language, target: Language) {
        let mut settings = self.settings.write();
        settings.spoken_language = spoken;
        settings.target_language = target;
    }

    /// Select the active scenario. Unknown names are rejected so a typo
    /// cannot silently disable context generation.
    pub fn set_scenario(&self, name: &str) -> Result<()> {
        if self.scenarios.get(name).is_none() {
            return Err(LuminoError::Configuration(format!(
                "unknown scenario `{name}`"
            )));
        }
        self.settings.write().scenario = name.to_string();
        info!(scenario = name, "scenario switched");
        Ok(())
    }

    pub fn set_formality(&self, formality: crate::services::Formality) {
        self.settings.write().formality = formality;
    }

    /// Change the input device. While listening this rebinds the capture
    /// source (the device is tied to its stream); the loop and the result
    /// stream stay alive across the swap.
    pub async fn set_input_device(&self, index: Option<usize>) -> Result<()> {
        self.settings.write().input_device = index;

        let listening = *self.run_state.lock() == RunState::Listening;
        if !listening {
            return Ok(());
        }

        let old = self.capture_handle.lock().take();
        if let Some(mut handle) = old {
            handle.stop();
        }
        let capture_opts = CaptureOptions {
            device_index: index,
            chunk_duration: self.opts.chunk_duration,
            calibration_duration: self.opts.calibration_duration,
        };
        match self
            .deps
            .capture
            .start(capture_opts, Arc::clone(&self.queue))
            .await
        {
            Ok(handle) => {
                info!(device = %handle.selection().resolved_name, "capture rebound");
                *self.capture_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!("failed to rebind capture to new device: {e}");
                Err(e)
            }
        }
    }

    pub fn scenarios(&self) -> &ScenarioCatalog {
        &self.scenarios
    }

    pub fn conversation(&self) -> Vec<String> {
        self.conversation.lock().snapshot()
    }

    pub fn state(&self) -> RunState {
        *self.run_state.lock()
    }

    pub fn stats(&self) -> SessionStats {
        let settings = self.settings.read().clone();
        SessionStats {
            state: self.state(),
            started_at: *self.started_at.lock(),
            lines: self.conversation.lock().len(),
            queued_chunks: self.queue.len(),
            spoken_language: settings.spoken_language,
            target_language: settings.target_language,
            scenario: settings.scenario,
        }
    }
}

/// The foreground half of the pipeline: drains the queue, applies the
/// line-boundary heuristic, and composes the three remote services,
/// absorbing their per-call failures so the stream never dies mid-run.
struct ConsumerLoop {
    queue: Arc<ChunkQueue>,
    settings: Arc<RwLock<SessionSettings>>,
    conversation: Arc<Mutex<Conversation>>,
    scenarios: ScenarioCatalog,
    cancel: CancellationToken,
    transcriber: Arc<dyn TranscriptionEngine>,
    translator: Arc<dyn Translator>,
    context: Arc<dyn ContextGenerator>,
    opts: LoopOptions,
    tx: mpsc::Sender<SessionEvent>,
}

impl ConsumerLoop {
    async fn run(self) {
        let mut segment = SegmentBuffer::new(self.opts.line_timeout);
        info!("consumer loop started");

        'session: while !self.cancel.is_armed() {
            // The iteration clock starts here; the boundary decision below
            // measures against it, so time spent waiting for audio counts.
            let iteration_start = Instant::now();

            while self.queue.is_empty() {
                if self.cancel.is_armed() {
                    break 'session;
                }
                self.queue.wait_non_empty(self.opts.poll_interval).await;
            }

            let batch = self.queue.drain();
            if batch.is_empty() {
                continue;
            }
            let boundary = segment.absorb(&batch, iteration_start.elapsed());

            let samples = segment.samples_f32();
            let text = match self.transcriber.transcribe(&samples).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("transcription failed, skipping iteration: {e}");
                    continue;
                }
            };

            let new_line = boundary == LineBoundary::NewLine;
            let line_index = {
                let mut conversation = self.conversation.lock();
                match boundary {
                    LineBoundary::NewLine => conversation.start_new_line(text.clone()),
                    LineBoundary::SameLine => conversation.update_open_line(text.clone()),
                }
                conversation.len() - 1
            };

            // One snapshot per iteration: language, scenario and formality
            // are read together so concurrent reconfiguration cannot tear.
            let settings = self.settings.read().clone();
            let scenario_description = self
                .scenarios
                .get(&settings.scenario)
                .map(|s| s.description.clone());

            let translation = match self
                .translator
                .translate(TranslationRequest {
                    text: &text,
                    source_lang: settings.spoken_language.code(),
                    target_lang: settings.target_language.code(),
                    context: scenario_description.as_deref(),
                    formality: settings.formality,
                })
                .await
            {
                Ok(translated) => Some(translated),
                Err(e) => {
                    warn!("translation failed for current line: {e}");
                    None
                }
            };

            let context = match self
                .context
                .generate(
                    &text,
                    scenario_description.as_deref().unwrap_or(""),
                    settings.target_language.code(),
                )
                .await
            {
                Ok(gloss) => Some(gloss),
                Err(e) => {
                    warn!("context generation failed for current line: {e}");
                    None
                }
            };

            let result = LineResult {
                line_index,
                text,
                translation,
                context,
                new_line,
                timestamp: Utc::now(),
            };
            if !self.deliver(SessionEvent::Line(result)).await {
                break;
            }
        }

        // Best effort: a consumer that stalled with a full channel loses
        // the terminal event rather than wedging shutdown.
        let conversation = self.conversation.lock().snapshot();
        let _ = self.tx.try_send(SessionEvent::Stopped { conversation });
        info!("consumer loop stopped");
    }

    /// Push an event onto the stream without parking in `send`: a full
    /// channel is retried on the poll tick with the cancellation token
    /// checked between attempts, so `stop()` can always join the loop even
    /// when the stream's consumer has stalled.
    async fn deliver(&self, event: SessionEvent) -> bool {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return true,
                Err(TrySendError::Closed(_)) => {
                    info!("result receiver dropped, treating as cancellation");
                    self.cancel.arm();
                    return false;
                }
                Err(TrySendError::Full(returned)) => {
                    if self.cancel.is_armed() {
                        return false;
                    }
                    event = returned;
                    tokio::time::sleep(self.opts.poll_interval).await;
                }
            }
        }
    }
}
