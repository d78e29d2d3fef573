//! Rodio-based playback adapter
//!
//! Rodio's output stream is not `Send`, so every open playback owns a
//! thread holding the stream and its sink. The handle drives it through a
//! command channel and reads a status snapshot the thread refreshes.

use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink, Source};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::source::SourceLoader;
use crate::application::ports::{AudioOutput, DeviceStatus, PlaybackError, PlaybackHandle};

/// How often the playback thread refreshes its status snapshot
const STATUS_REFRESH: StdDuration = StdDuration::from_millis(25);

/// Plays local files and HTTP(S) media on the default output device
#[derive(Debug, Clone, Default)]
pub struct RodioAudioOutput {
    loader: SourceLoader,
}

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: SourceLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    async fn open(&self, uri: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let bytes = self.loader.load(uri).await?;

        let status = Arc::new(StdMutex::new(DeviceStatus::default()));
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_status = Arc::clone(&status);
        let thread = std::thread::Builder::new()
            .name("voicenote-playback".into())
            .spawn(move || run_playback(bytes, thread_status, command_rx, ready_tx))
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(PlaybackError::DeviceUnavailable(
                    "playback thread exited before starting".into(),
                ))
            }
        }

        debug!(uri, "media opened");
        Ok(Box::new(RodioPlayback {
            commands: StdMutex::new(commands),
            status,
            thread: StdMutex::new(Some(thread)),
        }))
    }
}

enum Command {
    Play,
    Pause,
    Seek(StdDuration, oneshot::Sender<Result<(), PlaybackError>>),
    Close,
}

/// Body of the playback thread
fn run_playback(
    bytes: Vec<u8>,
    status: Arc<StdMutex<DeviceStatus>>,
    commands: mpsc::Receiver<Command>,
    ready: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let decoder = match Decoder::new(Cursor::new(bytes)) {
        Ok(decoder) => decoder,
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::Decode(e.to_string())));
            return;
        }
    };
    let total = decoder.total_duration();

    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
            return;
        }
    };
    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = ready.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
            return;
        }
    };

    // Opened paused
    sink.pause();
    sink.append(decoder);

    let duration_millis = total.map(|d| d.as_millis() as u64);
    publish(&status, &sink, duration_millis);
    if ready.send(Ok(())).is_err() {
        return;
    }

    loop {
        match commands.recv_timeout(STATUS_REFRESH) {
            Ok(Command::Play) => sink.play(),
            Ok(Command::Pause) => sink.pause(),
            Ok(Command::Seek(position, reply)) => {
                let result = sink
                    .try_seek(position)
                    .map_err(|e| PlaybackError::CommandFailed(e.to_string()));
                let _ = reply.send(result);
            }
            Ok(Command::Close) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        publish(&status, &sink, duration_millis);
    }

    sink.stop();
}

fn publish(status: &StdMutex<DeviceStatus>, sink: &Sink, duration_millis: Option<u64>) {
    let finished = sink.empty();
    let snapshot = DeviceStatus {
        is_playing: !sink.is_paused() && !finished,
        position_millis: sink.get_pos().as_millis() as u64,
        duration_millis,
        finished,
    };
    *status.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
}

/// An open rodio playback
pub struct RodioPlayback {
    commands: StdMutex<mpsc::Sender<Command>>,
    status: Arc<StdMutex<DeviceStatus>>,
    thread: StdMutex<Option<JoinHandle<()>>>,
}

impl RodioPlayback {
    fn send(&self, command: Command) -> Result<(), PlaybackError> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(command)
            .map_err(|_| PlaybackError::CommandFailed("playback thread has exited".into()))
    }
}

#[async_trait]
impl PlaybackHandle for RodioPlayback {
    async fn play(&self) -> Result<(), PlaybackError> {
        self.send(Command::Play)
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        self.send(Command::Pause)
    }

    async fn seek(&self, position_millis: u64) -> Result<(), PlaybackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Seek(
            StdDuration::from_millis(position_millis),
            reply_tx,
        ))?;
        reply_rx
            .await
            .map_err(|_| PlaybackError::CommandFailed("playback thread has exited".into()))?
    }

    fn status(&self) -> DeviceStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn close(&self) {
        let _ = self.send(Command::Close);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if tokio::task::spawn_blocking(move || thread.join()).await.is_err() {
                warn!("playback thread did not shut down cleanly");
            }
        }
    }
}

impl Drop for RodioPlayback {
    fn drop(&mut self) {
        let _ = self.send(Command::Close);
    }
}
