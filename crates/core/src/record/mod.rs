use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::render::{Frame, Viewport};
use crate::WriteError;

/// Persists rendered frames. Implementations must not block the caller for
/// long; see [`BackgroundWriter`] for a queueing wrapper.
///
/// An error from [`write`](FrameWriter::write) always concerns the frame
/// passed to that call. Writers that finish work later report those
/// failures through [`poll_failures`](FrameWriter::poll_failures) and
/// [`flush`](FrameWriter::flush) instead.
pub trait FrameWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<(), WriteError>;

    /// Failures of accepted writes that finished since the last call.
    /// Never waits.
    fn poll_failures(&mut self) -> Vec<WriteError> {
        Vec::new()
    }

    /// Waits until every accepted write has finished and returns the
    /// failures not reported yet.
    fn flush(&mut self) -> Vec<WriteError> {
        Vec::new()
    }
}

/// Synchronous PNG encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngWriter;

impl FrameWriter for PngWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<(), WriteError> {
        frame
            .save_with_format(path, ImageFormat::Png)
            .map_err(|err| WriteError::new(path, err.to_string()))
    }
}

enum Job {
    Write { frame: Frame, path: PathBuf },
    Flush(Sender<()>),
}

/// Moves encoding onto a worker thread behind a bounded queue. A full queue
/// is reported as a write failure instead of stalling the animation.
pub struct BackgroundWriter {
    jobs: Option<Sender<Job>>,
    failures: Receiver<WriteError>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundWriter {
    pub fn spawn<W>(mut inner: W, queue_depth: usize) -> Self
    where
        W: FrameWriter + Send + 'static,
    {
        let (jobs, queue) = channel::bounded::<Job>(queue_depth.max(1));
        let (failed, failures) = channel::unbounded();
        let worker = thread::spawn(move || {
            for job in queue {
                match job {
                    Job::Write { frame, path } => {
                        if let Err(err) = inner.write(&frame, &path) {
                            tracing::warn!(path = %path.display(), "background write failed");
                            let _ = failed.send(err);
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self {
            jobs: Some(jobs),
            failures,
            worker: Some(worker),
        }
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("frame writer thread panicked");
            }
        }
    }
}

impl FrameWriter for BackgroundWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<(), WriteError> {
        let Some(jobs) = self.jobs.as_ref() else {
            return Err(WriteError::new(path, "frame writer has shut down"));
        };
        let job = Job::Write {
            frame: frame.clone(),
            path: path.to_path_buf(),
        };
        jobs.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => WriteError::new(path, "write queue is full"),
            TrySendError::Disconnected(_) => WriteError::new(path, "frame writer has shut down"),
        })
    }

    fn poll_failures(&mut self) -> Vec<WriteError> {
        self.failures.try_iter().collect()
    }

    fn flush(&mut self) -> Vec<WriteError> {
        if let Some(jobs) = self.jobs.as_ref() {
            let (done, finished) = channel::bounded(1);
            if jobs.send(Job::Flush(done)).is_ok() {
                // The worker acknowledges only after every earlier job.
                let _ = finished.recv();
            }
        }
        self.failures.try_iter().collect()
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for BackgroundWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWriter")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

/// Configuration options for the capture subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Directory receiving sequence frames.
    pub output_dir: PathBuf,
    /// File name prefix of sequence frames, followed by the frame index.
    pub frame_prefix: String,
    /// Target of single still captures.
    pub still_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Full turns after which a sequence ends on its own. `None` uses the
    /// smallest whole number of turns that closes the figure.
    pub cycle_turns: Option<u32>,
    /// Frames the background writer may hold before rejecting new ones.
    pub queue_depth: usize,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            frame_prefix: "frame".to_string(),
            still_path: PathBuf::from("frame.png"),
            width: 1024,
            height: 1024,
            cycle_turns: None,
            queue_depth: 8,
        }
    }
}

impl RecordingSettings {
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}-{index:05}.png", self.frame_prefix))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// A still has been requested and not yet written.
    CapturingStill,
    CapturingSequence,
}

/// Bookkeeping for one sequence export.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    next_index: u64,
    cycle_radians: f64,
    start_angle: Option<f64>,
}

impl CaptureSession {
    /// Frames handed to the writer so far.
    pub fn frames_written(&self) -> u64 {
        self.next_index
    }
}

/// Why a sequence session ended. `frames` counts frames that were written
/// without a reported failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Stopped { frames: u64 },
    Completed { frames: u64 },
    Failed { frames: u64, error: WriteError },
}

/// Drives still and sequence captures through a [`FrameWriter`].
///
/// Late failures from the writer are charged to the open session. Every
/// session drains the writer when it ends, so a failure can never reach a
/// later session or still.
#[derive(Debug, Default)]
pub struct CaptureController {
    settings: RecordingSettings,
    session: Option<CaptureSession>,
    still_requested: bool,
    deferred: Vec<WriteError>,
}

impl CaptureController {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn state(&self) -> CaptureState {
        if self.still_requested {
            CaptureState::CapturingStill
        } else if self.session.is_some() {
            CaptureState::CapturingSequence
        } else {
            CaptureState::Idle
        }
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn request_still(&mut self) {
        self.still_requested = true;
    }

    /// Writes the requested still and returns to the previous state, whether
    /// or not the write succeeded. Waits for the writer so the result is
    /// final; failures of queued sequence frames found on the way stay with
    /// the session.
    pub fn finish_still(
        &mut self,
        frame: &Frame,
        writer: &mut dyn FrameWriter,
    ) -> Result<PathBuf, WriteError> {
        self.still_requested = false;
        let path = self.settings.still_path.clone();
        let mut failure = writer.write(frame, &path).err();
        for late in writer.flush() {
            if failure.is_none() && late.path == path {
                failure = Some(late);
            } else {
                self.defer(late);
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        tracing::info!(path = %path.display(), "saved still frame");
        Ok(path)
    }

    /// Opens a sequence session ending after `cycle_radians` of animation.
    pub fn start(&mut self, cycle_radians: f64) -> Result<(), WriteError> {
        fs::create_dir_all(&self.settings.output_dir)
            .map_err(|err| WriteError::new(&self.settings.output_dir, err.to_string()))?;
        self.session = Some(CaptureSession {
            next_index: 0,
            cycle_radians,
            start_angle: None,
        });
        tracing::info!(dir = %self.settings.output_dir.display(), "started frame capture");
        Ok(())
    }

    pub fn stop(&mut self, writer: &mut dyn FrameWriter) -> Option<SessionEnd> {
        self.close(writer, None, false)
    }

    /// Ends the session if the writer reported a failure for one of its
    /// queued frames.
    pub fn poll_writer(&mut self, writer: &mut dyn FrameWriter) -> Option<SessionEnd> {
        for late in writer.poll_failures() {
            self.defer(late);
        }
        if self.deferred.is_empty() {
            return None;
        }
        self.close(writer, None, false)
    }

    /// Ends the session once a full cycle has been written, measured from the
    /// angle of its first frame.
    pub fn poll_completion(
        &mut self,
        angle: f64,
        writer: &mut dyn FrameWriter,
    ) -> Option<SessionEnd> {
        let session = self.session.as_ref()?;
        let start = session.start_angle?;
        if angle - start < session.cycle_radians {
            return None;
        }
        self.close(writer, None, true)
    }

    /// Writes the next sequence frame. A failure closes the session.
    pub fn write_frame(
        &mut self,
        angle: f64,
        frame: &Frame,
        writer: &mut dyn FrameWriter,
    ) -> Result<PathBuf, SessionEnd> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionEnd::Stopped { frames: 0 });
        };
        let path = self.settings.frame_path(session.next_index);
        match writer.write(frame, &path) {
            Ok(()) => {
                session.start_angle.get_or_insert(angle);
                session.next_index += 1;
                Ok(path)
            }
            Err(error) => Err(self
                .close(writer, Some(error), false)
                .unwrap_or(SessionEnd::Stopped { frames: 0 })),
        }
    }

    fn defer(&mut self, failure: WriteError) {
        if self.session.is_some() {
            self.deferred.push(failure);
        } else {
            tracing::warn!(%failure, "write failure outside a capture session");
        }
    }

    /// Closes the session after draining the writer. `failure` is a frame
    /// that was never counted as written.
    fn close(
        &mut self,
        writer: &mut dyn FrameWriter,
        failure: Option<WriteError>,
        completed: bool,
    ) -> Option<SessionEnd> {
        let session = self.session.take()?;
        let mut late = std::mem::take(&mut self.deferred);
        late.extend(writer.flush());
        let frames = session.frames_written().saturating_sub(late.len() as u64);

        Some(match failure.or_else(|| late.into_iter().next()) {
            Some(error) => SessionEnd::Failed { frames, error },
            None if completed => SessionEnd::Completed { frames },
            None => SessionEnd::Stopped { frames },
        })
    }
}
