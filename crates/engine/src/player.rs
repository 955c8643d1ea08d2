use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

use crate::time::MediaTime;

/// One play-head move: a target plus the slack the player may use around it.
///
/// # Example
/// ```
/// use scrub_engine::{MediaTime, SeekRequest};
///
/// let request = SeekRequest::exact(MediaTime::from_millis(5_000));
/// assert_eq!(request.tolerance_before, MediaTime::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    pub target: MediaTime,
    pub tolerance_before: MediaTime,
    pub tolerance_after: MediaTime,
}

impl SeekRequest {
    pub fn new(target: MediaTime, tolerance_before: MediaTime, tolerance_after: MediaTime) -> Self {
        Self {
            target,
            tolerance_before,
            tolerance_after,
        }
    }

    /// Frame-accurate request with zero tolerance on both sides.
    pub fn exact(target: MediaTime) -> Self {
        Self::new(target, MediaTime::ZERO, MediaTime::ZERO)
    }
}

/// How an issued seek ended, as reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    Finished,
    /// Covers both explicit cancellation and the player abandoning the seek.
    Cancelled,
}

impl SeekOutcome {
    pub fn was_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Asynchronous media player driven by a [`crate::SeekCoalescer`].
///
/// The player must accept one outstanding seek and report it through the
/// supplied [`SeekCompletion`]. It may complete from inside `seek` or
/// `cancel_pending_seeks`, or at any later point on the same thread.
///
/// Nothing else may issue seeks against a player bound to a coalescer.
pub trait Player {
    /// Current play-head position.
    fn current_time(&self) -> MediaTime;

    /// Starts moving the play-head; `completion` must be fired once the seek ends.
    fn seek(&self, request: SeekRequest, completion: SeekCompletion);

    /// Cancels the in-flight seek, if any. Its completion reports `Cancelled`.
    fn cancel_pending_seeks(&self);

    fn pause(&self);
}

impl<P> Player for Rc<P>
where
    P: Player + ?Sized,
{
    fn current_time(&self) -> MediaTime {
        (**self).current_time()
    }

    fn seek(&self, request: SeekRequest, completion: SeekCompletion) {
        (**self).seek(request, completion);
    }

    fn cancel_pending_seeks(&self) {
        (**self).cancel_pending_seeks();
    }

    fn pause(&self) {
        (**self).pause();
    }
}

/// Receiver of seek completions, implemented by the coalescer internals.
pub(crate) trait CompletionSink {
    fn seek_finished(&self, sequence: u64, outcome: SeekOutcome);
}

/// One-shot completion handle for an issued seek.
///
/// `complete` consumes the handle, so it fires at most once. Dropping an
/// uncompleted handle reports [`SeekOutcome::Cancelled`]. The handle keeps only
/// a weak reference to its coalescer; once the coalescer is gone, completing
/// does nothing.
pub struct SeekCompletion {
    request: SeekRequest,
    sequence: u64,
    sink: Option<Weak<dyn CompletionSink>>,
}

impl SeekCompletion {
    pub(crate) fn new(request: SeekRequest, sequence: u64, sink: Weak<dyn CompletionSink>) -> Self {
        Self {
            request,
            sequence,
            sink: Some(sink),
        }
    }

    /// Request this completion belongs to.
    pub fn request(&self) -> SeekRequest {
        self.request
    }

    /// Sequence number of the issued seek, unique per coalescer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn complete(mut self, outcome: SeekOutcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: SeekOutcome) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        if let Some(sink) = sink.upgrade() {
            sink.seek_finished(self.sequence, outcome);
        }
    }
}

impl Drop for SeekCompletion {
    fn drop(&mut self) {
        self.fire(SeekOutcome::Cancelled);
    }
}

impl Debug for SeekCompletion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeekCompletion")
            .field("request", &self.request)
            .field("sequence", &self.sequence)
            .field("pending", &self.sink.is_some())
            .finish()
    }
}
