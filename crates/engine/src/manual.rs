use std::cell::{Cell, RefCell};

use crate::player::{Player, SeekCompletion, SeekOutcome, SeekRequest};
use crate::time::MediaTime;

/// One call received by a [`ManualPlayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCall {
    Seek(SeekRequest),
    CancelPendingSeeks,
    Pause,
}

/// Deterministic player whose seeks finish only when told to.
///
/// Holds at most one pending seek, like a platform player: a new seek
/// cancels the previous one. When a frame duration is set, finished seeks
/// land on the nearest frame boundary the request's tolerances allow.
#[derive(Debug, Default)]
pub struct ManualPlayer {
    position: Cell<MediaTime>,
    playing: Cell<bool>,
    frame_duration: Option<MediaTime>,
    complete_cancellations_immediately: bool,
    calls: RefCell<Vec<PlayerCall>>,
    pending: RefCell<Option<PendingSeek>>,
}

#[derive(Debug)]
struct PendingSeek {
    completion: SeekCompletion,
    cancelled: bool,
}

impl ManualPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(position: MediaTime) -> Self {
        let player = Self::default();
        player.position.set(position);
        player
    }

    /// Fires cancelled completions from inside `cancel_pending_seeks`.
    pub fn with_immediate_cancellation(mut self) -> Self {
        self.complete_cancellations_immediately = true;
        self
    }

    /// Lands finished seeks on multiples of `frame_duration` when tolerated.
    pub fn with_frame_duration(mut self, frame_duration: MediaTime) -> Self {
        if frame_duration > MediaTime::ZERO {
            self.frame_duration = Some(frame_duration);
        }
        self
    }

    pub fn play(&self) {
        self.playing.set(true);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.borrow().clone()
    }

    /// Seek requests received so far, in order.
    pub fn seeks(&self) -> Vec<SeekRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PlayerCall::Seek(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub fn pending_request(&self) -> Option<SeekRequest> {
        self.pending
            .borrow()
            .as_ref()
            .map(|pending| pending.completion.request())
    }

    pub fn has_pending_seek(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Finishes the pending seek, as cancelled if a cancel arrived meanwhile.
    ///
    /// Returns the reported outcome, or `None` when nothing was pending.
    pub fn complete_next(&self) -> Option<SeekOutcome> {
        let pending = self.pending.borrow_mut().take()?;
        let outcome = if pending.cancelled {
            SeekOutcome::Cancelled
        } else {
            SeekOutcome::Finished
        };
        self.finish(pending.completion, outcome);
        Some(outcome)
    }

    /// Finishes the pending seek with an explicit outcome.
    pub fn complete_pending(&self, outcome: SeekOutcome) -> bool {
        let Some(pending) = self.pending.borrow_mut().take() else {
            return false;
        };
        self.finish(pending.completion, outcome);
        true
    }

    fn finish(&self, completion: SeekCompletion, outcome: SeekOutcome) {
        if outcome == SeekOutcome::Finished {
            self.position.set(self.landing_position(completion.request()));
        }
        completion.complete(outcome);
    }

    fn landing_position(&self, request: SeekRequest) -> MediaTime {
        let Some(frame) = self.frame_duration else {
            return request.target;
        };
        let frame = frame.as_micros();
        let target = request.target.as_micros();
        let snapped = MediaTime::from_micros(
            target
                .saturating_add(frame / 2)
                .div_euclid(frame)
                .saturating_mul(frame),
        );
        let earliest = request.target - request.tolerance_before;
        let latest = request.target + request.tolerance_after;
        if snapped >= earliest && snapped <= latest {
            snapped
        } else {
            request.target
        }
    }
}

impl Player for ManualPlayer {
    fn current_time(&self) -> MediaTime {
        self.position.get()
    }

    fn seek(&self, request: SeekRequest, completion: SeekCompletion) {
        self.calls.borrow_mut().push(PlayerCall::Seek(request));
        let previous = self.pending.borrow_mut().replace(PendingSeek {
            completion,
            cancelled: false,
        });
        if let Some(previous) = previous {
            previous.completion.complete(SeekOutcome::Cancelled);
        }
    }

    fn cancel_pending_seeks(&self) {
        self.calls.borrow_mut().push(PlayerCall::CancelPendingSeeks);
        if self.complete_cancellations_immediately {
            let pending = self.pending.borrow_mut().take();
            if let Some(pending) = pending {
                pending.completion.complete(SeekOutcome::Cancelled);
            }
        } else if let Some(pending) = self.pending.borrow_mut().as_mut() {
            pending.cancelled = true;
        }
    }

    fn pause(&self) {
        self.calls.borrow_mut().push(PlayerCall::Pause);
        self.playing.set(false);
    }
}
