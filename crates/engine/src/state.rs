use crate::player::{SeekOutcome, SeekRequest};
use crate::time::MediaTime;

/// Coalescer bookkeeping: what is in flight and what is waiting behind it.
///
/// A queued request without an in-flight one cannot be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeekState {
    #[default]
    Idle,
    Seeking {
        current: SeekRequest,
    },
    SeekingWithQueued {
        current: SeekRequest,
        queued: SeekRequest,
    },
}

impl SeekState {
    pub fn is_seeking(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn current(&self) -> Option<SeekRequest> {
        match *self {
            Self::Idle => None,
            Self::Seeking { current } | Self::SeekingWithQueued { current, .. } => Some(current),
        }
    }

    pub fn queued(&self) -> Option<SeekRequest> {
        match *self {
            Self::SeekingWithQueued { queued, .. } => Some(queued),
            _ => None,
        }
    }

    /// Where the play-head ends up once everything requested so far has run.
    pub fn final_seek_time(&self) -> Option<MediaTime> {
        self.queued().or(self.current()).map(|request| request.target)
    }

    /// Records a new request, replacing any queued one.
    ///
    /// Returns the request to issue right away when nothing was in flight.
    pub fn request(&mut self, request: SeekRequest) -> Option<SeekRequest> {
        match *self {
            Self::Idle => {
                *self = Self::SeekingWithQueued {
                    current: request,
                    queued: request,
                };
                self.promote()
            }
            Self::Seeking { current } | Self::SeekingWithQueued { current, .. } => {
                *self = Self::SeekingWithQueued {
                    current,
                    queued: request,
                };
                None
            }
        }
    }

    /// Applies the completion of the in-flight seek.
    ///
    /// Returns the queued request to issue next. Cancellation drops the queue.
    pub fn finish(&mut self, outcome: SeekOutcome) -> Option<SeekRequest> {
        match (*self, outcome) {
            (Self::SeekingWithQueued { .. }, SeekOutcome::Finished) => self.promote(),
            _ => {
                *self = Self::Idle;
                None
            }
        }
    }

    /// Replaces everything with `request` as the only in-flight seek.
    pub fn restart(&mut self, request: SeekRequest) {
        *self = Self::Seeking { current: request };
    }

    /// Drops all bookkeeping and returns the seek that was in flight.
    pub fn reset(&mut self) -> Option<SeekRequest> {
        let current = self.current();
        *self = Self::Idle;
        current
    }

    fn promote(&mut self) -> Option<SeekRequest> {
        match *self {
            Self::SeekingWithQueued { queued, .. } => {
                *self = Self::Seeking { current: queued };
                Some(queued)
            }
            _ => {
                debug_assert!(false, "promote requires a queued seek, state was {:?}", self);
                None
            }
        }
    }
}
