use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::SeekConfig;
use crate::player::{CompletionSink, Player, SeekCompletion, SeekOutcome, SeekRequest};
use crate::state::SeekState;
use crate::time::MediaTime;

/// Turns a burst of seek requests into at most one in-flight seek at a time.
///
/// Requests made while a seek runs collapse into the latest one, which starts
/// as soon as the running seek finishes. A cancelled seek ends the whole
/// sequence.
///
/// All methods and all completions must run on the same thread.
///
/// # Example
/// ```
/// use std::rc::Rc;
///
/// use scrub_engine::{ManualPlayer, MediaTime, SeekCoalescer, SeekRequest};
///
/// let player = Rc::new(ManualPlayer::new());
/// let coalescer = SeekCoalescer::new(Rc::clone(&player));
///
/// coalescer.request_seek(SeekRequest::exact(MediaTime::from_millis(5_000)));
/// coalescer.request_seek(SeekRequest::exact(MediaTime::from_millis(6_000)));
/// coalescer.request_seek(SeekRequest::exact(MediaTime::from_millis(8_000)));
/// assert_eq!(coalescer.final_seek_time(), Some(MediaTime::from_millis(8_000)));
///
/// player.complete_next();
/// player.complete_next();
/// assert!(!coalescer.is_seeking());
/// assert_eq!(coalescer.issued_seeks(), 2);
/// ```
pub struct SeekCoalescer<P>
where
    P: Player + 'static,
{
    shared: Rc<Shared<P>>,
}

struct Shared<P> {
    player: P,
    config: SeekConfig,
    inner: RefCell<Inner>,
    this: Weak<Shared<P>>,
}

#[derive(Debug, Default)]
struct Inner {
    state: SeekState,
    in_flight: Option<InFlight>,
    last_sequence: u64,
    issued: u64,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    sequence: u64,
    issued_at: Instant,
}

impl<P> SeekCoalescer<P>
where
    P: Player + 'static,
{
    pub fn new(player: P) -> Self {
        Self::with_config(player, SeekConfig::default())
    }

    pub fn with_config(player: P, config: SeekConfig) -> Self {
        let shared = Rc::new_cyclic(|this| Shared {
            player,
            config,
            inner: RefCell::new(Inner::default()),
            this: this.clone(),
        });
        Self { shared }
    }

    pub fn player(&self) -> &P {
        &self.shared.player
    }

    pub fn config(&self) -> &SeekConfig {
        &self.shared.config
    }

    /// True while a seek is believed to be running on the player.
    pub fn is_seeking(&self) -> bool {
        self.shared.inner.borrow().state.is_seeking()
    }

    /// Target of the queued request, else of the running one.
    pub fn final_seek_time(&self) -> Option<MediaTime> {
        self.shared.inner.borrow().state.final_seek_time()
    }

    pub fn state(&self) -> SeekState {
        self.shared.inner.borrow().state
    }

    /// Number of seeks actually handed to the player so far.
    pub fn issued_seeks(&self) -> u64 {
        self.shared.inner.borrow().issued
    }

    /// Asks the player to cancel. Bookkeeping clears when the cancelled
    /// completion arrives, not here.
    pub fn cancel_pending_seeks(&self) {
        debug!(seeking = self.is_seeking(), "cancelling pending seeks");
        self.shared.player.cancel_pending_seeks();
    }

    /// Requests a play-head move. A request for the current position is ignored.
    ///
    /// The comparison is against the player's position, not the queued
    /// target: while a seek away from the current position is still in
    /// flight, a request back to that position is dropped and the play-head
    /// settles on the earlier target.
    pub fn request_seek(&self, request: SeekRequest) {
        if request.target == self.shared.player.current_time() {
            debug!(target_time = %request.target, "seek target equals current time; ignored");
            return;
        }

        let start = self.shared.inner.borrow_mut().state.request(request);
        match start {
            Some(request) => {
                self.shared.player.pause();
                self.shared.issue(request);
            }
            None => debug!(target_time = %request.target, "seek queued behind in-flight seek"),
        }
    }

    /// Cancels everything and issues one seek to [`Self::final_seek_time`]
    /// with the given tolerances. Does nothing when no seek is pending.
    pub fn seek_to_final_time(&self, tolerance_before: MediaTime, tolerance_after: MediaTime) {
        let Some(target) = self.final_seek_time() else {
            return;
        };
        self.cancel_pending_seeks();

        let request = SeekRequest::new(target, tolerance_before, tolerance_after);
        self.shared.inner.borrow_mut().state.restart(request);
        info!(target_time = %target, "snapping to final seek time");
        self.shared.issue(request);
    }

    /// [`Self::seek_to_final_time`] with the configured snap tolerances.
    pub fn seek_to_final_time_with_config(&self) {
        let (before, after) = self.shared.config.snap_tolerances();
        self.seek_to_final_time(before, after);
    }

    /// Abandons the in-flight seek when it has outlived the configured stall
    /// timeout. Returns true when a seek was abandoned.
    ///
    /// A late completion for the abandoned seek is ignored.
    pub fn expire_stalled_seek(&self, now: Instant) -> bool {
        let Some(timeout) = self.shared.config.stall_timeout() else {
            return false;
        };

        let abandoned = {
            let mut inner = self.shared.inner.borrow_mut();
            match inner.in_flight {
                Some(in_flight) if now.saturating_duration_since(in_flight.issued_at) >= timeout => {
                    inner.in_flight = None;
                    inner.state.reset()
                }
                _ => None,
            }
        };
        let Some(request) = abandoned else {
            return false;
        };

        warn!(
            target_time = %request.target,
            timeout_ms = timeout.as_millis() as u64,
            "seek stalled; abandoning"
        );
        self.shared.player.cancel_pending_seeks();
        true
    }
}

impl<P> Shared<P>
where
    P: Player + 'static,
{
    fn issue(&self, request: SeekRequest) {
        let sequence = {
            let mut inner = self.inner.borrow_mut();
            inner.last_sequence += 1;
            inner.issued += 1;
            let sequence = inner.last_sequence;
            inner.in_flight = Some(InFlight {
                sequence,
                issued_at: Instant::now(),
            });
            sequence
        };

        debug!(
            sequence,
            target_time = %request.target,
            before = %request.tolerance_before,
            after = %request.tolerance_after,
            "seek issued"
        );
        let sink: Weak<dyn CompletionSink> = self.this.clone();
        self.player
            .seek(request, SeekCompletion::new(request, sequence, sink));
    }
}

impl<P> CompletionSink for Shared<P>
where
    P: Player + 'static,
{
    fn seek_finished(&self, sequence: u64, outcome: SeekOutcome) {
        let next = {
            let mut inner = self.inner.borrow_mut();
            match inner.in_flight {
                Some(in_flight) if in_flight.sequence == sequence => {}
                _ => {
                    debug!(sequence, ?outcome, "completion for superseded seek ignored");
                    return;
                }
            }
            inner.in_flight = None;
            let next = inner.state.finish(outcome);
            if next.is_none() {
                if outcome.was_cancelled() {
                    info!(sequence, "seek cancelled; queue dropped");
                } else {
                    info!(sequence, "seek sequence drained");
                }
            }
            next
        };

        if let Some(next) = next {
            self.issue(next);
        }
    }
}

impl<P> Debug for SeekCoalescer<P>
where
    P: Player + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.borrow();
        f.debug_struct("SeekCoalescer")
            .field("state", &inner.state)
            .field("issued", &inner.issued)
            .field("config", &self.shared.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use super::SeekCoalescer;
    use crate::config::SeekConfig;
    use crate::player::{Player, SeekCompletion, SeekOutcome, SeekRequest};
    use crate::state::SeekState;
    use crate::time::MediaTime;

    #[test]
    fn single_request_on_idle_pauses_and_issues_one_seek() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.request_seek(at(5_000));

        assert_eq!(*player.calls.borrow(), vec![Call::Pause, Call::Seek(at(5_000))]);
        assert!(coalescer.is_seeking());
        assert_eq!(coalescer.final_seek_time(), Some(secs(5)));
    }

    #[test]
    fn burst_of_requests_issues_first_and_last_only() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.request_seek(at(1_000));
        coalescer.request_seek(at(2_000));
        coalescer.request_seek(at(3_000));
        assert_eq!(coalescer.final_seek_time(), Some(secs(3)));
        assert_eq!(player.seeks(), vec![at(1_000)]);

        player.finish_next(SeekOutcome::Finished);
        assert_eq!(coalescer.final_seek_time(), Some(secs(3)));
        assert_eq!(player.seeks(), vec![at(1_000), at(3_000)]);

        player.finish_next(SeekOutcome::Finished);
        assert_eq!(coalescer.state(), SeekState::Idle);
        assert_eq!(coalescer.issued_seeks(), 2);
    }

    #[test]
    fn request_for_current_position_is_ignored() {
        let player = MockPlayer::new();
        player.position.set(secs(4));
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.request_seek(at(4_000));

        assert!(player.calls.borrow().is_empty());
        assert!(!coalescer.is_seeking());
    }

    #[test]
    fn request_back_to_current_position_keeps_queued_target() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));
        coalescer.request_seek(at(1_000));
        coalescer.request_seek(at(5_000));

        coalescer.request_seek(at(0));

        assert_eq!(coalescer.final_seek_time(), Some(secs(5)));
        player.finish_next(SeekOutcome::Finished);
        player.finish_next(SeekOutcome::Finished);
        assert_eq!(player.seeks(), vec![at(1_000), at(5_000)]);
        assert_eq!(player.position.get(), secs(5));
        assert_eq!(coalescer.state(), SeekState::Idle);
    }

    #[test]
    fn cancellation_returns_to_idle_even_with_queued_request() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));
        coalescer.request_seek(at(1_000));
        coalescer.request_seek(at(2_000));

        coalescer.cancel_pending_seeks();
        assert!(coalescer.is_seeking(), "cancel is not synchronous");

        player.finish_next(SeekOutcome::Cancelled);
        assert!(!coalescer.is_seeking());
        assert_eq!(coalescer.final_seek_time(), None);
        assert_eq!(player.seeks(), vec![at(1_000)]);
        assert!(player.calls.borrow().contains(&Call::Cancel));
    }

    #[test]
    fn cancel_when_idle_only_forwards_to_player() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.cancel_pending_seeks();
        coalescer.cancel_pending_seeks();

        assert_eq!(*player.calls.borrow(), vec![Call::Cancel, Call::Cancel]);
        assert_eq!(coalescer.state(), SeekState::Idle);
    }

    #[test]
    fn seek_to_final_time_without_pending_seek_makes_no_player_call() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.seek_to_final_time(MediaTime::from_millis(100), MediaTime::from_millis(100));

        assert!(player.calls.borrow().is_empty());
    }

    #[test]
    fn seek_to_final_time_cancels_then_issues_one_snap_seek() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));
        coalescer.request_seek(at(1_000));
        coalescer.request_seek(at(7_000));
        let wide = MediaTime::from_millis(500);

        coalescer.seek_to_final_time(wide, wide);

        let snap = SeekRequest::new(secs(7), wide, wide);
        assert_eq!(
            *player.calls.borrow(),
            vec![
                Call::Pause,
                Call::Seek(at(1_000)),
                Call::Cancel,
                Call::Seek(snap),
            ]
        );
        assert_eq!(coalescer.state(), SeekState::Seeking { current: snap });

        player.finish_next(SeekOutcome::Cancelled);
        assert!(coalescer.is_seeking(), "stale cancellation must not end the snap seek");

        player.finish_next(SeekOutcome::Finished);
        assert_eq!(coalescer.state(), SeekState::Idle);
        assert_eq!(player.seeks().len(), 2);
    }

    #[test]
    fn synchronous_completion_inside_seek_drains_without_reentrancy_panic() {
        let player = MockPlayer::new();
        player.complete_synchronously.set(true);
        let coalescer = SeekCoalescer::new(Rc::clone(&player));

        coalescer.request_seek(at(2_000));

        assert!(!coalescer.is_seeking());
        assert_eq!(player.seeks(), vec![at(2_000)]);
    }

    #[test]
    fn completion_after_coalescer_is_dropped_is_ignored() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));
        coalescer.request_seek(at(2_000));
        drop(coalescer);

        player.finish_next(SeekOutcome::Finished);

        assert_eq!(player.seeks(), vec![at(2_000)]);
    }

    #[test]
    fn stalled_seek_is_abandoned_after_timeout() {
        let player = MockPlayer::new();
        let config = SeekConfig {
            stall_timeout_ms: Some(500),
            ..SeekConfig::default()
        };
        let coalescer = SeekCoalescer::with_config(Rc::clone(&player), config);
        coalescer.request_seek(at(3_000));
        coalescer.request_seek(at(4_000));

        assert!(!coalescer.expire_stalled_seek(Instant::now()));
        assert!(coalescer.expire_stalled_seek(Instant::now() + Duration::from_secs(1)));
        assert_eq!(coalescer.state(), SeekState::Idle);

        player.finish_next(SeekOutcome::Finished);
        assert_eq!(coalescer.state(), SeekState::Idle);
        assert_eq!(coalescer.issued_seeks(), 1);
    }

    #[test]
    fn watchdog_is_disabled_by_default() {
        let player = MockPlayer::new();
        let coalescer = SeekCoalescer::new(Rc::clone(&player));
        coalescer.request_seek(at(3_000));

        assert!(!coalescer.expire_stalled_seek(Instant::now() + Duration::from_secs(3_600)));
        assert!(coalescer.is_seeking());
    }

    fn at(millis: i64) -> SeekRequest {
        SeekRequest::exact(MediaTime::from_millis(millis))
    }

    fn secs(value: i64) -> MediaTime {
        MediaTime::from_millis(value * 1_000)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Pause,
        Seek(SeekRequest),
        Cancel,
    }

    #[derive(Default)]
    struct MockPlayer {
        position: Cell<MediaTime>,
        calls: RefCell<Vec<Call>>,
        pending: RefCell<Vec<SeekCompletion>>,
        complete_synchronously: Cell<bool>,
    }

    impl MockPlayer {
        fn new() -> Rc<Self> {
            Rc::new(Self::default())
        }

        fn seeks(&self) -> Vec<SeekRequest> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| match call {
                    Call::Seek(request) => Some(*request),
                    _ => None,
                })
                .collect()
        }

        fn finish_next(&self, outcome: SeekOutcome) {
            let completion = self.pending.borrow_mut().remove(0);
            if outcome == SeekOutcome::Finished {
                self.position.set(completion.request().target);
            }
            completion.complete(outcome);
        }
    }

    impl Player for MockPlayer {
        fn current_time(&self) -> MediaTime {
            self.position.get()
        }

        fn seek(&self, request: SeekRequest, completion: SeekCompletion) {
            self.calls.borrow_mut().push(Call::Seek(request));
            if self.complete_synchronously.get() {
                self.position.set(request.target);
                completion.complete(SeekOutcome::Finished);
            } else {
                self.pending.borrow_mut().push(completion);
            }
        }

        fn cancel_pending_seeks(&self) {
            self.calls.borrow_mut().push(Call::Cancel);
        }

        fn pause(&self) {
            self.calls.borrow_mut().push(Call::Pause);
        }
    }
}
