use tracing::debug;

use crate::coalescer::SeekCoalescer;
use crate::player::{Player, SeekRequest};
use crate::time::MediaTime;

/// Maps slider positions in `[0, 1]` onto coalesced seeks over one media item.
///
/// # Example
/// ```
/// use std::rc::Rc;
///
/// use scrub_engine::{ManualPlayer, MediaTime, Scrubber, SeekCoalescer};
///
/// let player = Rc::new(ManualPlayer::new());
/// let mut scrubber = Scrubber::new(
///     SeekCoalescer::new(Rc::clone(&player)),
///     MediaTime::from_millis(10_000),
/// );
///
/// scrubber.begin_scrub();
/// scrubber.scrub_to_fraction(0.5);
/// assert_eq!(player.seeks()[0].target, MediaTime::from_millis(5_000));
/// ```
#[derive(Debug)]
pub struct Scrubber<P>
where
    P: Player + 'static,
{
    coalescer: SeekCoalescer<P>,
    duration: MediaTime,
    scrubbing: bool,
}

impl<P> Scrubber<P>
where
    P: Player + 'static,
{
    pub fn new(coalescer: SeekCoalescer<P>, duration: MediaTime) -> Self {
        Self {
            coalescer,
            duration,
            scrubbing: false,
        }
    }

    pub fn coalescer(&self) -> &SeekCoalescer<P> {
        &self.coalescer
    }

    pub fn duration(&self) -> MediaTime {
        self.duration
    }

    pub fn set_duration(&mut self, duration: MediaTime) {
        self.duration = duration;
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    pub fn begin_scrub(&mut self) {
        debug!(duration = %self.duration, "scrub started");
        self.scrubbing = true;
    }

    /// Requests a seek to `fraction` of the duration with the scrub tolerance.
    pub fn scrub_to_fraction(&mut self, fraction: f64) {
        let target = self.time_at_fraction(fraction);
        let tolerance = self.coalescer.config().scrub_tolerance();
        self.coalescer
            .request_seek(SeekRequest::new(target, tolerance, tolerance));
    }

    /// Ends the drag and snaps to the last requested position.
    pub fn end_scrub(&mut self) {
        self.scrubbing = false;
        self.coalescer.seek_to_final_time_with_config();
    }

    /// Position under `fraction`; out-of-range values clamp and NaN maps to 0.
    pub fn time_at_fraction(&self, fraction: f64) -> MediaTime {
        if self.duration <= MediaTime::ZERO {
            return MediaTime::ZERO;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        MediaTime::from_micros((self.duration.as_micros() as f64 * fraction).round() as i64)
    }

    pub fn fraction_of(&self, time: MediaTime) -> f64 {
        if self.duration <= MediaTime::ZERO {
            return 0.0;
        }
        (time.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Slider position to show: where seeking ends up while it runs, else
    /// the player position.
    pub fn display_fraction(&self) -> f64 {
        let shown = self
            .coalescer
            .final_seek_time()
            .unwrap_or_else(|| self.coalescer.player().current_time());
        self.fraction_of(shown)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::Scrubber;
    use crate::coalescer::SeekCoalescer;
    use crate::config::SeekConfig;
    use crate::manual::ManualPlayer;
    use crate::player::SeekRequest;
    use crate::time::MediaTime;

    fn scrubber_over(
        player: &Rc<ManualPlayer>,
        config: SeekConfig,
    ) -> Scrubber<Rc<ManualPlayer>> {
        Scrubber::new(
            SeekCoalescer::with_config(Rc::clone(player), config),
            MediaTime::from_millis(10_000),
        )
    }

    #[test]
    fn fraction_is_clamped_to_duration() {
        let player = Rc::new(ManualPlayer::new());
        let scrubber = scrubber_over(&player, SeekConfig::default());

        assert_eq!(scrubber.time_at_fraction(1.7), MediaTime::from_millis(10_000));
        assert_eq!(scrubber.time_at_fraction(-0.2), MediaTime::ZERO);
        assert_eq!(scrubber.time_at_fraction(f64::NAN), MediaTime::ZERO);
    }

    #[test]
    fn zero_duration_maps_everything_to_start() {
        let player = Rc::new(ManualPlayer::new());
        let mut scrubber = scrubber_over(&player, SeekConfig::default());
        scrubber.set_duration(MediaTime::ZERO);

        assert_eq!(scrubber.time_at_fraction(0.5), MediaTime::ZERO);
        assert_eq!(scrubber.fraction_of(MediaTime::from_millis(3_000)), 0.0);
    }

    #[test]
    fn display_follows_final_seek_time_during_drag() {
        let player = Rc::new(ManualPlayer::new());
        let mut scrubber = scrubber_over(&player, SeekConfig::default());

        scrubber.begin_scrub();
        scrubber.scrub_to_fraction(0.2);
        scrubber.scrub_to_fraction(0.6);

        assert!((scrubber.display_fraction() - 0.6).abs() < 1e-9);
        assert_eq!(player.seeks().len(), 1);
    }

    #[test]
    fn end_scrub_snaps_with_configured_tolerances() {
        let player = Rc::new(ManualPlayer::new());
        let config = SeekConfig {
            snap_tolerance_before_ms: 250,
            snap_tolerance_after_ms: 50,
            ..SeekConfig::default()
        };
        let mut scrubber = scrubber_over(&player, config);

        scrubber.begin_scrub();
        scrubber.scrub_to_fraction(0.1);
        scrubber.scrub_to_fraction(0.4);
        scrubber.end_scrub();

        assert!(!scrubber.is_scrubbing());
        assert_eq!(
            player.seeks().last().copied(),
            Some(SeekRequest::new(
                MediaTime::from_millis(4_000),
                MediaTime::from_millis(250),
                MediaTime::from_millis(50),
            ))
        );
        player.complete_next();
        assert!(!scrubber.coalescer().is_seeking());
        assert!((scrubber.display_fraction() - 0.4).abs() < 1e-9);
    }
}
