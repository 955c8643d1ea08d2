//! Seek coalescing for scrubbing through video on an asynchronous player.

pub mod coalescer;
pub mod config;
pub mod error;
pub mod manual;
pub mod player;
pub mod scrub;
pub mod state;
pub mod time;

pub use coalescer::SeekCoalescer;
pub use config::SeekConfig;
pub use error::{EngineError, Result};
pub use manual::{ManualPlayer, PlayerCall};
pub use player::{Player, SeekCompletion, SeekOutcome, SeekRequest};
pub use scrub::Scrubber;
pub use state::SeekState;
pub use time::MediaTime;
