use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use scrub_engine::{ManualPlayer, MediaTime, Player, SeekCoalescer, SeekConfig, SeekRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays a scripted scrub against a simulated player and prints the seeks it receives.
#[derive(Debug, Parser)]
#[command(name = "scrub-sim", version)]
struct Args {
    /// Requested positions in seconds, in order.
    #[arg(long, value_delimiter = ',', required = true)]
    targets: Vec<f64>,

    /// Initial play-head position in seconds.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Finish the in-flight seek after every N requests; 0 waits until the end.
    #[arg(long, default_value_t = 2)]
    complete_every: usize,

    /// Cancel pending seeks right after the request with this index.
    #[arg(long)]
    cancel_at: Option<usize>,

    /// Snap to the final position with the configured tolerances after the burst.
    #[arg(long)]
    snap: bool,

    /// JSON seek config.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("scrub-sim: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn run(args: &Args) -> scrub_engine::Result<()> {
    let config = match &args.config {
        Some(path) => SeekConfig::load(path)?,
        None => SeekConfig::default(),
    };
    let scrub_tolerance = config.scrub_tolerance();

    let player = Rc::new(ManualPlayer::starting_at(MediaTime::from_secs_f64(
        args.start,
    )));
    let coalescer = SeekCoalescer::with_config(Rc::clone(&player), config);

    for (index, seconds) in args.targets.iter().enumerate() {
        let request = SeekRequest::new(
            MediaTime::from_secs_f64(*seconds),
            scrub_tolerance,
            scrub_tolerance,
        );
        coalescer.request_seek(request);

        if args.cancel_at == Some(index) {
            coalescer.cancel_pending_seeks();
        }
        if args.complete_every > 0 && (index + 1) % args.complete_every == 0 {
            player.complete_next();
        }
    }

    if args.snap {
        coalescer.seek_to_final_time_with_config();
    }
    while player.complete_next().is_some() {}

    info!(
        requested = args.targets.len(),
        issued = coalescer.issued_seeks(),
        "scrub replay finished"
    );
    for (index, seek) in player.seeks().iter().enumerate() {
        println!(
            "seek #{:<3} target={} before={} after={}",
            index + 1,
            seek.target,
            seek.tolerance_before,
            seek.tolerance_after
        );
    }
    println!(
        "requested={} issued={} position={} state={:?}",
        args.targets.len(),
        coalescer.issued_seeks(),
        player.current_time(),
        coalescer.state()
    );
    Ok(())
}
