//! Generic progressive-fallback driver.
//!
//! Both the encode ladder and the audio-extraction ladder share the same
//! shape: an ordered list of named strategies, each a pure function from a
//! context to an FFmpeg argument vector, tried until one produces output
//! that validates.

use tracing::{info, warn};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::runner::ProcessRunner;

/// One named fallback strategy.
///
/// `build` is a pure function; all state lives in the context, so a
/// strategy can be unit-tested by inspecting its argument vector.
pub struct Strategy<C> {
    pub name: &'static str,
    pub build: fn(&C) -> FfmpegCommand,
}

/// Try strategies in order until one succeeds.
///
/// Each attempt's output is fully discarded (via `reset`) before the next
/// attempt runs, and a successful run must still pass `validate` to win;
/// an encoder exiting zero with a broken output directory is a failure.
///
/// Returns the name of the winning strategy. When every strategy fails the
/// error reports the attempt count and the last failure.
pub async fn try_strategies<C>(
    runner: &ProcessRunner,
    context_name: &str,
    strategies: &[Strategy<C>],
    ctx: &C,
    validate: impl Fn() -> MediaResult<()>,
    reset: impl Fn() -> MediaResult<()>,
) -> MediaResult<&'static str> {
    let mut last_error = String::from("no strategies configured");

    for strategy in strategies {
        reset()?;

        let cmd = (strategy.build)(ctx);
        let attempt = async {
            runner.run_ffmpeg(&cmd).await?;
            validate()
        };

        match attempt.await {
            Ok(()) => {
                info!(strategy = strategy.name, context = context_name, "Strategy succeeded");
                return Ok(strategy.name);
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name,
                    context = context_name,
                    error = %e,
                    "Strategy failed, falling through"
                );
                last_error = e.to_string();
            }
        }
    }

    Err(MediaError::StrategiesExhausted {
        context: context_name.to_string(),
        attempted: strategies.len(),
        last_error,
    })
}
