use std::io::{BufRead, Write};

use log::info;

use crate::error::Result;
use crate::train::monitor::TrainerMonitor;

/// Serves `status` and `stop` commands read line by line from `input`.
///
/// Returns after a stop command or at end of input; the search itself keeps
/// running in the latter case.
pub fn supervise<R: BufRead, W: Write>(monitor: &TrainerMonitor, input: R, mut out: W) -> Result<()> {
    for line in input.lines() {
        match line?.trim() {
            "" => continue,
            "status" | "s" => write_status(monitor, &mut out)?,
            "stop" | "q" => {
                info!("stop requested from supervisor");
                monitor.request_stop();
                writeln!(out, "stopping after the current iteration")?;
                out.flush()?;
                return Ok(());
            }
            other => writeln!(out, "unknown command `{other}`; try `status` or `stop`")?,
        }
        out.flush()?;
    }
    Ok(())
}

fn write_status<W: Write>(monitor: &TrainerMonitor, out: &mut W) -> Result<()> {
    let per_thread = monitor.iterations_by_thread();
    writeln!(
        out,
        "{} | {:.1}s elapsed | {} seeds over {} workers | best {}",
        if monitor.is_running() { "running" } else { "idle" },
        monitor.elapsed().as_secs_f64(),
        per_thread.iter().sum::<u64>(),
        per_thread.len(),
        monitor.best_value()
    )?;
    Ok(())
}
