use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "scheduled_messages",
        "Schedule messages on BasicQueue for later delivery",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::scheduled::run,
    )
}
