use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "dead_letter_queue",
        "Dead-letter messages on BasicQueue and repair them from the dead-letter queue",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::dead_letter::run,
    )
}
