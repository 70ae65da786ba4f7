use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "time_to_live",
        "Let messages expire into the dead-letter queue and resubmit them",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::time_to_live::run,
    )
}
