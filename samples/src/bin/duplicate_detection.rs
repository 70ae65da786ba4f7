use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "duplicate_detection",
        "Send a duplicate message to DupdetectQueue",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::duplicate_detection::run,
    )
}
