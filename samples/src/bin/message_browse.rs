use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "message_browse",
        "Peek at messages in BasicQueue without settling them",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::browse::run,
    )
}
