use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "queues_getting_started",
        "Send scientists to BasicQueue and receive them with a message pump",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::getting_started::run,
    )
}
