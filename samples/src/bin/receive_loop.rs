use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "receive_loop",
        "Receive from BasicQueue with an explicit receive loop",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::receive_loop::run,
    )
}
