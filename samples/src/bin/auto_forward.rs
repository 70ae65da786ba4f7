use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "auto_forward",
        "Forward messages from a topic subscription into a queue",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::auto_forward::run,
    )
}
