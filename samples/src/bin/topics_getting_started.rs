use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "topics_getting_started",
        "Publish to BasicTopic and receive on three subscriptions",
        &[SampleOption::ConnectionString.required()],
        sbsamples::topics::getting_started::run,
    )
}
