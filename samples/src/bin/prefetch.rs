use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "prefetch",
        "Compare receive throughput with and without prefetch",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::prefetch::run,
    )
}
