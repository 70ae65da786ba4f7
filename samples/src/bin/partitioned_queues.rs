use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "partitioned_queues",
        "Send partition-keyed messages to PartitionedQueue",
        &[SampleOption::ConnectionString.required()],
        sbsamples::queues::partitioned::run,
    )
}
