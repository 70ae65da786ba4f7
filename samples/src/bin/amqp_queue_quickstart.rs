use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "amqp_queue_quickstart",
        "Send and receive on a queue over a plain AMQP 1.0 connection",
        &[
            SampleOption::ConnectionString.required(),
            SampleOption::Queue.required(),
        ],
        sbsamples::amqp::queue_quickstart::run,
    )
}
