use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "amqp_interop",
        "Send over plain AMQP 1.0 and receive with the SDK",
        &[
            SampleOption::ConnectionString.required(),
            SampleOption::Queue.required(),
        ],
        sbsamples::amqp::interop::run,
    )
}
