use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "queues_with_proxy",
        "Send and receive over AMQP through an HTTP proxy",
        &[
            SampleOption::ConnectionString.required(),
            SampleOption::ProxyHost.required(),
            SampleOption::ProxyPort.required(),
        ],
        sbsamples::queues::with_proxy::run,
    )
}
