use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "amqp_topic_quickstart",
        "Publish to a topic and receive from a subscription over plain AMQP 1.0",
        &[
            SampleOption::ConnectionString.required(),
            SampleOption::Topic.required(),
            SampleOption::Subscription.required(),
        ],
        sbsamples::amqp::topic_quickstart::run,
    )
}
