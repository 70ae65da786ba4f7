use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "tutorial_topic_filters",
        "Route store orders to filtered subscriptions",
        &[
            SampleOption::ConnectionString.required(),
            SampleOption::Topic.with_default("TopicFilterSampleTopic"),
        ],
        sbsamples::topics::tutorial_filters::run,
    )
}
