use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "managing_topic_rules",
        "Create subscription rules and see which messages they match",
        &cli::with_management_options(&[
            SampleOption::ConnectionString.required(),
            SampleOption::Topic.with_default("TopicFilterSampleTopic"),
        ]),
        sbsamples::topics::managing_rules::run,
    )
}
