use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "topic_filters",
        "Route orders to subscriptions with SQL and correlation filters",
        &[SampleOption::ConnectionString.required()],
        sbsamples::topics::filters::run,
    )
}
