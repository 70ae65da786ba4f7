use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "sas_authorization",
        "Use Send and Listen authorization rules and a signed SAS token",
        &cli::with_management_options(&[SampleOption::ConnectionString.required()]),
        sbsamples::management::sas_authorization::run,
    )
}
