use sbsamples::cli::{self, SampleOption};
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::launch(
        "managing_entity",
        "Create, update and delete a queue through the management plane",
        &cli::with_management_options(&[SampleOption::ConnectionString.required()]),
        sbsamples::management::managing_entity::run,
    )
}
