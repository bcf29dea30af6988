use std::process::ExitCode;

use bulkpush::ui::output;

fn main() -> ExitCode {
    match bulkpush::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
