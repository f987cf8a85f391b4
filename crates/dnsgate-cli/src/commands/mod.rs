pub mod decode;
pub mod lint;
pub mod validate;

use std::process::ExitCode;

/// Exit status for a clean result.
pub const EXIT_PASS: u8 = 0;

/// Exit status for a failing verdict or an invalid input.
pub const EXIT_FAIL: u8 = 1;

pub fn exit_code(pass: bool) -> ExitCode {
    ExitCode::from(if pass { EXIT_PASS } else { EXIT_FAIL })
}
