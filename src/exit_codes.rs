use crate::client::{OperatorError, SessionError};
use crate::cloud::CloudError;
use crate::pkw::PkwError;
use std::process::ExitCode;

pub const EXIT_USAGE: u8 = 64;
pub const EXIT_IO: u8 = 2;
pub const EXIT_SOFTWARE: u8 = 1;

pub fn exit_code_for_operator_error(error: &OperatorError) -> ExitCode {
    use OperatorError::*;

    match error {
        Pkw(PkwError::IllegalTag(_)) => ExitCode::from(EXIT_USAGE),
        Pkw(_) => ExitCode::from(EXIT_SOFTWARE),
        Provider(_) => ExitCode::from(EXIT_USAGE),
        Cloud(CloudError::NotFound(_)) => ExitCode::from(EXIT_USAGE),
        Cloud(_) => ExitCode::from(EXIT_IO),
        Malformed(_) => ExitCode::from(EXIT_SOFTWARE),
    }
}

pub fn exit_code_for_session_error(error: &SessionError) -> ExitCode {
    use SessionError::*;

    match error {
        SettingsDirUnavailable | StoreDirUnavailable | Io(_) => ExitCode::from(EXIT_IO),
        MalformedProperties | MalformedTable | Encoding(_) | Crypto(_) | Pkw(_) => {
            ExitCode::from(EXIT_SOFTWARE)
        }
        Operator(inner) => exit_code_for_operator_error(inner),
    }
}
