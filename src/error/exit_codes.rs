use crate::error::LockyardError;

pub fn get_exit_code(error: &LockyardError) -> i32 {
    match error {
        LockyardError::InvalidConfig(_)
        | LockyardError::ConfigError(_)
        | LockyardError::InvalidLockName(_) => 2,

        LockyardError::Backend(_) => 69, // EX_UNAVAILABLE

        LockyardError::Unrecoverable { .. } => 70, // EX_SOFTWARE

        LockyardError::LockContended { .. } => 75, // EX_TEMPFAIL

        LockyardError::CommandFailed(_) => 126,

        _ => 1,
    }
}
