//! Small helper macros

/// Get a timestamp some number of seconds from now
#[macro_export]
macro_rules! from_now {
    ($seconds:expr) => {
        chrono::Utc::now() + chrono::Duration::seconds($seconds)
    };
}
