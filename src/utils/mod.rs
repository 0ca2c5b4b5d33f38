/// Constants
pub mod constants;
/// Logger
pub mod logger;
/// Unit conversion
pub mod units;
