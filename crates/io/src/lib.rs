//! Report rendering and input file reading for `auditrec`.

pub mod csv;
pub mod error;
pub mod report;
pub mod source;
pub mod xlsx;

pub use error::ReportError;
pub use report::ExceptionReport;
