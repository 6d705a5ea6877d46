pub mod dumper;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod pack;
pub mod source;
pub mod verify;

mod serde_util;

pub use dumper::{LoadedPack, PckDumper};
pub use error::{DumpError, FailureReason, Result};
pub use extract::{ExtractEvent, ExtractFailure, ExtractReport, PackExtractBuilder};
pub use verify::{VerifyOutcome, verify_all};
