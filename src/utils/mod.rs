pub mod error;
pub mod formats;
pub mod fs;

pub use error::{JobError, PipelineError, PipelineResult};
pub use formats::{ImageFormat, format_from_path};
pub use fs::{file_size, write_atomic};
