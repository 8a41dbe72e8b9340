pub mod blob;
pub mod conversion;
pub mod orchestrator;
pub mod retention;

pub use blob::BlobService;
pub use conversion::ConversionService;
pub use orchestrator::{secure_filename, ConvertService, Upload};
pub use retention::{RetentionSweeper, SweepReport, SweeperHandle};
