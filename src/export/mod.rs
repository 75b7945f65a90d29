//! Export module - rendering the recorded path to a video file

mod sink;
mod video;

pub use video::{ExportError, ExportJob, ExportTask};
