//! Processing pipeline components.

mod coordinator;
mod processor;
mod service;

pub use coordinator::{
    ProcessCheck, ProcessOptions, collect_input_files, output_dir_for, output_path_for,
    should_process,
};
pub use processor::{BatchItem, ProcessResult, process_batch, process_file};
pub use service::{ClassificationService, ClassificationTicket, or_sentinel};
