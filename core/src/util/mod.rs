mod chunk_queue;
mod exit_status;

pub use chunk_queue::ChunkQueue;
pub use exit_status::exit_code_of;
