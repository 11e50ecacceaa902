mod drainer;
mod reader;

pub use drainer::{Drained, PipeDrainer, ReadDiscipline};
pub use reader::PipeReader;
