use std::time::Duration;

use encvisor_core::pipe::{Drained, PipeReader};
use tracing::{error, info};

/// Final drain after a quit; leftovers are logged rather than returned.
pub(crate) async fn drain_after_quit(reader: &mut PipeReader, flush_timeout: Duration) {
    reader.finish_within(flush_timeout).await;

    match reader.read_stdout() {
        Drained::Text(text) if !text.is_empty() => info!(stdout = %text.trim_end(), "final stdout"),
        Drained::Chunks(chunks) if !chunks.is_empty() => {
            let bytes: usize = chunks.iter().map(Vec::len).sum();
            info!(frames = chunks.len(), bytes, "final stdout frames discarded");
        }
        _ => {}
    }
    let stderr = reader.read_stderr();
    if !stderr.is_empty() {
        error!(stderr = %stderr.trim_end(), "final stderr");
    }
}
