//! Bounded capture of child process output.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Bytes buffered per stream while the process runs. Anything beyond is drained.
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Bytes kept per stream in the final result.
pub const MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Appended to output cut at [`MAX_OUTPUT_BYTES`].
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Read a stream to EOF, keeping at most [`MAX_CAPTURE_BYTES`].
///
/// The pipe keeps being drained past the cap so the child never blocks on a
/// full pipe.
pub(crate) async fn read_capped<R>(stream: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(Vec::new());
    };

    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = MAX_CAPTURE_BYTES.saturating_sub(captured.len());
        captured.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok(captured)
}

/// Decode captured bytes. Empty output becomes `None`.
pub(crate) fn decode_output(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    Some(truncate_output(String::from_utf8_lossy(bytes).into_owned()))
}

/// Cut `output` to [`MAX_OUTPUT_BYTES`] on a char boundary and append the marker.
pub fn truncate_output(mut output: String) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output;
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    output.truncate(end);
    output.push_str(TRUNCATION_MARKER);
    output
}
