use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::WriteError;

/// Create (or truncate) `path` and write `content` to it.
///
/// Returns the number of bytes written. The file handle is dropped on every
/// return path.
pub async fn write_artifact(path: &Path, content: &[u8]) -> Result<usize, WriteError> {
    let wrap = |source: std::io::Error| WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).await.map_err(wrap)?;
    file.write_all(content).await.map_err(wrap)?;
    file.flush().await.map_err(wrap)?;
    Ok(content.len())
}
