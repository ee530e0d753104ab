//! Filesystem helpers shared by the snapshot and output writers

use crate::error::{StepCacheError, StepCacheResult};
use std::path::Path;
use tokio::fs;

/// Replace `path` with `content` via a temporary sibling and a rename
pub async fn write_atomic(path: &Path, content: &[u8]) -> StepCacheResult<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content)
        .await
        .map_err(|e| StepCacheError::io(format!("writing {}", tmp.display()), e))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StepCacheError::io(
            format!("renaming {} to {}", tmp.display(), path.display()),
            e,
        ));
    }
    Ok(())
}
