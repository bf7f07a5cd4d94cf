//! Checked line reads

use super::signatures::SignatureTable;
use super::transport::Transport;
use crate::error::{Error, Result};

/// Read one engine line, log it, and fail on a fatal signature
///
/// A closed pipe surfaces as [`Error::EngineTerminated`].
pub async fn read_checked_line<T>(transport: &mut T, signatures: &SignatureTable) -> Result<String>
where
    T: Transport + ?Sized,
{
    let Some(line) = transport.read_line().await? else {
        debug!(target: "isodrive::engine", "<pipe closed>");
        return Err(Error::EngineTerminated);
    };
    debug!(target: "isodrive::engine", "{}", line);

    if let Some(fault) = signatures.classify(&line) {
        warn!(target: "isodrive::engine", ?fault, "engine reported a fault");
        return Err(fault.into());
    }
    Ok(line)
}
