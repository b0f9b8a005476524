//! Shared load/persist helpers for the JSON stores

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use towcheck_types::{Result, StoreError};

/// Read a store file, or the empty value when it does not exist yet
pub(crate) fn load<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        StoreError::Corrupted(format!("{}: {}", path.display(), e)).into()
    })
}

/// Write the store through a sibling temp file so a crash never leaves
/// half a document behind
fn persist<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Apply `change` to a copy of the in-memory store and keep the copy only
/// once it has been written
pub(crate) fn commit<T, R>(
    path: &Path,
    current: &mut T,
    change: impl FnOnce(&mut T) -> R,
) -> Result<R>
where
    T: Serialize + Clone,
{
    let mut next = current.clone();
    let outcome = change(&mut next);
    persist(path, &next)?;
    *current = next;
    Ok(outcome)
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Poisoned(store.to_string()).into())
}
