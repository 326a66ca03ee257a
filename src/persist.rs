//! JSON file persistence shared by the sticky and history stores.
//!
//! Load-all / overwrite-all. Writes go to `<file>.json.tmp`, are flushed to
//! disk, then renamed over the target so an interrupted write never leaves a
//! truncated store behind.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Load a JSON document. A missing file is an empty collection, not an error.
pub(crate) fn load_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with the JSON encoding of `value`.
pub(crate) fn write_json_atomic<T>(path: &Path, what: &'static str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let json =
        serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode { what, source })?;
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = fs::File::create(&tmp).map_err(write_err)?;
        f.write_all(&json).map_err(write_err)?;
        f.sync_all().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_blank_files_load_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nope.json");
        let v: Vec<u32> = load_json(&p).unwrap();
        assert!(v.is_empty());

        fs::write(&p, "  \n").unwrap();
        let v: Vec<u32> = load_json(&p).unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.json");
        fs::write(&p, "[1, 2,").unwrap();
        let err = load_json::<Vec<u32>>(&p).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn atomic_write_round_trips_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("values.json");
        write_json_atomic(&p, "values", &vec![1u32, 2, 3]).unwrap();
        let v: Vec<u32> = load_json(&p).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
        assert!(!p.with_extension("json.tmp").exists());
    }

    #[test]
    fn write_into_a_file_path_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let p = blocker.join("values.json");
        let err = write_json_atomic(&p, "values", &vec![1u32]).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
