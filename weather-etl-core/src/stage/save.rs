use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    clock::Clock,
    error::{MissingDataError, PersistError, StageError},
    model::NormalizedWeatherRecord,
    stage::TaskId,
};

/// Write `record` as pretty JSON to `output_dir/weather_<YYYYMMDD_HHMMSS>.json`.
///
/// The directory is created if needed. The JSON is written to a temporary file
/// first and only renamed into place once complete, so a failed write leaves
/// nothing behind. Existing files are never replaced: a same-second collision
/// gets a `_1`, `_2`, ... suffix instead. Returns the absolute path of the new
/// file.
pub fn persist(
    record: Option<&NormalizedWeatherRecord>,
    output_dir: &Path,
    clock: &dyn Clock,
) -> Result<PathBuf, StageError> {
    tracing::info!(output_dir = %output_dir.display(), "Starting weather save task");

    let Some(record) = record else {
        let err = MissingDataError {
            upstream: TaskId::TransformWeather,
        };
        tracing::error!(error = %err, "Cannot save weather data");
        return Err(err.into());
    };

    match write_record(record, output_dir, clock) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "Weather data successfully saved");
            Ok(path)
        }
        Err(err) => {
            tracing::error!(error = %err, "Error saving weather data");
            Err(err.into())
        }
    }
}

fn write_record(
    record: &NormalizedWeatherRecord,
    output_dir: &Path,
    clock: &dyn Clock,
) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(output_dir).map_err(|source| PersistError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let dir = std::path::absolute(output_dir).map_err(|source| PersistError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let contents = serde_json::to_vec_pretty(record).map_err(PersistError::Serialize)?;
    let stamp = clock.now().format("%Y%m%d_%H%M%S").to_string();

    place_file(&dir, &stamp, |file| file.write_all(&contents))
}

/// Fill a temporary file in `dir`, then move it to the first free
/// `weather_<stamp>[_N].json` name. The temporary file is removed on failure.
fn place_file<F>(dir: &Path, stamp: &str, fill: F) -> Result<PathBuf, PersistError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut tmp = NamedTempFile::new_in(dir).map_err(|source| PersistError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    fill(tmp.as_file_mut()).map_err(|source| PersistError::Write {
        path: tmp.path().to_path_buf(),
        source,
    })?;

    let mut attempt = 0u32;
    loop {
        let path = dir.join(file_name(stamp, attempt));
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::warn!(path = %path.display(), "Weather file already exists, picking a new name");
                tmp = e.file;
                attempt += 1;
            }
            Err(e) => {
                return Err(PersistError::Write {
                    path,
                    source: e.error,
                });
            }
        }
    }
}

fn file_name(stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("weather_{stamp}.json")
    } else {
        format!("weather_{stamp}_{attempt}.json")
    }
}
