//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (SWERVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$SWERVE_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    load_from(params_dir()?.join(param_file_path))
}

/// Load a parameter file from an explicit path.
pub fn load_from<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    // Parse the string into the parameter struct
    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

/// Resolve a path relative to the parameters directory.
///
/// Used for non-TOML resources that live next to the parameter files, such as the field layout.
pub fn params_dir() -> Result<PathBuf, LoadError> {
    let mut path = crate::host::get_swerve_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Deserialize)]
    struct TestParams {
        max_speed_ms: f64,
        positions: Vec<[f64; 2]>,
    }

    #[test]
    fn test_load_from() {
        let path = std::env::temp_dir().join("swerve_util_params_test.toml");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "max_speed_ms = 4.0").unwrap();
            writeln!(f, "positions = [[0.3, 0.3], [0.3, -0.3]]").unwrap();
        }

        let p: TestParams = load_from(&path).unwrap();
        assert_eq!(p.max_speed_ms, 4.0);
        assert_eq!(p.positions[1], [0.3, -0.3]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing() {
        let res: Result<TestParams, _> = load_from("/definitely/not/a/params/file.toml");
        assert!(matches!(res, Err(LoadError::FileLoadError(_))));
    }
}
