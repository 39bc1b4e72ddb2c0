//! # Telecommand script interpreter module
//!
//! This module provides an interpreter for drive scripts, allowing telecommands to be executed at
//! fixed times without a driver station attached.
//!
//! A script is a list of `<time_s>: <tc json>;` lines, for example:
//!
//! ```text
//! 0.0: {"type": "ENABLE"};
//! 0.5: {"type": "DRIVE", "payload": {"vx": 0.5}};
//! 2.5: {"type": "DISABLE"};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug)]
struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_tcs` to
/// acquire a list of telecommands that need executing.
pub struct ScriptInterpreter {
    script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Could not build the script pattern: {0}")]
    PatternError(regex::Error),

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),
}

#[derive(Debug, PartialEq)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let cmds = parse_script(&script)?;

        Ok(ScriptInterpreter {
            script_path: path,
            cmds,
        })
    }

    /// Return the pending TCs at the given time since the start of the script.
    ///
    /// All TCs scheduled strictly before `current_time_s` are returned in script order.
    pub fn get_pending_tcs(&mut self, current_time_s: f64) -> PendingTcs {
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript;
        }

        let mut tc_vec: Vec<Tc> = vec![];

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s >= current_time_s {
                break;
            }

            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if !tc_vec.is_empty() {
            PendingTcs::Some(tc_vec)
        } else {
            PendingTcs::None
        }
    }

    /// Get the path to the script being run
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn parse_script(script: &str) -> Result<VecDeque<Command>, ScriptError> {
    let mut tc_queue: VecDeque<Command> = VecDeque::new();

    let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
        .multi_line(true)
        .build()
        .map_err(ScriptError::PatternError)?;

    for cap in re.captures_iter(script) {
        let (time_str, payload) = match (cap.get(1), cap.get(3)) {
            (Some(t), Some(p)) => (t.as_str(), p.as_str()),
            _ => continue,
        };

        let exec_time_s: f64 = time_str
            .parse()
            .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

        let tc = Tc::from_json(payload).map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

        tc_queue.push_back(Command { exec_time_s, tc });
    }

    if tc_queue.is_empty() {
        return Err(ScriptError::ScriptEmpty);
    }

    Ok(tc_queue)
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
        0.0: {"type": "ENABLE"};
        0.5: {"type": "DRIVE", "payload": {"vx": 0.5}};
        0.5: {"type": "ZERO_GYRO"};
        2.0: {"type": "DISABLE"};
    "#;

    #[test]
    fn test_pending_tcs() {
        let mut si = ScriptInterpreter {
            script_path: PathBuf::new(),
            cmds: parse_script(SCRIPT).unwrap(),
        };

        assert_eq!(si.get_num_tcs(), 4);
        assert_eq!(si.get_duration(), 2.0);

        assert_eq!(si.get_pending_tcs(0.01), PendingTcs::Some(vec![Tc::Enable]));
        assert_eq!(si.get_pending_tcs(0.02), PendingTcs::None);

        match si.get_pending_tcs(1.0) {
            PendingTcs::Some(tcs) => {
                assert_eq!(tcs.len(), 2);
                assert_eq!(tcs[1], Tc::ZeroGyro);
            }
            p => panic!("Expected two TCs, got {:?}", p),
        }

        assert_eq!(si.get_pending_tcs(2.5), PendingTcs::Some(vec![Tc::Disable]));
        assert_eq!(si.get_pending_tcs(3.0), PendingTcs::EndOfScript);
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(parse_script("nothing here"), Err(ScriptError::ScriptEmpty)));
        assert!(matches!(
            parse_script(r#"1.0: {"type": "FLY"};"#),
            Err(ScriptError::InvalidTc(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.tc"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
