//! `AUTOTUNE_TMC` command parsing and validation.
//!
//! Grammar: `NAME KEY=VALUE ...`. The command name and keys are
//! case-insensitive, values are not. Every supplied knob is checked against
//! its declared bounds before anything is applied, so a rejected command
//! leaves the stored parameters untouched.

use autotune_common::tuning::{
    Bounds, EXTRA_HYSTERESIS, OVERVOLTAGE_VTH, RangeError, SG4_THRS, SGT, STEALTH,
    STEALTH_AND_SPREAD, TBL, TOFF, TuningParameters, VOLTAGE,
};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Name of the re-tune command.
pub const COMMAND_NAME: &str = "AUTOTUNE_TMC";

/// Help text shown next to the command.
pub const COMMAND_HELP: &str = "Apply autotuning configuration to TMC stepper driver";

const PARAMETERS: [&str; 10] = [
    "STEPPER",
    "STEALTH",
    "STEALTH_AND_SPREAD",
    "EXTRA_HYSTERESIS",
    "TBL",
    "TOFF",
    "SGT",
    "SG4_THRS",
    "VOLTAGE",
    "OVERVOLTAGE_VTH",
];

/// Command parsing and validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Blank line.
    #[error("Empty command")]
    Empty,

    /// Command name is not `AUTOTUNE_TMC`.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Token is not `KEY=VALUE`.
    #[error("Malformed parameter '{0}', expected KEY=VALUE")]
    Malformed(String),

    /// Required parameter absent.
    #[error("Missing parameter {0}")]
    MissingParameter(&'static str),

    /// Value does not parse as the parameter's type.
    #[error("Invalid value '{value}' for parameter {parameter}")]
    InvalidValue {
        /// Parameter name.
        parameter: &'static str,
        /// Value as given.
        value: String,
    },

    /// Parameter not understood by the command.
    #[error("Unknown parameter {0}")]
    UnknownParameter(String),

    /// No autotuner is registered for the stepper.
    #[error("No TMC autotuning configured for stepper '{0}'")]
    UnknownStepper(String),

    /// Knob outside its declared range.
    #[error(transparent)]
    OutOfRange(#[from] RangeError),
}

/// Tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Upper-cased command name.
    pub name: String,
    /// Parameters keyed by upper-cased name.
    pub params: BTreeMap<String, String>,
}

impl ParsedCommand {
    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Split a command line into name and parameters.
///
/// # Errors
/// `CommandError::Empty` for a blank line, `CommandError::Malformed` for a
/// token without `=` or with an empty side.
pub fn parse_line(line: &str) -> Result<ParsedCommand, CommandError> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().ok_or(CommandError::Empty)?.to_ascii_uppercase();

    let mut params = BTreeMap::new();
    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .ok_or_else(|| CommandError::Malformed(token.to_string()))?;
        params.insert(key.to_ascii_uppercase(), value.to_string());
    }

    Ok(ParsedCommand { name, params })
}

/// A validated `AUTOTUNE_TMC` request. `None` knobs keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutotuneCommand {
    /// Target stepper.
    pub stepper: String,
    /// `STEALTH`.
    pub stealth: Option<bool>,
    /// `STEALTH_AND_SPREAD`.
    pub stealth_and_spread: Option<bool>,
    /// `EXTRA_HYSTERESIS`.
    pub extra_hysteresis: Option<u8>,
    /// `TBL`.
    pub tbl: Option<u8>,
    /// `TOFF`.
    pub toff: Option<u8>,
    /// `SGT`.
    pub sgt: Option<i8>,
    /// `SG4_THRS`.
    pub sg4_thrs: Option<u8>,
    /// `VOLTAGE`.
    pub voltage: Option<f64>,
    /// `OVERVOLTAGE_VTH`.
    pub overvoltage_vth: Option<f64>,
}

impl AutotuneCommand {
    /// Parse and validate a full command line.
    ///
    /// # Errors
    /// Any `CommandError`; see [`parse_line`] and [`AutotuneCommand::from_parsed`].
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        Self::from_parsed(&parse_line(line)?)
    }

    /// Validate a tokenized command.
    ///
    /// # Errors
    /// `UnknownCommand`, `UnknownParameter`, `MissingParameter` for an absent
    /// `STEPPER`, `InvalidValue` for unparsable values and `OutOfRange` for
    /// the first knob outside its bounds.
    pub fn from_parsed(parsed: &ParsedCommand) -> Result<Self, CommandError> {
        if parsed.name != COMMAND_NAME {
            return Err(CommandError::UnknownCommand(parsed.name.clone()));
        }
        if let Some(key) = parsed.params.keys().find(|key| !PARAMETERS.contains(&key.as_str())) {
            return Err(CommandError::UnknownParameter(key.clone()));
        }
        let stepper = parsed
            .get("STEPPER")
            .ok_or(CommandError::MissingParameter("STEPPER"))?
            .to_string();

        Ok(Self {
            stepper,
            stealth: flag(parsed, "STEALTH", &STEALTH)?,
            stealth_and_spread: flag(parsed, "STEALTH_AND_SPREAD", &STEALTH_AND_SPREAD)?,
            extra_hysteresis: int(parsed, "EXTRA_HYSTERESIS", &EXTRA_HYSTERESIS)?,
            tbl: int(parsed, "TBL", &TBL)?,
            toff: int(parsed, "TOFF", &TOFF)?,
            sgt: int(parsed, "SGT", &SGT)?,
            sg4_thrs: int(parsed, "SG4_THRS", &SG4_THRS)?,
            voltage: float(parsed, "VOLTAGE", &VOLTAGE)?,
            overvoltage_vth: float(parsed, "OVERVOLTAGE_VTH", &OVERVOLTAGE_VTH)?,
        })
    }

    /// Whether the command changes no knob.
    pub fn is_retune_only(&self) -> bool {
        *self
            == Self {
                stepper: self.stepper.clone(),
                ..Self::default()
            }
    }

    /// Overwrite every supplied knob in `params`.
    pub fn apply_to(&self, params: &mut TuningParameters) {
        if let Some(stealth_and_spread) = self.stealth_and_spread {
            params.stealth_and_spread = stealth_and_spread;
        }
        if let Some(stealth) = self.stealth {
            params.stealth = stealth;
        }
        if let Some(extra) = self.extra_hysteresis {
            params.extra_hysteresis = extra;
        }
        if let Some(tbl) = self.tbl {
            params.tbl = tbl;
        }
        if let Some(toff) = self.toff {
            params.toff = toff;
        }
        if let Some(sgt) = self.sgt {
            params.sgt = sgt;
        }
        if let Some(sg4_thrs) = self.sg4_thrs {
            params.sg4_thrs = sg4_thrs;
        }
        if let Some(voltage) = self.voltage {
            params.voltage = voltage;
        }
        if let Some(vth) = self.overvoltage_vth {
            params.overvoltage_vth = Some(vth);
        }
    }
}

fn parse_value<T: FromStr>(parsed: &ParsedCommand, key: &'static str) -> Result<Option<T>, CommandError> {
    parsed
        .get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| CommandError::InvalidValue {
                parameter: key,
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn int<U: TryFrom<i64>>(
    parsed: &ParsedCommand,
    key: &'static str,
    bounds: &Bounds<i64>,
) -> Result<Option<U>, CommandError> {
    match parse_value::<i64>(parsed, key)? {
        Some(value) => Ok(Some(bounds.narrow(value)?)),
        None => Ok(None),
    }
}

fn flag(parsed: &ParsedCommand, key: &'static str, bounds: &Bounds<i64>) -> Result<Option<bool>, CommandError> {
    Ok(int::<u8>(parsed, key, bounds)?.map(|value| value == 1))
}

fn float(parsed: &ParsedCommand, key: &'static str, bounds: &Bounds<f64>) -> Result<Option<f64>, CommandError> {
    match parse_value::<f64>(parsed, key)? {
        Some(value) if value.is_nan() => Err(CommandError::InvalidValue {
            parameter: key,
            value: value.to_string(),
        }),
        Some(value) => Ok(Some(bounds.check(value)?)),
        None => Ok(None),
    }
}
