//! Engine options settable through `setoption`.

use std::io::{self, Write};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("invalid value '{value}' for option {name}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Spin { default: i64, min: i64, max: i64 },
    Check { default: bool },
    String { default: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
}

pub const HASH: OptionSpec = OptionSpec {
    name: "Hash",
    kind: OptionKind::Spin { default: 16, min: 1, max: 2048 },
};
pub const OWN_BOOK: OptionSpec = OptionSpec {
    name: "OwnBook",
    kind: OptionKind::Check { default: false },
};
pub const PONDER: OptionSpec = OptionSpec {
    name: "Ponder",
    kind: OptionKind::Check { default: true },
};
pub const ANALYSE_MODE: OptionSpec = OptionSpec {
    name: "UCI_AnalyseMode",
    kind: OptionKind::Check { default: false },
};
pub const STRENGTH: OptionSpec = OptionSpec {
    name: "Strength",
    kind: OptionKind::Spin { default: 1000, min: 0, max: 1000 },
};
pub const RANDOM_SEED: OptionSpec = OptionSpec {
    name: "RandomSeed",
    kind: OptionKind::String { default: "0" },
};
pub const PONDER_SINGLE_MOVE: OptionSpec = OptionSpec {
    name: "PonderSingleMove",
    kind: OptionKind::Check { default: true },
};

/// Every recognised option, in the order they are advertised.
pub const OPTIONS: [OptionSpec; 7] = [
    HASH,
    OWN_BOOK,
    PONDER,
    ANALYSE_MODE,
    STRENGTH,
    RANDOM_SEED,
    PONDER_SINGLE_MOVE,
];

/// Write one `option name ...` line per recognised option.
pub fn print_options(out: &mut impl Write) -> io::Result<()> {
    for spec in OPTIONS {
        match spec.kind {
            OptionKind::Spin { default, min, max } => writeln!(
                out,
                "option name {} type spin default {default} min {min} max {max}",
                spec.name
            )?,
            OptionKind::Check { default } => {
                writeln!(out, "option name {} type check default {default}", spec.name)?
            }
            OptionKind::String { default } => {
                writeln!(out, "option name {} type string default {default}", spec.name)?
            }
        }
    }
    Ok(())
}

/// Option values that took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionChange {
    Hash(usize),
    OwnBook(bool),
    Ponder(bool),
    AnalyseMode(bool),
    Strength(u32),
    RandomSeed(u64),
    PonderSingleMove(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub hash_mb: usize,
    /// Accepted so GUIs can set it; the engine has no opening book and the
    /// search ignores it.
    pub own_book: bool,
    pub ponder: bool,
    pub analyse_mode: bool,
    /// 0..=1000, 1000 is full strength
    pub strength: u32,
    /// 0 draws a fresh seed for every game
    pub random_seed: u64,
    /// Run the search while pondering a position with a single legal reply
    pub ponder_single_move: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: 16,
            own_book: false,
            ponder: true,
            analyse_mode: false,
            strength: 1000,
            random_seed: 0,
            ponder_single_move: true,
        }
    }
}

fn parse_spin(spec: OptionSpec, value: &str) -> Result<i64, OptionError> {
    let OptionKind::Spin { min, max, .. } = spec.kind else {
        unreachable!("{} is not a spin option", spec.name)
    };
    value
        .trim()
        .parse::<i64>()
        .map(|v| v.clamp(min, max))
        .map_err(|_| OptionError::InvalidValue {
            name: spec.name,
            value: value.to_string(),
        })
}

fn parse_check(spec: OptionSpec, value: &str) -> Result<bool, OptionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(OptionError::InvalidValue {
            name: spec.name,
            value: value.to_string(),
        }),
    }
}

impl EngineOptions {
    /// Apply `setoption`. Names match case-insensitively and numbers are
    /// clamped to range. Unknown names give `Ok(None)`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<Option<OptionChange>, OptionError> {
        let Some(spec) = OPTIONS.iter().find(|s| s.name.eq_ignore_ascii_case(name.trim())) else {
            return Ok(None);
        };
        let change = match spec.name {
            "Hash" => {
                self.hash_mb = parse_spin(HASH, value)? as usize;
                OptionChange::Hash(self.hash_mb)
            }
            "OwnBook" => {
                self.own_book = parse_check(OWN_BOOK, value)?;
                OptionChange::OwnBook(self.own_book)
            }
            "Ponder" => {
                self.ponder = parse_check(PONDER, value)?;
                OptionChange::Ponder(self.ponder)
            }
            "UCI_AnalyseMode" => {
                self.analyse_mode = parse_check(ANALYSE_MODE, value)?;
                OptionChange::AnalyseMode(self.analyse_mode)
            }
            "Strength" => {
                self.strength = parse_spin(STRENGTH, value)? as u32;
                OptionChange::Strength(self.strength)
            }
            "RandomSeed" => {
                self.random_seed =
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| OptionError::InvalidValue {
                            name: RANDOM_SEED.name,
                            value: value.to_string(),
                        })?;
                OptionChange::RandomSeed(self.random_seed)
            }
            _ => {
                self.ponder_single_move = parse_check(PONDER_SINGLE_MOVE, value)?;
                OptionChange::PonderSingleMove(self.ponder_single_move)
            }
        };
        Ok(Some(change))
    }

    /// Bring values read from elsewhere (config files) into range.
    pub fn clamped(mut self) -> Self {
        self.hash_mb = self.hash_mb.clamp(1, 2048);
        self.strength = self.strength.min(1000);
        self
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod options_tests;
