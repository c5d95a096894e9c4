use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive range of TCP ports the listener may claim.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct PortRange {
    min: u16,
    max: u16,
}

impl PortRange {
    /// Builds a range, rejecting inverted bounds.
    pub fn new(min: u16, max: u16) -> Result<Self, PortRangeError> {
        if min > max {
            return Err(PortRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lowest port in the range.
    #[must_use]
    pub const fn min(&self) -> u16 {
        self.min
    }

    /// Highest port in the range.
    #[must_use]
    pub const fn max(&self) -> u16 {
        self.max
    }

    /// Iterates the ports in scan order.
    #[must_use]
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.min..=self.max
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}-{}", self.min, self.max)
    }
}

impl FromStr for PortRange {
    type Err = PortRangeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (min, max) = input
            .split_once('-')
            .ok_or_else(|| PortRangeError::Syntax(input.to_owned()))?;
        let parse = |value: &str| {
            value
                .trim()
                .parse::<u16>()
                .map_err(|_| PortRangeError::Syntax(input.to_owned()))
        };
        Self::new(parse(min)?, parse(max)?)
    }
}

/// Errors raised when building a [`PortRange`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortRangeError {
    /// The lower bound exceeds the upper bound.
    #[error("port range {min}-{max} is inverted")]
    Inverted { min: u16, max: u16 },
    /// Text did not follow the `min-max` form.
    #[error("expected a port range like '4501-4600', got '{0}'")]
    Syntax(String),
}
