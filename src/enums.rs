// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::traits::SummaryError;

/// Enumeration of the summary structures maintained by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryType {
    Reservoir,
    Block,
    Stratified,
    CountMin,
    HyperLogLog,
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryType::Reservoir => write!(f, "Reservoir"),
            SummaryType::Block => write!(f, "Block"),
            SummaryType::Stratified => write!(f, "Stratified"),
            SummaryType::CountMin => write!(f, "CountMin"),
            SummaryType::HyperLogLog => write!(f, "HyperLogLog"),
        }
    }
}

impl FromStr for SummaryType {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace(['_', '-'], "").to_lowercase().as_str() {
            "reservoir" => Ok(SummaryType::Reservoir),
            "block" => Ok(SummaryType::Block),
            "stratified" => Ok(SummaryType::Stratified),
            "countmin" => Ok(SummaryType::CountMin),
            "hyperloglog" => Ok(SummaryType::HyperLogLog),
            _ => Err(SummaryError::InvalidInput(format!(
                "Unknown summary type: {}",
                s
            ))),
        }
    }
}
