// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Error types for recoverable simulation failures
//!
//! Programmer errors (illegal component add/remove timing, mismatched clone
//! shapes, out-of-range animation indices) are assertions and never show up
//! here. `SimError` only covers conditions a caller can reasonably react to.

use crate::scene::ObjectId;
use thiserror::Error;

/// Errors produced by configuration loading and scene registration
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration values failed validation
    #[error("invalid simulation config: {0}")]
    Config(String),

    /// Configuration text could not be parsed
    #[error("failed to parse simulation config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("failed to read simulation config: {0}")]
    Io(#[from] std::io::Error),

    /// A component returned `false` from `on_register`
    #[error("component '{component}' vetoed registration")]
    RegistrationVetoed {
        /// Type name of the vetoing component
        component: &'static str,
    },

    /// The id does not refer to a live object
    #[error("{0} is not a live scene object")]
    UnknownObject(ObjectId),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;
