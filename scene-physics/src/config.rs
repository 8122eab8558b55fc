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
//! Simulation configuration
//!
//! Every tuning constant of the physics loop lives here and is passed to the
//! simulation at construction time. Configurations can be built in code or
//! loaded from TOML:
//!
//! ```toml
//! max_iterations = 5
//! collision_epsilon = 0.0005
//!
//! [default_material]
//! friction = 0.2
//! restitution = 0.5
//! ```

use crate::collision::CollisionMaterial;
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning constants for the simulation core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum swept iterations per object per tick
    pub max_iterations: u32,
    /// Contacts closer in time than this are treated as simultaneous
    pub collision_epsilon: f32,
    /// Time subtracted from a positive time of impact before moving
    pub impact_backoff: f32,
    /// Velocities below this magnitude count as at rest
    pub at_rest_epsilon: f32,
    /// Border added around the swept search box
    pub search_border: f32,
    /// Smallest mass a movable body may have
    pub minimum_mass: f32,
    /// Mass reported for immovable bodies
    pub immovable_mass: f32,
    /// Upper clamp for the derived inverse rotational inertia
    pub max_inverse_inertia: f32,
    /// Cell size of the broad-phase grid
    pub grid_cell_size: f32,
    /// Material used when an image defines none
    pub default_material: CollisionMaterial,
    /// Seed for animation random starts
    pub animation_seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            max_iterations: 5,
            collision_epsilon: 0.0005,
            impact_backoff: 0.001,
            at_rest_epsilon: 0.0001,
            search_border: 0.01,
            minimum_mass: 0.01,
            immovable_mass: 1.0e10,
            max_inverse_inertia: 1.0e10,
            grid_cell_size: 32.0,
            default_material: CollisionMaterial::default(),
            animation_seed: 0x5eed,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration for values the simulation cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SimError::Config("max_iterations must be at least 1".to_string()));
        }
        let positive = [
            ("collision_epsilon", self.collision_epsilon),
            ("minimum_mass", self.minimum_mass),
            ("immovable_mass", self.immovable_mass),
            ("max_inverse_inertia", self.max_inverse_inertia),
            ("grid_cell_size", self.grid_cell_size),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SimError::Config(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("impact_backoff", self.impact_backoff),
            ("at_rest_epsilon", self.at_rest_epsilon),
            ("search_border", self.search_border),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(SimError::Config(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }
        if !self.default_material.is_valid() {
            return Err(SimError::Config(
                "default_material friction and restitution must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
