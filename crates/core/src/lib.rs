//! Blueprint core: value types, the blueprint/mask model, static validation and
//! the effective blueprint calculation.

#![forbid(unsafe_code)]

pub mod blueprint;
pub mod component;
pub mod config;
pub mod dogu;
pub mod effective;
pub mod error;
pub mod name;
pub mod quantity;
pub mod version;

pub use blueprint::{Blueprint, BlueprintMask, MaskDogu};
pub use component::{Component, DeployConfig};
pub use config::{Config, ConfigEntry, ConfigMapRef, SecretRef};
pub use dogu::{AdditionalMount, Dogu, MountSourceType, ReverseProxyConfig};
pub use effective::EffectiveBlueprint;
pub use error::{AggregateError, Problems, ValidationError};
pub use name::{Namespace, QualifiedName, SimpleName};
pub use quantity::{Quantity, UnitFamily};
pub use version::{ComponentVersion, DoguVersion};

use metrics::counter;
use tracing::warn;

pub mod prelude {
    pub use super::{
        AdditionalMount, Blueprint, BlueprintMask, Component, ComponentVersion, Config, ConfigEntry, DeployConfig, Dogu,
        DoguVersion, EffectiveBlueprint, MaskDogu, MountSourceType, QualifiedName, Quantity, ReverseProxyConfig, SimpleName,
    };
}

/// Validate blueprint and mask independently, then the mask against the
/// blueprint. Never short-circuits: the error carries every problem found.
pub fn validate_statically(blueprint: &Blueprint, mask: &BlueprintMask, allow_namespace_switch: bool) -> Result<(), AggregateError> {
    let mut errors = Vec::new();
    if let Err(e) = blueprint.validate() { errors.push(e); }
    if let Err(e) = mask.validate() { errors.push(e); }
    if let Err(e) = mask.validate_against(blueprint, allow_namespace_switch) { errors.push(e); }
    let res = AggregateError::from_errors(errors);
    if let Err(e) = &res {
        counter!("blueprint_validation_failures_total", 1u64);
        warn!(errors = e.errors().len(), "blueprint failed static validation");
    }
    res
}
