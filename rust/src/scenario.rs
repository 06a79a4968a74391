//! Resource scenarios: variations of the resource list for what-if compiles.

use crate::error::CompilerError;
use crate::ids::Id;
use crate::models::ResourceSettings;

/// Produce one scenario per non-explicit resource.
///
/// Non-explicit resources are ranked by display order (then id). Scenario
/// `i` leaves the first `i` of them implicit and marks the rest explicit, so
/// scenario 0 has every resource explicit and each later scenario frees one
/// more resource. Resources that were already explicit stay explicit.
///
/// Every scenario is an independent copy of `settings`.
pub fn build_resource_scenarios(
    settings: &ResourceSettings,
) -> Result<Vec<ResourceSettings>, CompilerError> {
    let mut ranked: Vec<(i32, Id)> = settings
        .resources
        .iter()
        .filter(|r| !r.is_explicit_target)
        .map(|r| (r.display_order, r.id))
        .collect();
    if ranked.is_empty() {
        return Err(CompilerError::NoNonExplicitResources);
    }
    ranked.sort_unstable();

    let scenarios = (0..ranked.len())
        .map(|i| {
            let mut scenario = settings.clone();
            for (rank, (_, id)) in ranked.iter().enumerate() {
                if let Some(resource) = scenario.resources.iter_mut().find(|r| r.id == *id) {
                    resource.is_explicit_target = rank >= i;
                }
            }
            scenario
        })
        .collect();
    Ok(scenarios)
}

/// Builder form of [`build_resource_scenarios`], held over one settings value.
pub struct ResourceScenarioBuilder<'a> {
    settings: &'a ResourceSettings,
}

impl<'a> ResourceScenarioBuilder<'a> {
    pub fn new(settings: &'a ResourceSettings) -> Self {
        Self { settings }
    }

    pub fn build(&self) -> Result<Vec<ResourceSettings>, CompilerError> {
        build_resource_scenarios(self.settings)
    }
}
