//! Name-keyed lookup of the specialists a supervisor can route to

use super::types::SubAgent;
use crate::errors::CoordError;
use dashmap::DashMap;
use std::sync::Arc;

/// Specialists the supervisor can route to, by name.
///
/// A registered specialist whose backend is missing stays listed, so the
/// supervisor can still route to it and get a "not available" answer back.
#[derive(Default)]
pub struct SpecialistRegistry {
    agents: DashMap<String, Arc<dyn SubAgent>>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Arc<dyn SubAgent>) {
        let name = agent.name().to_string();
        if self.contains(&name) {
            log::warn!("[ROUTER] Replaced specialist '{}'", name);
        } else {
            log::info!("[ROUTER] Registered specialist '{}'", name);
        }
        self.agents.insert(name, agent);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// `(name, domain)` pairs sorted by name
    pub fn domains(&self) -> Vec<(String, String)> {
        let mut domains: Vec<(String, String)> = self
            .agents
            .iter()
            .map(|e| (e.key().clone(), e.value().domain().to_string()))
            .collect();
        domains.sort();
        domains
    }

    /// Look up a specialist that is ready to run
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn SubAgent>, CoordError> {
        let agent = self
            .agents
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| CoordError::UnknownRoute(name.to_string()))?;

        agent
            .availability()
            .map_err(|reason| CoordError::UnavailableCapability(name.to_string(), reason))?;

        Ok(agent)
    }
}
