#![forbid(unsafe_code)]

use crate::error::ServiceError;
use crate::ports::TerritoryStore;
use cm_core::{Territory, TerritoryId, TerritoryProgress, Toggle, VisitSet};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToggleOutcome {
    pub toggle: Toggle,
    pub sub_area_id: u32,
    /// Authoritative set after the flip; callers reconcile optimistic state against it.
    pub visits: VisitSet,
    pub complete: bool,
}

/// Marks quadras visited or unvisited for the round currently being worked.
pub struct VisitTracker<'a, S> {
    store: &'a mut S,
}

impl<'a, S: TerritoryStore> VisitTracker<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn toggle_visit(
        &mut self,
        territory_id: &str,
        sub_area_id: u32,
    ) -> Result<ToggleOutcome, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        if !territory.has_sub_area(sub_area_id) {
            return Err(ServiceError::validation(format!(
                "sub-area {sub_area_id} is not part of territory {}",
                territory.id
            )));
        }

        let (toggle, visits) = self
            .store
            .toggle_visit(&territory.id, sub_area_id)
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        let complete = territory.is_complete(&visits);
        tracing::debug!(
            territory = %territory.id,
            sub_area_id,
            ?toggle,
            visited = visits.len(),
            total = territory.layout.len(),
            complete,
            "visit toggled"
        );

        Ok(ToggleOutcome {
            toggle,
            sub_area_id,
            visits,
            complete,
        })
    }

    pub fn visits(&self, territory_id: &str) -> Result<VisitSet, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        self.store
            .visits(&territory.id)
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))
    }

    pub fn progress(&self, territory_id: &str) -> Result<TerritoryProgress, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        let visits = self
            .store
            .visits(&territory.id)
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        Ok(TerritoryProgress::of(&territory, &visits))
    }

    pub fn is_complete(&self, territory_id: &str) -> Result<bool, ServiceError> {
        Ok(self.progress(territory_id)?.complete)
    }
}

pub(crate) fn parse_territory_id(raw: &str) -> Result<TerritoryId, ServiceError> {
    TerritoryId::try_new(raw)
        .map_err(|err| ServiceError::validation(format!("territory id: {}", err.message())))
}

pub(crate) fn load_territory<S: TerritoryStore>(
    store: &S,
    raw_id: &str,
) -> Result<Territory, ServiceError> {
    let id = parse_territory_id(raw_id)?;
    store
        .territory(&id)
        .map_err(|err| ServiceError::from_store(err, "territory", id.as_str()))?
        .ok_or_else(|| ServiceError::not_found("territory", id.as_str()))
}
