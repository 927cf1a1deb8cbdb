#![forbid(unsafe_code)]

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::ports::TerritoryStore;
use crate::visits::{load_territory, parse_territory_id};
use cm_core::{
    CompletionRecord, MemberId, ReportRange, SubArea, Territory, TerritoryProgress,
    TerritoryReportRow, check_coordinates, now_ms, recent_completion_dates,
};
use cm_storage::{
    AddSubAreaRequest, CloseRoundRequest, CreateTerritoryRequest, ListCompletionsRequest,
    SetResponsibleRequest,
};
use std::collections::BTreeMap;
use time::Date;

/// Assignment, closing and reporting of territories.
///
/// Lifecycle: `Unassigned -> InProgress -> Complete -> (close) -> Unassigned`. Closing
/// under [`crate::ClosePolicy::Keep`] leaves the responsible member in place instead.
pub struct LifecycleController<'a, S> {
    store: &'a mut S,
    config: ServiceConfig,
}

impl<'a, S: TerritoryStore> LifecycleController<'a, S> {
    pub fn new(store: &'a mut S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn create_territory(
        &mut self,
        territory_id: &str,
        name: &str,
        reference: &str,
        map_image_ref: &str,
    ) -> Result<Territory, ServiceError> {
        let id = parse_territory_id(territory_id)?;
        if name.trim().is_empty() {
            return Err(ServiceError::validation("territory name must not be empty"));
        }
        self.store
            .create_territory(CreateTerritoryRequest {
                territory_id: id.clone(),
                name: name.to_string(),
                reference: reference.to_string(),
                map_image_ref: map_image_ref.to_string(),
                created_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "territory", id.as_str()))
    }

    pub fn territory(&self, territory_id: &str) -> Result<Territory, ServiceError> {
        load_territory(&*self.store, territory_id)
    }

    pub fn territories(&self) -> Result<Vec<Territory>, ServiceError> {
        self.store.territories().map_err(ServiceError::Persistence)
    }

    pub fn add_sub_area(
        &mut self,
        territory_id: &str,
        x: f64,
        y: f64,
    ) -> Result<SubArea, ServiceError> {
        let id = parse_territory_id(territory_id)?;
        check_coordinates(x, y).map_err(|err| ServiceError::validation(err.message()))?;
        self.store
            .add_sub_area(AddSubAreaRequest {
                territory_id: id.clone(),
                x,
                y,
                updated_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "territory", id.as_str()))
    }

    pub fn undo_sub_area(&mut self, territory_id: &str) -> Result<SubArea, ServiceError> {
        let id = parse_territory_id(territory_id)?;
        self.store
            .undo_sub_area(&id, now_ms())
            .map_err(|err| ServiceError::from_store(err, "territory", id.as_str()))
    }

    /// Sets the responsible member; legal only while the territory is unassigned.
    pub fn assign(&mut self, territory_id: &str, member_id: &str) -> Result<Territory, ServiceError> {
        let member = MemberId::try_new(member_id)
            .map_err(|_| ServiceError::validation("a responsible member must be selected"))?;
        let territory = load_territory(&*self.store, territory_id)?;
        if let Some(current) = &territory.responsible_member_id {
            return Err(ServiceError::validation(format!(
                "territory {} is already assigned to {current}",
                territory.id
            )));
        }

        let updated = self
            .store
            .set_responsible(SetResponsibleRequest {
                territory_id: territory.id.clone(),
                member_id: Some(member.clone()),
                expected_revision: Some(territory.revision),
                updated_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        tracing::info!(territory = %updated.id, member = %member, "territory assigned");
        Ok(updated)
    }

    /// Clears the responsible member, returning the territory to `Unassigned`.
    pub fn release(&mut self, territory_id: &str) -> Result<Territory, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        let updated = self
            .store
            .set_responsible(SetResponsibleRequest {
                territory_id: territory.id.clone(),
                member_id: None,
                expected_revision: Some(territory.revision),
                updated_at_ms: now_ms(),
            })
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        tracing::info!(territory = %updated.id, "territory released");
        Ok(updated)
    }

    /// Archives the current round. Not gated on completion; callers decide when to offer it.
    pub fn close(&mut self, territory_id: &str) -> Result<CompletionRecord, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        let visits = self
            .store
            .visits(&territory.id)
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        let complete = territory.is_complete(&visits);

        let record = self
            .store
            .close_round(CloseRoundRequest {
                territory_id: territory.id.clone(),
                completed_at_ms: now_ms(),
                release_responsible: self.config.close_policy.releases_responsible(),
            })
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;

        if complete {
            tracing::info!(
                territory = %territory.id,
                seq = record.seq,
                policy = self.config.close_policy.as_str(),
                "territory closed"
            );
        } else {
            tracing::warn!(
                territory = %territory.id,
                seq = record.seq,
                visited = visits.len(),
                total = territory.layout.len(),
                "territory closed before every sub-area was visited"
            );
        }
        Ok(record)
    }

    pub fn progress(&self, territory_id: &str) -> Result<TerritoryProgress, ServiceError> {
        let territory = load_territory(&*self.store, territory_id)?;
        let visits = self
            .store
            .visits(&territory.id)
            .map_err(|err| ServiceError::from_store(err, "territory", territory.id.as_str()))?;
        Ok(TerritoryProgress::of(&territory, &visits))
    }

    /// Every territory with its latest completions in `[start, end]`, end inclusive
    /// through the last millisecond of the day.
    pub fn report(&self, start: Date, end: Date) -> Result<Vec<TerritoryReportRow>, ServiceError> {
        let range = ReportRange::new(start, end, self.config.report_offset)
            .map_err(|err| ServiceError::validation(err.message()))?;

        let territories = self.store.territories().map_err(ServiceError::Persistence)?;
        let completions = self
            .store
            .completions(ListCompletionsRequest {
                territory_id: None,
                from_ms: range.start_ms,
                to_ms: range.end_ms,
            })
            .map_err(ServiceError::Persistence)?;

        let mut by_territory: BTreeMap<_, Vec<i64>> = BTreeMap::new();
        for record in completions {
            by_territory
                .entry(record.territory_id)
                .or_default()
                .push(record.completed_at_ms);
        }

        Ok(territories
            .into_iter()
            .map(|territory| {
                let stamps = by_territory.remove(&territory.id).unwrap_or_default();
                TerritoryReportRow {
                    conclusoes: recent_completion_dates(&range, &stamps),
                    territory_id: territory.id,
                    name: territory.name,
                }
            })
            .collect())
    }
}
