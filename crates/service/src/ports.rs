#![forbid(unsafe_code)]

//! Store primitives consumed by the services.
//!
//! Every method is atomic on its own; nothing composes calls into a wider transaction.

use cm_core::{
    CompletionRecord, HistoryEntry, Schedule, ScheduleId, SubArea, Territory, TerritoryId,
    Toggle, VisitSet,
};
use cm_storage::{
    AddSubAreaRequest, AppendHistoryRequest, AssignSlotRequest, ClearSlotRequest,
    CloseRoundRequest, CreateScheduleRequest, CreateTerritoryRequest, ListCompletionsRequest,
    RestoreAssignmentsRequest, SetResponsibleRequest, SqliteStore, StoreError,
};

pub trait TerritoryStore {
    fn territory(&self, id: &TerritoryId) -> Result<Option<Territory>, StoreError>;
    fn territories(&self) -> Result<Vec<Territory>, StoreError>;
    fn create_territory(&mut self, request: CreateTerritoryRequest)
    -> Result<Territory, StoreError>;
    fn add_sub_area(&mut self, request: AddSubAreaRequest) -> Result<SubArea, StoreError>;
    fn undo_sub_area(&mut self, id: &TerritoryId, at_ms: i64) -> Result<SubArea, StoreError>;
    fn set_responsible(&mut self, request: SetResponsibleRequest)
    -> Result<Territory, StoreError>;
    fn toggle_visit(
        &mut self,
        id: &TerritoryId,
        sub_area_id: u32,
    ) -> Result<(Toggle, VisitSet), StoreError>;
    fn visits(&self, id: &TerritoryId) -> Result<VisitSet, StoreError>;
    fn close_round(&mut self, request: CloseRoundRequest) -> Result<CompletionRecord, StoreError>;
    fn completions(
        &self,
        request: ListCompletionsRequest,
    ) -> Result<Vec<CompletionRecord>, StoreError>;
}

pub trait ScheduleStore {
    fn schedule(&self, id: &ScheduleId) -> Result<Option<Schedule>, StoreError>;
    fn schedules(&self) -> Result<Vec<Schedule>, StoreError>;
    fn create_schedule(&mut self, request: CreateScheduleRequest)
    -> Result<Schedule, StoreError>;
    fn assign_slot(
        &mut self,
        request: AssignSlotRequest,
    ) -> Result<(Schedule, HistoryEntry), StoreError>;
    fn clear_slot(&mut self, request: ClearSlotRequest) -> Result<Schedule, StoreError>;
    fn append_history(&mut self, request: AppendHistoryRequest)
    -> Result<HistoryEntry, StoreError>;
    fn history(&self, id: &ScheduleId) -> Result<Vec<HistoryEntry>, StoreError>;
    fn restore_assignments(
        &mut self,
        request: RestoreAssignmentsRequest,
    ) -> Result<Schedule, StoreError>;
}

impl TerritoryStore for SqliteStore {
    fn territory(&self, id: &TerritoryId) -> Result<Option<Territory>, StoreError> {
        self.get_territory(id)
    }

    fn territories(&self) -> Result<Vec<Territory>, StoreError> {
        self.list_territories()
    }

    fn create_territory(
        &mut self,
        request: CreateTerritoryRequest,
    ) -> Result<Territory, StoreError> {
        SqliteStore::create_territory(self, request)
    }

    fn add_sub_area(&mut self, request: AddSubAreaRequest) -> Result<SubArea, StoreError> {
        SqliteStore::add_sub_area(self, request)
    }

    fn undo_sub_area(&mut self, id: &TerritoryId, at_ms: i64) -> Result<SubArea, StoreError> {
        SqliteStore::undo_sub_area(self, id, at_ms)
    }

    fn set_responsible(
        &mut self,
        request: SetResponsibleRequest,
    ) -> Result<Territory, StoreError> {
        SqliteStore::set_responsible(self, request)
    }

    fn toggle_visit(
        &mut self,
        id: &TerritoryId,
        sub_area_id: u32,
    ) -> Result<(Toggle, VisitSet), StoreError> {
        SqliteStore::toggle_visit(self, id, sub_area_id)
    }

    fn visits(&self, id: &TerritoryId) -> Result<VisitSet, StoreError> {
        self.list_visits(id)
    }

    fn close_round(&mut self, request: CloseRoundRequest) -> Result<CompletionRecord, StoreError> {
        SqliteStore::close_round(self, request)
    }

    fn completions(
        &self,
        request: ListCompletionsRequest,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        self.list_completions(request)
    }
}

impl ScheduleStore for SqliteStore {
    fn schedule(&self, id: &ScheduleId) -> Result<Option<Schedule>, StoreError> {
        self.get_schedule(id)
    }

    fn schedules(&self) -> Result<Vec<Schedule>, StoreError> {
        self.list_schedules()
    }

    fn create_schedule(
        &mut self,
        request: CreateScheduleRequest,
    ) -> Result<Schedule, StoreError> {
        SqliteStore::create_schedule(self, request)
    }

    fn assign_slot(
        &mut self,
        request: AssignSlotRequest,
    ) -> Result<(Schedule, HistoryEntry), StoreError> {
        SqliteStore::assign_slot(self, request)
    }

    fn clear_slot(&mut self, request: ClearSlotRequest) -> Result<Schedule, StoreError> {
        SqliteStore::clear_slot(self, request)
    }

    fn append_history(
        &mut self,
        request: AppendHistoryRequest,
    ) -> Result<HistoryEntry, StoreError> {
        SqliteStore::append_history(self, request)
    }

    fn history(&self, id: &ScheduleId) -> Result<Vec<HistoryEntry>, StoreError> {
        self.list_history(id)
    }

    fn restore_assignments(
        &mut self,
        request: RestoreAssignmentsRequest,
    ) -> Result<Schedule, StoreError> {
        SqliteStore::restore_assignments(self, request)
    }
}
