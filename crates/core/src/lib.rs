#![forbid(unsafe_code)]

pub mod ids;
pub mod report;
pub mod restore;
pub mod schedule;
pub mod territory;
pub mod visits;

pub use ids::{IdError, MemberId, PartId, ScheduleId, TerritoryId};
pub use report::{
    DateError, ReportRange, TerritoryReportRow, date_time_ms, format_iso_date, format_local_date,
    now_ms, parse_date, parse_offset, recent_completion_dates,
};
pub use restore::{FilledSlot, Restoration, latest_match, restore_from_history};
pub use schedule::{
    ASSISTANT_SUFFIX, HistoryEntry, Part, Role, Schedule, SlotRef, SlotRefError,
};
pub use territory::{
    CompletionRecord, LayoutError, SubArea, Territory, TerritoryProgress, TerritoryState,
    check_coordinates, next_sub_area,
};
pub use visits::{Toggle, VisitSet};

#[cfg(test)]
mod tests;
