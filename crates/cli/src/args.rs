#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use cm_core::{parse_date, parse_offset};
use cm_service::{ClosePolicy, ServiceConfig};
use std::path::PathBuf;
use time::{Date, UtcOffset};

/// cm - congregation territory and meeting schedule manager
#[derive(Parser, Debug)]
#[command(name = "cm")]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Directory holding congregation.db
    #[arg(long, env = "CM_STORAGE_DIR", default_value = ".congregation")]
    pub storage_dir: PathBuf,

    /// What closing a territory does with its responsible member (release, keep)
    #[arg(long, env = "CM_CLOSE_POLICY", default_value = "release")]
    pub close_policy: ClosePolicy,

    /// UTC offset for report dates (+HH:MM or utc)
    #[arg(long, env = "CM_REPORT_OFFSET", default_value = "utc", value_parser = offset_arg, allow_hyphen_values = true)]
    pub report_offset: UtcOffset,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(long, env = "CM_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            close_policy: self.close_policy,
            report_offset: self.report_offset,
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Territory records
    #[command(subcommand)]
    Territory(TerritoryCommand),

    /// Sub-area layout authoring
    #[command(subcommand)]
    Layout(LayoutCommand),

    /// Visit marks for the current round
    #[command(subcommand)]
    Visit(VisitCommand),

    /// Give an unassigned territory to a member
    Assign {
        territory_id: String,
        member_id: String,
    },

    /// Clear a territory's responsible member
    Release { territory_id: String },

    /// Archive the current round and clear its visits
    Close { territory_id: String },

    /// Visited sub-areas, total and lifecycle state
    Progress { territory_id: String },

    /// Latest completions per territory inside a date range
    Report {
        /// First day, YYYY-MM-DD
        #[arg(long, value_parser = date_arg)]
        from: Date,
        /// Last day (inclusive), YYYY-MM-DD
        #[arg(long, value_parser = date_arg)]
        to: Date,
    },

    /// Weekly meeting schedules
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Refill empty schedule fields from the assignment history
    Restore,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Territory(TerritoryCommand::Create { .. }) => "territory.create",
            Self::Territory(TerritoryCommand::List) => "territory.list",
            Self::Territory(TerritoryCommand::Show { .. }) => "territory.show",
            Self::Layout(LayoutCommand::Add { .. }) => "layout.add",
            Self::Layout(LayoutCommand::Undo { .. }) => "layout.undo",
            Self::Visit(VisitCommand::Toggle { .. }) => "visit.toggle",
            Self::Visit(VisitCommand::List { .. }) => "visit.list",
            Self::Assign { .. } => "assign",
            Self::Release { .. } => "release",
            Self::Close { .. } => "close",
            Self::Progress { .. } => "progress",
            Self::Report { .. } => "report",
            Self::Schedule(ScheduleCommand::Create { .. }) => "schedule.create",
            Self::Schedule(ScheduleCommand::List) => "schedule.list",
            Self::Schedule(ScheduleCommand::Show { .. }) => "schedule.show",
            Self::Schedule(ScheduleCommand::Assign { .. }) => "schedule.assign",
            Self::Schedule(ScheduleCommand::Clear { .. }) => "schedule.clear",
            Self::Schedule(ScheduleCommand::History { .. }) => "schedule.history",
            Self::Schedule(ScheduleCommand::AppendHistory { .. }) => "schedule.append_history",
            Self::Restore => "restore",
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum TerritoryCommand {
    Create {
        territory_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        reference: String,
        #[arg(long, default_value = "")]
        map: String,
    },
    #[command(alias = "ls")]
    List,
    Show { territory_id: String },
}

#[derive(Subcommand, Debug)]
pub(crate) enum LayoutCommand {
    /// Append a sub-area at (x, y), percentages of the map
    Add { territory_id: String, x: f64, y: f64 },
    /// Remove the most recently added sub-area
    Undo { territory_id: String },
}

#[derive(Subcommand, Debug)]
pub(crate) enum VisitCommand {
    Toggle {
        territory_id: String,
        sub_area_id: u32,
    },
    List { territory_id: String },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ScheduleCommand {
    Create {
        schedule_id: String,
        #[arg(long, value_parser = date_arg)]
        date: Date,
        /// Part name, in program order; repeat for each part
        #[arg(long = "part")]
        parts: Vec<String>,
    },
    #[command(alias = "ls")]
    List,
    Show { schedule_id: String },
    /// Assign a slot (role:president, part:<id>:assignee, part:<id>:assistant, ...)
    Assign {
        schedule_id: String,
        slot: String,
        member_id: String,
    },
    /// Empty a slot without touching history
    Clear { schedule_id: String, slot: String },
    History { schedule_id: String },
    /// Append a raw history row
    AppendHistory {
        schedule_id: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        member: String,
        #[arg(long)]
        slot: Option<String>,
        #[arg(long)]
        at_ms: Option<i64>,
    },
}

fn date_arg(value: &str) -> Result<Date, String> {
    parse_date(value).map_err(|err| err.message().to_string())
}

fn offset_arg(value: &str) -> Result<UtcOffset, String> {
    parse_offset(value).map_err(|err| err.message().to_string())
}
