//! Daily partition addressing and creation DDL
//!
//! Partition boundaries are computed in UTC regardless of where an event
//! originated, so a given timestamp always maps to the same relation no
//! matter where the daemon runs.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Schema holding the parent relation and all daily partitions.
pub const SCHEMA: &str = "logsink";

/// Parent relation every daily partition inherits from.
pub const PARENT_RELATION: &str = "logsink.events";

/// Address of the daily partition covering one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPartition {
    day: NaiveDate,
}

impl DayPartition {
    /// Partition holding events with the given timestamp.
    pub fn for_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            day: timestamp.date_naive(),
        }
    }

    /// The calendar day this partition covers.
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Relation name without schema, e.g. `events_y2026m8d7`.
    pub fn relation_name(&self) -> String {
        format!(
            "events_y{}m{}d{}",
            self.day.year(),
            self.day.month(),
            self.day.day()
        )
    }

    /// Schema-qualified relation name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", SCHEMA, self.relation_name())
    }

    /// Parameterized insert statement targeting this partition.
    ///
    /// The relation name cannot be a statement parameter; it is derived
    /// purely from digits and fixed text, never from event data.
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, \"timestamp\", message, fields) VALUES ($1, $2, $3, $4)",
            self.qualified_name()
        )
    }

    /// DDL creating this partition if it does not exist yet.
    ///
    /// The relation inherits the parent's columns; local constraints pin the
    /// primary key on `id` and bound `timestamp` to the covered day, and a
    /// btree index serves timestamp range scans.
    pub fn create_sql(&self) -> Vec<String> {
        let name = self.relation_name();
        let day_start = self.day;
        // Saturates at the calendar end; unreachable for parseable input.
        let day_end = self.day.succ_opt().unwrap_or(NaiveDate::MAX);

        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {qualified} (\
                 CONSTRAINT pk_{name}_id PRIMARY KEY (id), \
                 CONSTRAINT chk_{name}_timestamp CHECK (\
                 \"timestamp\" >= '{day_start}'::date AND \"timestamp\" < '{day_end}'::date)\
                 ) INHERITS ({parent})",
                qualified = self.qualified_name(),
                name = name,
                day_start = day_start,
                day_end = day_end,
                parent = PARENT_RELATION,
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS ix_{name}_timestamp \
                 ON {qualified} USING btree (\"timestamp\")",
                name = name,
                qualified = self.qualified_name(),
            ),
        ]
    }
}
