#![forbid(unsafe_code)]

use super::{
    CloseRoundRequest, ListCompletionsRequest, SqliteStore, StoreError, bump_territory_tx,
    ensure_territory_exists_tx,
};
use cm_core::{CompletionRecord, TerritoryId, Toggle, VisitSet};
use rusqlite::{Connection, OptionalExtension, params};

impl SqliteStore {
    /// Flips one sub-area in the active visit set and returns the set as stored afterwards.
    pub fn toggle_visit(
        &mut self,
        territory_id: &TerritoryId,
        sub_area_id: u32,
    ) -> Result<(Toggle, VisitSet), StoreError> {
        let territory_id = territory_id.as_str();
        let tx = self.conn.transaction()?;
        ensure_territory_exists_tx(&tx, territory_id)?;

        let in_layout = tx
            .query_row(
                "SELECT 1 FROM territory_sub_areas WHERE territory_id=?1 AND sub_area_id=?2",
                params![territory_id, sub_area_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !in_layout {
            return Err(StoreError::InvalidInput(
                "sub-area is not part of the territory layout",
            ));
        }

        let removed = tx.execute(
            "DELETE FROM active_visits WHERE territory_id=?1 AND sub_area_id=?2",
            params![territory_id, sub_area_id],
        )?;
        let toggle = if removed > 0 {
            Toggle::Unmarked
        } else {
            tx.execute(
                "INSERT INTO active_visits(territory_id, sub_area_id) VALUES (?1, ?2)",
                params![territory_id, sub_area_id],
            )?;
            Toggle::Marked
        };

        let visits = visits_conn(&tx, territory_id)?;
        tx.commit()?;
        Ok((toggle, visits))
    }

    pub fn list_visits(&self, territory_id: &TerritoryId) -> Result<VisitSet, StoreError> {
        visits_conn(&self.conn, territory_id.as_str())
    }

    /// Archives the round: appends one completion row, clears the active visits and,
    /// when requested, releases the responsible member. All in one transaction.
    pub fn close_round(&mut self, request: CloseRoundRequest) -> Result<CompletionRecord, StoreError> {
        let territory_id = request.territory_id.as_str();
        let tx = self.conn.transaction()?;
        ensure_territory_exists_tx(&tx, territory_id)?;

        tx.execute(
            "INSERT INTO completion_history(territory_id, completed_at_ms) VALUES (?1, ?2)",
            params![territory_id, request.completed_at_ms],
        )?;
        let seq = tx.last_insert_rowid();

        tx.execute(
            "DELETE FROM active_visits WHERE territory_id=?1",
            params![territory_id],
        )?;

        if request.release_responsible {
            tx.execute(
                "UPDATE territories SET responsible_member_id=NULL WHERE id=?1",
                params![territory_id],
            )?;
        }
        bump_territory_tx(&tx, territory_id, request.completed_at_ms)?;

        tx.commit()?;
        Ok(CompletionRecord {
            seq,
            territory_id: request.territory_id,
            completed_at_ms: request.completed_at_ms,
        })
    }

    /// Completions inside `[from_ms, to_ms]`, most recent first.
    pub fn list_completions(
        &self,
        request: ListCompletionsRequest,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        if request.from_ms > request.to_ms {
            return Err(StoreError::InvalidInput("completion range is empty"));
        }

        let mut stmt = self.conn.prepare(
            "SELECT seq, territory_id, completed_at_ms FROM completion_history \
             WHERE (?1 IS NULL OR territory_id=?1) AND completed_at_ms BETWEEN ?2 AND ?3 \
             ORDER BY completed_at_ms DESC, seq DESC",
        )?;
        let mut rows = stmt.query(params![
            request.territory_id.as_ref().map(|id| id.as_str()),
            request.from_ms,
            request.to_ms,
        ])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let territory_id = TerritoryId::try_new(row.get::<_, String>(1)?)
                .map_err(|_| StoreError::InvalidInput("invalid completion row"))?;
            out.push(CompletionRecord {
                seq: row.get::<_, i64>(0)?,
                territory_id,
                completed_at_ms: row.get::<_, i64>(2)?,
            });
        }
        Ok(out)
    }
}

fn visits_conn(conn: &Connection, territory_id: &str) -> Result<VisitSet, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT sub_area_id FROM active_visits WHERE territory_id=?1 ORDER BY sub_area_id ASC",
    )?;
    let mut rows = stmt.query(params![territory_id])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(row.get::<_, u32>(0)?);
    }
    Ok(out.into_iter().collect())
}
