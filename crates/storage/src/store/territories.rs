#![forbid(unsafe_code)]

use super::{
    AddSubAreaRequest, CreateTerritoryRequest, SetResponsibleRequest, SqliteStore, StoreError,
    TERRITORY_COLUMNS, all_layouts_conn, assemble_territory, bump_territory_tx,
    ensure_territory_exists_tx, layout_conn, map_insert_conflict, required_text,
    territory_conn, territory_header_from_row, territory_tx,
};
use cm_core::{LayoutError, SubArea, Territory, TerritoryId, next_sub_area};
use rusqlite::params;

impl SqliteStore {
    pub fn create_territory(
        &mut self,
        request: CreateTerritoryRequest,
    ) -> Result<Territory, StoreError> {
        let name = required_text(&request.name, "territory name must not be empty")?;

        let tx = self.conn.transaction()?;
        let insert = tx.execute(
            "INSERT INTO territories(id, name, reference, map_image_ref, responsible_member_id, revision, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, NULL, 1, ?5, ?5)",
            params![
                request.territory_id.as_str(),
                name,
                request.reference.trim(),
                request.map_image_ref.trim(),
                request.created_at_ms,
            ],
        );
        if let Err(err) = insert {
            return Err(map_insert_conflict(err));
        }

        let territory = territory_tx(&tx, request.territory_id.as_str())?;
        tx.commit()?;
        Ok(territory)
    }

    pub fn get_territory(&self, territory_id: &TerritoryId) -> Result<Option<Territory>, StoreError> {
        territory_conn(&self.conn, territory_id.as_str())
    }

    pub fn list_territories(&self) -> Result<Vec<Territory>, StoreError> {
        let mut layouts = all_layouts_conn(&self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TERRITORY_COLUMNS} FROM territories ORDER BY name ASC, id ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let header = territory_header_from_row(row)?;
            let layout = layouts.remove(&header.id).unwrap_or_default();
            out.push(assemble_territory(header, layout)?);
        }
        Ok(out)
    }

    /// Appends one sub-area to the layout; the new id is always `len + 1`.
    pub fn add_sub_area(&mut self, request: AddSubAreaRequest) -> Result<SubArea, StoreError> {
        let territory_id = request.territory_id.as_str();
        let tx = self.conn.transaction()?;
        ensure_territory_exists_tx(&tx, territory_id)?;

        let layout = layout_conn(&tx, territory_id)?;
        let area = next_sub_area(&layout, request.x, request.y).map_err(layout_error)?;

        tx.execute(
            "INSERT INTO territory_sub_areas(territory_id, sub_area_id, x, y) VALUES (?1, ?2, ?3, ?4)",
            params![territory_id, area.sub_area_id, area.x, area.y],
        )
        .map_err(map_insert_conflict)?;
        bump_territory_tx(&tx, territory_id, request.updated_at_ms)?;

        tx.commit()?;
        Ok(area)
    }

    /// Removes the last-authored sub-area (and its visit mark, if any).
    pub fn undo_sub_area(
        &mut self,
        territory_id: &TerritoryId,
        updated_at_ms: i64,
    ) -> Result<SubArea, StoreError> {
        let territory_id = territory_id.as_str();
        let tx = self.conn.transaction()?;
        ensure_territory_exists_tx(&tx, territory_id)?;

        let layout = layout_conn(&tx, territory_id)?;
        let Some(last) = layout.last().copied() else {
            return Err(layout_error(LayoutError::Empty));
        };

        tx.execute(
            "DELETE FROM active_visits WHERE territory_id=?1 AND sub_area_id=?2",
            params![territory_id, last.sub_area_id],
        )?;
        tx.execute(
            "DELETE FROM territory_sub_areas WHERE territory_id=?1 AND sub_area_id=?2",
            params![territory_id, last.sub_area_id],
        )?;
        bump_territory_tx(&tx, territory_id, updated_at_ms)?;

        tx.commit()?;
        Ok(last)
    }

    pub fn set_responsible(
        &mut self,
        request: SetResponsibleRequest,
    ) -> Result<Territory, StoreError> {
        let territory_id = request.territory_id.as_str();
        let tx = self.conn.transaction()?;
        let current = territory_tx(&tx, territory_id)?;

        if let Some(expected) = request.expected_revision
            && expected != current.revision
        {
            return Err(StoreError::RevisionMismatch {
                expected,
                actual: current.revision,
            });
        }

        tx.execute(
            "UPDATE territories SET responsible_member_id=?2 WHERE id=?1",
            params![
                territory_id,
                request.member_id.as_ref().map(|member| member.as_str()),
            ],
        )?;
        bump_territory_tx(&tx, territory_id, request.updated_at_ms)?;

        let territory = territory_tx(&tx, territory_id)?;
        tx.commit()?;
        Ok(territory)
    }
}

fn layout_error(err: LayoutError) -> StoreError {
    StoreError::InvalidInput(err.message())
}
