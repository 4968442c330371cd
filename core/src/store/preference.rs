use super::SimStore;
use crate::error::SimResult;
use rusqlite::{params, OptionalExtension};

/// Key of the "onboarding tour already shown" flag.
pub const TOUR_SEEN_KEY: &str = "hasSeenTour_v1";

impl SimStore {
    // ── Preferences ───────────────────────────────────────────────

    pub fn preference(&self, key: &str) -> SimResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preference WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_preference(&self, key: &str, value: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO preference (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn has_seen_tour(&self) -> SimResult<bool> {
        Ok(self.preference(TOUR_SEEN_KEY)?.is_some())
    }

    pub fn mark_tour_seen(&self) -> SimResult<()> {
        self.set_preference(TOUR_SEEN_KEY, "true")
    }
}
