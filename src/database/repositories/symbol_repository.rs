use crate::database::connection::{DatabaseError, PgPooledConnection};
use crate::database::models::{NewTrackedSymbol, TrackedSymbol, TrackedSymbolUpdate};
use crate::database::schema::tracked_symbols;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

/// Symbol repository trait - defines interface for tracked symbol operations
///
/// Symbols are stored uppercased; callers validate the format beforehand
#[async_trait::async_trait]
pub trait SymbolRepository: Send + Sync {
    /// Find symbol by ticker
    fn find(&self, symbol: &str) -> Result<Option<TrackedSymbol>, DatabaseError>;

    /// List symbols, newest first, optionally filtered by active flag
    fn find_all(&self, is_active: Option<bool>) -> Result<Vec<TrackedSymbol>, DatabaseError>;

    /// Insert a new symbol
    fn insert(&self, new_symbol: NewTrackedSymbol) -> Result<TrackedSymbol, DatabaseError>;

    /// Apply a partial update; returns `None` when the symbol does not exist
    fn update(
        &self,
        symbol: &str,
        update: TrackedSymbolUpdate,
    ) -> Result<Option<TrackedSymbol>, DatabaseError>;

    /// Record the time of the last successful price check
    fn update_last_checked(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), DatabaseError>;

    /// Whether a record exists, active or not
    fn exists(&self, symbol: &str) -> Result<bool, DatabaseError>;

    /// Delete symbol; returns true if a row was removed
    fn delete(&self, symbol: &str) -> Result<bool, DatabaseError>;
}

/// PostgreSQL implementation of SymbolRepository
pub struct SymbolRepositoryImpl {
    get_conn: Arc<dyn Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync>,
}

impl SymbolRepositoryImpl {
    /// Create new symbol repository with connection provider
    pub fn new<F>(get_conn: F) -> Self
    where
        F: Fn() -> Result<PgPooledConnection, DatabaseError> + Send + Sync + 'static,
    {
        Self {
            get_conn: Arc::new(get_conn),
        }
    }
}

#[async_trait::async_trait]
impl SymbolRepository for SymbolRepositoryImpl {
    fn find(&self, symbol: &str) -> Result<Option<TrackedSymbol>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        tracked_symbols::table
            .find(symbol)
            .first::<TrackedSymbol>(&mut conn)
            .optional()
            .map_err(DatabaseError::from)
    }

    fn find_all(&self, is_active: Option<bool>) -> Result<Vec<TrackedSymbol>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let mut query = tracked_symbols::table
            .order(tracked_symbols::created_at.desc())
            .into_boxed();

        if let Some(active) = is_active {
            query = query.filter(tracked_symbols::is_active.eq(active));
        }

        query
            .load::<TrackedSymbol>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn insert(&self, new_symbol: NewTrackedSymbol) -> Result<TrackedSymbol, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        diesel::insert_into(tracked_symbols::table)
            .values(&new_symbol)
            .get_result::<TrackedSymbol>(&mut conn)
            .map_err(DatabaseError::from)
    }

    fn update(
        &self,
        symbol: &str,
        update: TrackedSymbolUpdate,
    ) -> Result<Option<TrackedSymbol>, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        diesel::update(tracked_symbols::table.find(symbol))
            .set((&update, tracked_symbols::updated_at.eq(Utc::now())))
            .get_result::<TrackedSymbol>(&mut conn)
            .optional()
            .map_err(DatabaseError::from)
    }

    fn update_last_checked(&self, symbol: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut conn = (self.get_conn)()?;

        diesel::update(tracked_symbols::table.find(symbol))
            .set(tracked_symbols::last_checked_at.eq(Some(at)))
            .execute(&mut conn)?;

        Ok(())
    }

    fn exists(&self, symbol: &str) -> Result<bool, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        diesel::select(diesel::dsl::exists(
            tracked_symbols::table.filter(tracked_symbols::symbol.eq(symbol)),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(DatabaseError::from)
    }

    fn delete(&self, symbol: &str) -> Result<bool, DatabaseError> {
        let mut conn = (self.get_conn)()?;

        let deleted = diesel::delete(tracked_symbols::table.find(symbol)).execute(&mut conn)?;

        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::establish_connection_pool;

    // Requires a live PostgreSQL; skipped when DATABASE_URL is unset
    fn repository() -> Option<SymbolRepositoryImpl> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = establish_connection_pool(&url, 2).ok()?;
        pool.run_migrations().ok()?;
        Some(SymbolRepositoryImpl::new(move || pool.get_conn()))
    }

    #[test]
    #[ignore]
    fn test_symbol_repository_lifecycle() {
        let Some(repo) = repository() else {
            return;
        };
        let _ = repo.delete("ZZTST");

        let inserted = repo.insert(NewTrackedSymbol::new("ZZTST")).unwrap();
        assert!(inserted.is_active);
        assert!(repo.exists("ZZTST").unwrap());

        let updated = repo
            .update("ZZTST", TrackedSymbolUpdate::deactivate())
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);

        let now = Utc::now();
        repo.update_last_checked("ZZTST", now).unwrap();
        assert!(repo.find("ZZTST").unwrap().unwrap().last_checked_at.is_some());

        assert!(repo.delete("ZZTST").unwrap());
        assert!(!repo.exists("ZZTST").unwrap());
    }
}
