/// Repository traits over the tracking tables, with PostgreSQL and
/// in-memory implementations
///
/// - `SymbolRepository`: tracked symbol registry
/// - `PriceRepository`: append-only price time series

pub mod memory;
pub mod price_repository;
pub mod symbol_repository;

pub use memory::{InMemoryPriceRepository, InMemorySymbolRepository};
pub use price_repository::{PriceRepository, PriceRepositoryImpl, DEFAULT_WINDOW};
pub use symbol_repository::{SymbolRepository, SymbolRepositoryImpl};
