/// Symbol registry
///
/// - `validation`: ticker format rules
/// - `symbol_cache`: existence (5 min) and upstream validation (1 h) caches
/// - `symbol_service`: registry operations over `SymbolRepository`

pub mod symbol_cache;
pub mod symbol_service;
pub mod validation;

pub use symbol_cache::SymbolCache;
pub use symbol_service::SymbolService;
pub use validation::{normalize, validate_format};
