//! 캔들 캐시 및 윈도우 해석.

pub mod loader;
pub mod refs;
pub mod resolver;

pub use loader::JobKlineLoader;
pub use refs::dedupe_refs;
pub use resolver::{
    CandleSource, KlineResolver, ResolvedWindow, ResolverConfig, WindowRequest, DEFAULT_MAX_PAGES,
};
