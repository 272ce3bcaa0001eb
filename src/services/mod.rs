pub mod cache_params;
pub mod sitemap_resolver;
pub mod url_prioritizer;

pub use cache_params::add_cache_params;
pub use sitemap_resolver::{parse_sitemap, SitemapDocument, SitemapResolver};
pub use url_prioritizer::{prioritize, UrlPrioritizer};
