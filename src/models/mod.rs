pub mod outcome;
pub mod statistics;
pub mod url_record;

pub use outcome::{Outcome, VisitStatus};
pub use statistics::{RunReport, SiteSummary, Statistics, StatsCollector};
pub use url_record::UrlRecord;
