//! Data structures for survey richness analysis.

mod crowd;
mod observation;
mod schema;
mod survey;
mod traits;

pub use crowd::{CrowdRecord, CrowdTable};
pub use observation::{Observation, ObservationTable};
pub use schema::SpeciesSchema;
pub use survey::{SurveyRow, SurveyTable, METHOD_COLUMN, SITE_COLUMN};
pub use traits::{SizeRange, TraitTable};
