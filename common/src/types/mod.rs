pub mod chunk;
pub mod document;
pub mod logs;
pub mod response;
pub mod retrieval;
pub mod safety;

pub use chunk::{Category, Chunk};
pub use document::Document;
pub use logs::{InteractionLogRecord, SafetyIncidentRecord};
pub use response::{GeneratedResponse, SourceCitation};
pub use retrieval::RetrievalResult;
pub use safety::{RiskLevel, SafetyAssessment, SafetyFlag, SafetyFlagKind};
