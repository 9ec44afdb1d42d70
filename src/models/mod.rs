// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    MessagePayload, NotifyEvent, PartnerSnippet, SearchMode, UserId, UserProfile,
};
pub use requests::{EventRequest, MessageRequest, ReportRequest, SearchRequest};
pub use responses::{
    AckResponse, ErrorResponse, HealthResponse, ReconnectResponse, RelayResponse, SearchResponse,
};
