pub mod client;
pub mod request;
pub mod response;
pub mod transport;

pub use client::RetryingApiClient;
pub use request::{ApiRequest, HttpMethod};
pub use response::ApiResponse;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
