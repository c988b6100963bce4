//! HIE network clients
//!
//! Opaque vendor calls behind traits so the discovery drivers can be tested
//! with fakes:
//!
//! - [`CarequalityGateway`] - outbound IHE gateway fan-out and result retrieval
//! - [`CommonWellClient`] - patient registration and link retrieval

pub mod carequality;
pub mod commonwell;
pub mod http;

pub use carequality::{
    CarequalityGateway, ExternalPatient, HttpCarequalityGateway, OutboundDiscoveryRequest,
    OutboundDiscoveryResponse,
};
pub use commonwell::{CommonWellClient, CommonWellLink, HttpCommonWellClient};
