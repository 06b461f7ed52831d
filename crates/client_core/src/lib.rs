pub mod controller;
pub mod error;
pub mod gateway;
pub mod store;

pub use controller::{SyncController, SyncEvent};
pub use error::{BaseUrlError, ControllerError, GatewayError};
pub use gateway::{
    normalize_base_url, DataGateway, GatewayOptions, HttpGateway, InteractionEmitter,
};
pub use store::{EntityStore, RecommendationsState, SessionPhase};
