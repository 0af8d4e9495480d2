// diafon-api: Async Rust client for the Multitek DiafonBox cloud (vendor API + Pushy listener)

pub mod account;
pub mod calls;
pub mod client;
pub mod error;
pub mod locations;
pub mod media;
pub mod models;
pub mod push;
pub mod transport;

pub use account::AppInfo;
pub use client::{ApiReply, DEFAULT_LANGUAGE, Identity, MultitekClient};
pub use error::Error;
pub use models::{
    Account, CallRecord, CallState, CurrentCall, Device, Location, Phone, PushCredentials, Room,
};
pub use push::{PushClient, PushConfig, PushNotification, PushState};
pub use transport::{ServiceCredentials, TlsMode, TransportConfig};
