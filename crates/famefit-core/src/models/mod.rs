//! FameFit domain models.
//!
//! Data shared between the wearable relay and the phone-side receiver.
//! All models implement `serde` Serialize/Deserialize.

pub mod metrics;
pub mod workout;
