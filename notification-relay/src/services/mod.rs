pub mod credentials;
pub mod providers;

pub use credentials::ServiceAccountKey;
pub use providers::{
    ErrorCode, FcmProvider, MockOutcome, MockPushProvider, ProviderError, PushProvider,
};
