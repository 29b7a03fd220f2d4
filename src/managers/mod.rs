pub mod dispatcher;
pub mod field_mapper;
pub mod membership;
pub mod upstream_client;
pub mod verification_manager;

pub use dispatcher::{Action, Dispatcher, SharedDispatcher, Step};
pub use membership::GuildMembershipSource;
pub use upstream_client::{ProfileLookup, UpstreamClient};
pub use verification_manager::{create_shared_verification_manager, SharedVerificationManager};
