pub mod identity;
pub mod recipient;
pub mod resolver;
#[cfg(test)]
pub(crate) mod testkeys;
pub mod unlock;

pub use identity::{IdentityLoader, LoadError, UnlockedIdentity};
pub use recipient::{KeyError, Recipient};
pub use resolver::{Resolution, ResolutionCause, ResolutionError, Resolver};
