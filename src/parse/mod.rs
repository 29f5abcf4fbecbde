pub mod api;
pub mod hydration;
pub mod json_walk;
pub mod normalize;
pub mod primitives;
pub mod stream;
pub mod text;

use crate::config::Fundraiser;
use crate::types::FundraiserRecord;

pub use api::ApiPayload;
pub use hydration::HydrationJson;
pub use stream::StreamPayload;
pub use text::TextScan;

/// One way of pulling a fundraiser record out of a response body.
///
/// Strategies never fail loudly: anything they cannot parse is `None`.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_extract(&self, body: &str, fundraiser: &Fundraiser) -> Option<FundraiserRecord>;
}

/// Run `strategies` in order and return the first record together with the
/// name of the strategy that produced it.
pub fn first_match(
    strategies: &[&dyn Strategy],
    body: &str,
    fundraiser: &Fundraiser,
) -> Option<(&'static str, FundraiserRecord)> {
    strategies
        .iter()
        .find_map(|s| s.try_extract(body, fundraiser).map(|r| (s.name(), r)))
}
