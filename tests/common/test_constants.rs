//! Shared constants for integration tests.

pub const ORG: &str = "11111111-2222-3333-4444-555555555555";
pub const ZONE_URL: &str = "https://api.scaleway.com/instance/v1/zones/fr-par-1";
