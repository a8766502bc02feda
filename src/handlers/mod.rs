// Two security tiers: public (token acquisition) and protected (/api/*,
// JWT required, role checks per route).
pub mod administration;
pub mod overview;
pub mod policies;
pub mod policyholders;
pub mod public;
pub mod session;
