pub mod agent;
pub mod assignment;
pub mod customer;
pub mod policy;
pub mod role;
pub mod user;

pub use agent::Agent;
pub use assignment::{CustomerAgent, CustomerPolicyAgent};
pub use customer::Customer;
pub use policy::{CustomerPolicy, InsurancePolicy};
pub use role::Role;
pub use user::User;
