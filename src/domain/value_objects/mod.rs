pub mod payment_events;
pub mod payments;
pub mod plans;
