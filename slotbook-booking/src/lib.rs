pub mod availability;
pub mod checkout;
pub mod confirm;
pub mod events;
pub mod hold;
pub mod reconciler;
pub mod schedule;
pub mod sweeper;

pub use availability::AvailabilityService;
pub use checkout::DummyCheckoutGateway;
pub use confirm::{BookingConfirmer, PaymentOutcome};
pub use events::SlotEvents;
pub use hold::{HoldManager, PlacedHold};
pub use reconciler::{PaymentReconciler, ReconcileOutcome};
pub use sweeper::{ExpirationSweeper, SweepSummary};

#[cfg(test)]
pub(crate) mod testing;
