pub mod booking;
pub mod clock;
pub mod payment;
pub mod repository;
pub mod slot;
pub mod tier;

pub use booking::{AdCreative, Booking, BookingStatus, NewBooking, SponsorInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use repository::{BookingRepository, SlotRepository, StoreError, StoreResult, TierRepository};
pub use slot::{HoldKey, InventorySlot, SlotStatus};
pub use tier::InventoryTier;

/// Default lifetime of a hold before the sweeper reclaims it.
pub const HOLD_TTL_SECONDS: i64 = 15 * 60;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Slot is not available")]
    SlotUnavailable,
    #[error("Slot is not held by this session")]
    NotHolder,
    #[error("This date was just taken")]
    SlotConflict,
    #[error("Date is not bookable: {0}")]
    DateNotBookable(String),
    #[error("Payment event signature could not be verified")]
    InvalidSignature,
    #[error("Unreadable payment event: {0}")]
    InvalidPayload(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Tier not found: {0}")]
    TierNotFound(uuid::Uuid),
    #[error("Booking not found: {0}")]
    BookingNotFound(uuid::Uuid),
    #[error("Booking does not belong to this sponsor")]
    NotOwner,
    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    #[error("Invalid ad content: {0}")]
    InvalidContent(String),
    #[error("Payment provider error: {0}")]
    Payment(String),
}

/// Store failures never reach callers raw. A uniqueness violation can only mean
/// another writer won the (tier, date) race.
impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } => BookingError::SlotConflict,
            StoreError::Unavailable(msg) => BookingError::StoreUnavailable(msg),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
