pub mod coordinator;
pub mod driver;
pub mod guard;
pub mod migration;
pub mod probe;
pub mod subscription;
pub mod types;

pub use coordinator::SyncCoordinator;
pub use driver::{CoordinatorDriver, CoordinatorHandle};
pub use guard::{changed_fields, check_owner, route, IdClass, IdScheme, Route};
pub use migration::{plan_migration, MigrationPlan};
pub use probe::probe_with_retry;
pub use subscription::{Generation, SnapshotDelivery, SubscriptionSlot};
pub use types::{
    ConnectionState, CoordinatorOptions, CreateOutcome, DegradedReason, DeleteOutcome,
    DeliveryOutcome, IdentityEvent, RetryPolicy, SignInReport, ToggleLabel, ToggleSpec,
    UpdateOutcome,
};
