pub mod alert;
pub mod events;
pub mod health;
pub mod market;
pub mod wad_ray;

pub use alert::{Alert, AlertLevel};
pub use events::{DomainEvent, EventKind, EventMeta, RawLog};
pub use health::{AccountPosition, HealthClassification, OracleFeedStatus, UtilizationStatus};
pub use market::ReserveSnapshot;
pub use wad_ray::{Ray, Wad};
