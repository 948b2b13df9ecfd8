/// Every user, entry and profile is keyed by the backend's UUID.
pub type UserId = uuid::Uuid;

/// Journal entry primary key.
pub type EntryId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
