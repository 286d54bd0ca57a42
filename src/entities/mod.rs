pub mod record;

pub use record::{Entity as StoredRecord, Model as StoredRecordModel};
