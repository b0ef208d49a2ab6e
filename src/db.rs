use lazy_static::lazy_static;
use std::sync::RwLock;

// SQLite only supports a single writer at a time, and concurrent
// readers during a write can still hit SQLITE_BUSY with the pooled
// connections. A process-wide RwLock in front of every database
// operation keeps us clear of that.
lazy_static! {
    pub static ref DB_LOCK: RwLock<()> = RwLock::new(());
}

// The macros build a concrete StoreError rather than leaving the error
// type to inference; StoreError converts from more than one source
// type, so an `.into()` here would be ambiguous at every `?` site.
#[macro_export]
macro_rules! lock_db_write {
    () => {
        $crate::db::DB_LOCK
            .write()
            .map_err(|_| $crate::store::StoreError::new("Cannot lock database for writing"))
    };
}

#[macro_export]
macro_rules! lock_db_read {
    () => {
        $crate::db::DB_LOCK
            .read()
            .map_err(|_| $crate::store::StoreError::new("Cannot lock database for reading"))
    };
}
