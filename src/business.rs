use crate::item::Item;
use crate::store::{ItemUpdate, Store};
use crate::user::User;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("{0}")]
    Validation(String),
    #[error("user not logged in. Please sign in first via POST /auth/session")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

fn require(value: &str, field: &str) -> Result<(), OpError> {
    if value.is_empty() {
        Err(OpError::Validation(format!("missing {}", field)))
    } else {
        Ok(())
    }
}

// Validation always runs before the first storage access, and the email
// check always comes first.
fn resolve_user(store: &mut dyn Store, email: &str) -> Result<User, OpError> {
    store
        .get_user(email)
        .map_err(|e| OpError::Internal(format!("get_user failed: {}", e)))?
        .ok_or_else(|| OpError::NotFound(format!("no user found for {}", email)))
}

/// Inserts a new, not-yet-done item into the caller's todo list.
pub fn add_item(
    store: &mut dyn Store,
    email: &str,
    item_name: &str,
    item_description: &str,
) -> Result<(), OpError> {
    require(email, "email")?;
    require(item_name, "itemName")?;
    require(item_description, "itemDescription")?;

    let user = resolve_user(store, email)?;
    let inserted = store
        .add_item(user.list_id, item_name, item_description)
        .map_err(|e| OpError::Internal(format!("add_item failed: {}", e)))?;
    if !inserted {
        return Err(OpError::Validation("item already exists".into()));
    }
    Ok(())
}

/// Soft-deletes the named item: the row stays around with active unset
/// and disappears from every listing and lookup. Deleting a name that
/// has no active item (including a repeat delete) is an error.
pub fn delete_item(store: &mut dyn Store, email: &str, item_name: &str) -> Result<(), OpError> {
    require(email, "email")?;
    require(item_name, "itemName")?;

    let user = resolve_user(store, email)?;
    let hit = store
        .update_item(
            user.list_id,
            item_name,
            ItemUpdate {
                done: None,
                active: Some(false),
                require_active: true,
            },
        )
        .map_err(|e| OpError::Internal(format!("update_item failed: {}", e)))?;
    if !hit {
        return Err(OpError::NotFound("item does not exist".into()));
    }
    Ok(())
}

/// Marks the named item as done. With `revive` set (the historical
/// behavior of this service) the update also reactivates a soft-deleted
/// item of that name; without it, only active items qualify.
pub fn mark_done(
    store: &mut dyn Store,
    email: &str,
    item_name: &str,
    revive: bool,
) -> Result<(), OpError> {
    require(email, "email")?;
    require(item_name, "itemName")?;

    let user = resolve_user(store, email)?;
    let update = if revive {
        ItemUpdate {
            done: Some(true),
            active: Some(true),
            require_active: false,
        }
    } else {
        ItemUpdate {
            done: Some(true),
            active: None,
            require_active: true,
        }
    };
    let hit = store
        .update_item(user.list_id, item_name, update)
        .map_err(|e| OpError::Internal(format!("update_item failed: {}", e)))?;
    if !hit {
        return Err(OpError::NotFound("item does not exist".into()));
    }
    Ok(())
}

/// Active items of the caller's list, in insertion order.
pub fn list_items(store: &mut dyn Store, email: &str) -> Result<Vec<Item>, OpError> {
    require(email, "email")?;

    let user = resolve_user(store, email)?;
    store
        .list_items(user.list_id)
        .map_err(|e| OpError::Internal(format!("list_items failed: {}", e)))
}

/// Provisions a fresh user together with their todo list and returns the
/// new user's public id. This does not deduplicate by itself; callers
/// (the auth gate) check existence first, and the unique email index
/// makes a raced second call fail instead of duplicating.
pub fn ensure_user(store: &mut dyn Store, email: &str) -> Result<String, OpError> {
    require(email, "email")?;

    store
        .create_user(email)
        .map(|u| u.uuid)
        .map_err(|e| OpError::Internal(format!("create_user failed: {}", e)))
}

/// Whether a user row exists for the email. "No rows" is a plain false,
/// not an error.
pub fn user_exists(store: &mut dyn Store, email: &str) -> Result<bool, OpError> {
    require(email, "email")?;

    match store.get_user(email) {
        Ok(found) => Ok(found.is_some()),
        Err(e) => Err(OpError::Internal(format!("get_user failed: {}", e))),
    }
}

pub fn ping() -> &'static str {
    "Pong"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use chrono::Utc;
    use uuid::Uuid;

    /// In-memory store fake. Counts every call so tests can assert that
    /// validation short-circuits before any storage access.
    struct MemStore {
        users: Vec<User>,
        items: Vec<Item>,
        lists_created: i32,
        calls: u32,
        fail_get_user: bool,
    }

    impl MemStore {
        fn new() -> MemStore {
            MemStore {
                users: vec![],
                items: vec![],
                lists_created: 0,
                calls: 0,
                fail_get_user: false,
            }
        }

        /// A store pre-seeded with one user; returns the user's list id.
        fn with_user(email: &str) -> (MemStore, i32) {
            let mut store = MemStore::new();
            let user = store.create_user(email).unwrap();
            let list = user.list_id;
            store.calls = 0;
            (store, list)
        }
    }

    impl Store for MemStore {
        fn get_user(&mut self, user_email: &str) -> Result<Option<User>, StoreError> {
            self.calls += 1;
            if self.fail_get_user {
                return Err(StoreError::new("connection refused"));
            }
            Ok(self.users.iter().find(|u| u.email == user_email).cloned())
        }

        fn create_user(&mut self, user_email: &str) -> Result<User, StoreError> {
            self.calls += 1;
            self.lists_created += 1;
            let user = User {
                id: self.users.len() as i32 + 1,
                uuid: Uuid::new_v4().to_string(),
                email: user_email.to_string(),
                list_id: self.lists_created,
                active: true,
                created_at: Utc::now().naive_utc(),
                updated_at: None,
            };
            self.users.push(user.clone());
            Ok(user)
        }

        fn add_item(
            &mut self,
            list: i32,
            item_name: &str,
            item_description: &str,
        ) -> Result<bool, StoreError> {
            self.calls += 1;
            let taken = self
                .items
                .iter()
                .any(|it| it.list_id == list && it.name == item_name && it.active);
            if taken {
                return Ok(false);
            }
            self.items.push(Item {
                id: self.items.len() as i64 + 1,
                list_id: list,
                name: item_name.to_string(),
                description: item_description.to_string(),
                done: false,
                active: true,
                created_at: Utc::now().naive_utc(),
                updated_at: None,
            });
            Ok(true)
        }

        fn update_item(
            &mut self,
            list: i32,
            item_name: &str,
            update: ItemUpdate,
        ) -> Result<bool, StoreError> {
            self.calls += 1;
            let found = self.items.iter_mut().find(|it| {
                it.list_id == list
                    && it.name == item_name
                    && (!update.require_active || it.active)
            });
            match found {
                None => Ok(false),
                Some(it) => {
                    if let Some(done) = update.done {
                        it.done = done;
                    }
                    if let Some(active) = update.active {
                        it.active = active;
                    }
                    it.updated_at = Some(Utc::now().naive_utc());
                    Ok(true)
                }
            }
        }

        fn list_items(&mut self, list: i32) -> Result<Vec<Item>, StoreError> {
            self.calls += 1;
            Ok(self
                .items
                .iter()
                .filter(|it| it.list_id == list && it.active)
                .cloned()
                .collect())
        }
    }

    fn assert_validation(res: Result<(), OpError>, msg: &str) {
        match res {
            Err(OpError::Validation(m)) => assert_eq!(m, msg),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_email_rejected_before_any_storage_access() {
        let mut store = MemStore::new();
        assert_validation(add_item(&mut store, "", "a", "b"), "missing email");
        assert_validation(delete_item(&mut store, "", "a"), "missing email");
        assert_validation(mark_done(&mut store, "", "a", true), "missing email");
        assert_validation(list_items(&mut store, "").map(|_| ()), "missing email");
        assert_validation(ensure_user(&mut store, "").map(|_| ()), "missing email");
        assert_validation(user_exists(&mut store, "").map(|_| ()), "missing email");
        assert_eq!(store.calls, 0);
    }

    #[test]
    fn add_item_requires_name_and_description() {
        let mut store = MemStore::new();
        assert_validation(add_item(&mut store, "a@b.c", "", "desc"), "missing itemName");
        assert_validation(
            add_item(&mut store, "a@b.c", "name", ""),
            "missing itemDescription",
        );
        assert_eq!(store.calls, 0);
    }

    #[test]
    fn operations_for_unknown_user_are_not_found() {
        let mut store = MemStore::new();
        match add_item(&mut store, "ghost@example.com", "a", "b") {
            Err(OpError::NotFound(_)) => {}
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn user_exists_distinguishes_no_rows_from_failure() {
        let mut store = MemStore::new();
        assert!(!user_exists(&mut store, "nobody@example.com").unwrap());

        store.fail_get_user = true;
        match user_exists(&mut store, "nobody@example.com") {
            Err(OpError::Internal(m)) => assert!(m.starts_with("get_user failed")),
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[test]
    fn ensure_user_creates_one_user_and_one_list() {
        let mut store = MemStore::new();
        let uid = ensure_user(&mut store, "fresh@example.com").unwrap();
        assert_eq!(store.users.len(), 1);
        assert_eq!(store.lists_created, 1);
        assert_eq!(store.users[0].uuid, uid);
        assert_eq!(store.users[0].list_id, 1);
    }

    #[test]
    fn ensure_user_does_not_deduplicate_by_itself() {
        // The gate is responsible for checking existence first; calling
        // this twice provisions twice.
        let mut store = MemStore::new();
        ensure_user(&mut store, "twice@example.com").unwrap();
        ensure_user(&mut store, "twice@example.com").unwrap();
        assert_eq!(store.users.len(), 2);
        assert_eq!(store.lists_created, 2);
    }

    #[test]
    fn added_item_is_listed_verbatim() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "test1", "desc1").unwrap();

        let listed = list_items(&mut store, "u@example.com").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "test1");
        assert_eq!(listed[0].description, "desc1");
        assert!(!listed[0].done);
    }

    #[test]
    fn duplicate_active_name_is_rejected() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "dup", "first").unwrap();
        assert_validation(
            add_item(&mut store, "u@example.com", "dup", "second"),
            "item already exists",
        );
    }

    #[test]
    fn delete_of_missing_item_is_not_found() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        match delete_item(&mut store, "u@example.com", "nope") {
            Err(OpError::NotFound(m)) => assert_eq!(m, "item does not exist"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn second_delete_of_same_name_is_not_found() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "gone", "soon").unwrap();
        delete_item(&mut store, "u@example.com", "gone").unwrap();
        match delete_item(&mut store, "u@example.com", "gone") {
            Err(OpError::NotFound(m)) => assert_eq!(m, "item does not exist"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn deleted_item_is_excluded_from_listing() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "a", "x").unwrap();
        add_item(&mut store, "u@example.com", "b", "y").unwrap();
        delete_item(&mut store, "u@example.com", "a").unwrap();

        let listed = list_items(&mut store, "u@example.com").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "b");
        // the row itself is kept, only deactivated
        assert_eq!(store.items.len(), 2);
        assert!(!store.items[0].active);
    }

    #[test]
    fn mark_done_keeps_item_listed_as_done() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "task", "do it").unwrap();
        mark_done(&mut store, "u@example.com", "task", true).unwrap();

        let listed = list_items(&mut store, "u@example.com").unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].done);
        assert!(listed[0].active);
    }

    #[test]
    fn mark_done_with_revive_restores_soft_deleted_item() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "task", "do it").unwrap();
        delete_item(&mut store, "u@example.com", "task").unwrap();

        mark_done(&mut store, "u@example.com", "task", true).unwrap();
        let listed = list_items(&mut store, "u@example.com").unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].done);
    }

    #[test]
    fn mark_done_without_revive_skips_soft_deleted_item() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        add_item(&mut store, "u@example.com", "task", "do it").unwrap();
        delete_item(&mut store, "u@example.com", "task").unwrap();

        match mark_done(&mut store, "u@example.com", "task", false) {
            Err(OpError::NotFound(m)) => assert_eq!(m, "item does not exist"),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(list_items(&mut store, "u@example.com").unwrap().is_empty());
    }

    #[test]
    fn listing_preserves_insertion_order() {
        let (mut store, _) = MemStore::with_user("u@example.com");
        for name in ["first", "second", "third"] {
            add_item(&mut store, "u@example.com", name, "d").unwrap();
        }
        let names: Vec<String> = list_items(&mut store, "u@example.com")
            .unwrap()
            .into_iter()
            .map(|it| it.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn users_only_see_their_own_list() {
        let (mut store, _) = MemStore::with_user("a@example.com");
        store.create_user("b@example.com").unwrap();
        add_item(&mut store, "a@example.com", "mine", "d").unwrap();

        assert!(list_items(&mut store, "b@example.com").unwrap().is_empty());
        match delete_item(&mut store, "b@example.com", "mine") {
            Err(OpError::NotFound(_)) => {}
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn ping_acknowledges() {
        assert_eq!(ping(), "Pong");
    }
}
