use std::ops::Deref;

use futures::Stream;
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Notification, Surreal,
};

use super::StoredObject;

/// Thin wrapper over a SurrealDB connection used by both the embedded vector
/// index backend (C4) and the logging sinks (C9) for their respective
/// tables. Connection details are opaque to callers beyond `new`/`memory`.
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;
        db.signin(Root { username, password }).await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(SurrealDbClient { client: db })
    }

    pub async fn query(&self, sql: impl AsRef<str>) -> Result<surrealdb::Response, Error> {
        self.client.query(sql.as_ref()).await
    }

    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select(T::table_name()).await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }

    pub async fn listen<T>(
        &self,
    ) -> Result<impl Stream<Item = Result<Notification<T>, Error>>, Error>
    where
        T: for<'de> StoredObject + std::marker::Unpin,
    {
        self.client.select(T::table_name()).live().await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// In-memory client for tests and the in-process embedded backend.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stored_object;
    use uuid::Uuid;

    stored_object!(Dummy, "dummy", { name: String });

    #[tokio::test]
    async fn store_get_delete_roundtrip() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to start in-memory surrealdb");

        let dummy = Dummy {
            id: "abc".to_string(),
            name: "first".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let stored = db.store_item(dummy.clone()).await.expect("store failed");
        assert!(stored.is_some());

        let fetched = db
            .get_item::<Dummy>(&dummy.id)
            .await
            .expect("fetch failed");
        assert_eq!(fetched.map(|d| d.id), Some(dummy.id.clone()));

        let deleted = db
            .delete_item::<Dummy>(&dummy.id)
            .await
            .expect("delete failed");
        assert!(deleted.is_some());

        let fetch_post = db
            .get_item::<Dummy>("abc")
            .await
            .expect("fetch after delete failed");
        assert!(fetch_post.is_none());
    }
}
