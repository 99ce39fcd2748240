//! # Settings Repository
//!
//! Key/value helpers for global [`Settings`] and per-store [`StoreSettings`].
//!
//! ```text
//! settings          key UNIQUE             e.g. "app.locale"        = "id-ID"
//! store_settings    (store_id, key) UNIQUE e.g. (toko-1, "receipt.footer")
//!
//! effective_value(store, key):  store_settings ──miss──► settings ──miss──► None
//! ```

use tracing::debug;

use kasir_core::{
    CreateSettings, CreateStoreSettings, Settings, SettingsWhereUnique, Store, StoreSettings,
    StoreSettingsWhereUnique, UpdateSettings, UpdateStoreSettings,
};

use super::Repository;
use crate::crud;
use crate::error::DbResult;
use crate::relations::parent;

impl Repository<'_, Settings> {
    /// Value stored under `key`, if any.
    pub async fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.conn().await?;
        let row = crud::find_unique::<Settings>(&mut conn, &SettingsWhereUnique::Key(key.to_string())).await?;
        Ok(row.map(|s| s.value))
    }

    /// Creates or overwrites `key`. A new key lands in the default category.
    pub async fn set_value(&self, key: &str, value: &str) -> DbResult<Settings> {
        let mut conn = self.conn().await?;
        let row = crud::upsert::<Settings>(
            &mut conn,
            &SettingsWhereUnique::Key(key.to_string()),
            CreateSettings::new(key, value),
            &UpdateSettings::value(value),
        )
        .await?;
        debug!(key, "Setting stored");
        Ok(row)
    }
}

impl Repository<'_, StoreSettings> {
    pub async fn store(&self, setting: &StoreSettings) -> DbResult<Store> {
        let mut conn = self.conn().await?;
        parent(&mut conn, &setting.store_id).await
    }

    pub async fn get_value(&self, store_id: &str, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.conn().await?;
        let row = crud::find_unique::<StoreSettings>(&mut conn, &StoreSettingsWhereUnique::store_key(store_id, key))
            .await?;
        Ok(row.map(|s| s.value))
    }

    pub async fn set_value(&self, store_id: &str, key: &str, value: &str) -> DbResult<StoreSettings> {
        let mut conn = self.conn().await?;
        let row = crud::upsert::<StoreSettings>(
            &mut conn,
            &StoreSettingsWhereUnique::store_key(store_id, key),
            CreateStoreSettings::new(store_id, key, value),
            &UpdateStoreSettings::value(value),
        )
        .await?;
        debug!(store_id, key, "Store setting stored");
        Ok(row)
    }

    /// The store's own value for `key`, else the global one.
    pub async fn effective_value(&self, store_id: &str, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.conn().await?;
        if let Some(own) =
            crud::find_unique::<StoreSettings>(&mut conn, &StoreSettingsWhereUnique::store_key(store_id, key)).await?
        {
            return Ok(Some(own.value));
        }
        let global = crud::find_unique::<Settings>(&mut conn, &SettingsWhereUnique::Key(key.to_string())).await?;
        Ok(global.map(|s| s.value))
    }
}
