//! Versioned, expiring, size-capped values over a shared [`Cache`].
//!
//! A value is stored as an [`Envelope`] `{ v, t, exp?, data }`. Reads fall
//! back to the value's initial state whenever the envelope is missing,
//! unparsable, expired, rejected by validation or from an unmigratable
//! version. Writes replace the whole envelope in one store call and then
//! broadcast the new value to every subscriber of the key.

use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Broadcaster, Cache, CacheError, Clock, Message, OriginId, PersistOptions, Subscription,
    SystemClock,
};

/// On-disk wrapper around a persisted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Schema version.
    pub v: u32,
    /// Saved at, Unix milliseconds.
    pub t: i64,
    /// Expires at, Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub data: T,
}

/// Envelope as read back, before anything about it is trusted.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    v: Option<u32>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    data: serde_json::Value,
}

/// A value change delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub value: T,
    pub origin: OriginId,
    pub saved_at: i64,
}

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReceipt {
    pub saved_at: i64,
    pub bytes: usize,
}

/// Details passed to the quota hook when a write is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaEviction {
    pub key: String,
    pub attempted_bytes: usize,
}

type Initial<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Validator<T> = Arc<dyn Fn(serde_json::Value) -> Option<T> + Send + Sync>;
type Migrator<T> = Arc<dyn Fn(serde_json::Value, u32) -> Option<T> + Send + Sync>;
type QuotaHook = Arc<dyn Fn(&QuotaEviction) + Send + Sync>;

/// Builder for [`PersistedState`].
pub struct PersistedStateBuilder<T> {
    options: PersistOptions,
    initial: Initial<T>,
    validate: Option<Validator<T>>,
    migrate: Option<Migrator<T>>,
    on_quota_eviction: Option<QuotaHook>,
    clock: Arc<dyn Clock>,
    origin: Option<OriginId>,
}

impl<T> PersistedStateBuilder<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Validate (and sanitize) candidate data. Return `None` to reject it.
    ///
    /// Without a validator, data is accepted if it deserializes into `T`.
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(serde_json::Value) -> Option<T> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// Convert data written under an older version.
    pub fn migrate<F>(mut self, f: F) -> Self
    where
        F: Fn(serde_json::Value, u32) -> Option<T> + Send + Sync + 'static,
    {
        self.migrate = Some(Arc::new(f));
        self
    }

    /// Called when a write is refused for exceeding the size cap.
    pub fn on_quota_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn(&QuotaEviction) + Send + Sync + 'static,
    {
        self.on_quota_eviction = Some(Arc::new(f));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identify the writer. A random origin is generated otherwise.
    pub fn origin(mut self, origin: OriginId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Attach to a store and its broadcaster.
    pub fn build(self, cache: Cache, broadcaster: Broadcaster) -> PersistedState<T> {
        let validate: Validator<T> = match self.validate {
            Some(validate) => validate,
            None => Arc::new(|value: serde_json::Value| serde_json::from_value(value).ok()),
        };
        let origin = self.origin.unwrap_or_else(OriginId::generate);
        let current: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

        // Keep this tab's cached value in step with writes made by other tabs.
        let sync = {
            let current = Arc::clone(&current);
            let validate = Arc::clone(&validate);
            let own = origin.clone();
            broadcaster.subscribe(self.options.key.clone(), move |message: &Message| {
                if message.origin == own {
                    return;
                }
                let next = validate(message.payload.clone());
                if let Ok(mut slot) = current.lock() {
                    *slot = next;
                }
            })
        };

        PersistedState {
            storage_key: self.options.storage_key(),
            options: self.options,
            origin,
            cache,
            broadcaster,
            clock: self.clock,
            initial: self.initial,
            validate,
            migrate: self.migrate,
            on_quota_eviction: self.on_quota_eviction,
            current,
            _sync: sync,
        }
    }
}

/// A typed value persisted in an [`Envelope`] and shared across tabs.
pub struct PersistedState<T> {
    options: PersistOptions,
    storage_key: String,
    origin: OriginId,
    cache: Cache,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    initial: Initial<T>,
    validate: Validator<T>,
    migrate: Option<Migrator<T>>,
    on_quota_eviction: Option<QuotaHook>,
    current: Arc<Mutex<Option<T>>>,
    _sync: Subscription,
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Start building a persisted value with the given default.
    pub fn builder<F>(options: PersistOptions, initial: F) -> PersistedStateBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        PersistedStateBuilder {
            options,
            initial: Arc::new(initial),
            validate: None,
            migrate: None,
            on_quota_eviction: None,
            clock: Arc::new(SystemClock),
            origin: None,
        }
    }

    /// Logical key.
    pub fn key(&self) -> &str {
        &self.options.key
    }

    /// Namespaced key used in the store.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The writer identity stamped on broadcasts from this instance.
    pub fn origin(&self) -> &OriginId {
        &self.origin
    }

    /// Current value, read from the store on first use.
    pub fn get(&self) -> T {
        if let Some(value) = self.cached() {
            return value;
        }
        self.decode()
    }

    /// Replace the value.
    ///
    /// The in-memory value is updated even when the store write fails or is
    /// refused for size, so the current tab keeps working.
    pub fn set(&self, value: T) -> Result<SaveReceipt, CacheError> {
        self.write(value)
    }

    /// Read-modify-write the value.
    pub fn update<F>(&self, f: F) -> Result<SaveReceipt, CacheError>
    where
        F: FnOnce(T) -> T,
    {
        let next = f(self.get());
        self.write(next)
    }

    /// Delete the stored value and announce the initial value.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store_cached(None);
        let result = self.cache.delete(&self.storage_key);
        let initial = (self.initial)();
        self.publish(&initial, self.clock.now_millis());
        result
    }

    /// Listen for changes to this key from any tab, this one included.
    ///
    /// Payloads rejected by validation are not delivered.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Change<T>) + Send + Sync + 'static,
    {
        let validate = Arc::clone(&self.validate);
        self.broadcaster
            .subscribe(self.options.key.clone(), move |message: &Message| {
                if let Some(value) = validate(message.payload.clone()) {
                    listener(&Change {
                        value,
                        origin: message.origin.clone(),
                        saved_at: message.saved_at,
                    });
                }
            })
    }

    fn decode(&self) -> T {
        let value = match self.read_envelope() {
            Some(value) => value,
            None => (self.initial)(),
        };
        self.store_cached(Some(value.clone()));
        value
    }

    fn read_envelope(&self) -> Option<T> {
        let raw = match self.cache.get_raw(&self.storage_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "persisted read failed");
                return None;
            }
        };
        let envelope: RawEnvelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(key = %self.storage_key, error = %e, "discarding unparsable envelope");
                return None;
            }
        };

        if envelope.exp.is_some_and(|exp| self.clock.now_millis() > exp) {
            debug!(key = %self.storage_key, "envelope expired");
            if let Err(e) = self.cache.delete(&self.storage_key) {
                warn!(key = %self.storage_key, error = %e, "failed to delete expired envelope");
            }
            return None;
        }

        match envelope.v {
            Some(v) if v == self.options.version => {
                let valid = (self.validate)(envelope.data);
                if valid.is_none() {
                    debug!(key = %self.storage_key, "envelope rejected by validation");
                }
                valid
            }
            Some(old) => {
                let migrate = self.migrate.as_ref()?;
                let migrated = migrate(envelope.data, old)?;
                debug!(
                    key = %self.storage_key,
                    from = old,
                    to = self.options.version,
                    "migrated envelope"
                );
                if let Err(e) = self.write(migrated.clone()) {
                    warn!(
                        key = %self.storage_key,
                        error = %e,
                        "failed to persist migrated envelope"
                    );
                }
                Some(migrated)
            }
            None => None,
        }
    }

    fn write(&self, value: T) -> Result<SaveReceipt, CacheError> {
        let saved_at = self.clock.now_millis();
        let envelope = Envelope {
            v: self.options.version,
            t: saved_at,
            exp: self.options.ttl_millis.map(|ttl| saved_at + ttl),
            data: &value,
        };
        let serialized = serde_json::to_vec(&envelope);
        self.store_cached(Some(value.clone()));
        let serialized = serialized?;

        if let Some(max_bytes) = self.options.max_bytes {
            if serialized.len() > max_bytes {
                let eviction = QuotaEviction {
                    key: self.options.key.clone(),
                    attempted_bytes: serialized.len(),
                };
                warn!(
                    key = %self.storage_key,
                    bytes = serialized.len(),
                    max_bytes,
                    "refusing oversized write"
                );
                if let Some(hook) = &self.on_quota_eviction {
                    hook(&eviction);
                }
                return Err(CacheError::TooLarge {
                    key: eviction.key,
                    attempted_bytes: eviction.attempted_bytes,
                    max_bytes,
                });
            }
        }

        self.cache.set_raw(&self.storage_key, &serialized)?;
        self.publish(&value, saved_at);
        Ok(SaveReceipt {
            saved_at,
            bytes: serialized.len(),
        })
    }

    fn publish(&self, value: &T, saved_at: i64) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "failed to encode broadcast");
                return;
            }
        };
        self.broadcaster.publish(&Message {
            key: self.options.key.clone(),
            origin: self.origin.clone(),
            saved_at,
            payload,
        });
    }

    fn cached(&self) -> Option<T> {
        self.current.lock().ok().and_then(|slot| slot.clone())
    }

    fn store_cached(&self, value: Option<T>) {
        if let Ok(mut slot) = self.current.lock() {
            *slot = value;
        }
    }
}

impl<T> std::fmt::Debug for PersistedState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedState")
            .field("storage_key", &self.storage_key)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
