use devnet_primitives::{Address, Bytes, HashMap, U256, hash_map::Entry};
use devnet_state_api::StateError;
use parking_lot::Mutex;

use crate::RemoteStateSource;

#[derive(Debug, Default)]
struct Cache {
    nonces: HashMap<(u64, Address), u64>,
    balances: HashMap<(u64, Address), U256>,
    code: HashMap<(u64, Address), Bytes>,
    storage: HashMap<(u64, Address, U256), U256>,
}

/// A cached version of a [`RemoteStateSource`].
///
/// Data of a historical block never changes, so every successful response
/// is kept for the lifetime of the cache. Failed requests are not cached.
#[derive(Debug)]
pub struct CachedRemoteState<RemoteT: RemoteStateSource> {
    remote: RemoteT,
    cache: Mutex<Cache>,
}

impl<RemoteT: RemoteStateSource> CachedRemoteState<RemoteT> {
    /// Constructs a new [`CachedRemoteState`].
    pub fn new(remote: RemoteT) -> Self {
        Self {
            remote,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Retrieves the underlying source.
    pub fn remote(&self) -> &RemoteT {
        &self.remote
    }
}

/// Looks up `key` in the cache selected by `select`, or fetches and caches
/// it. The lock is not held while fetching.
fn get_or_fetch<KeyT, ValueT>(
    cache: &Mutex<Cache>,
    select: impl Fn(&mut Cache) -> &mut HashMap<KeyT, ValueT>,
    key: KeyT,
    fetch: impl FnOnce() -> Result<ValueT, StateError>,
) -> Result<ValueT, StateError>
where
    KeyT: Eq + std::hash::Hash,
    ValueT: Clone,
{
    if let Some(value) = select(&mut cache.lock()).get(&key) {
        return Ok(value.clone());
    }

    let value = fetch()?;

    let mut cache = cache.lock();
    match select(&mut cache).entry(key) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => Ok(entry.insert(value).clone()),
    }
}

impl<RemoteT: RemoteStateSource> RemoteStateSource for CachedRemoteState<RemoteT> {
    fn nonce(&self, address: Address, block_number: u64) -> Result<u64, StateError> {
        get_or_fetch(
            &self.cache,
            |cache| &mut cache.nonces,
            (block_number, address),
            || self.remote.nonce(address, block_number),
        )
    }

    fn balance(&self, address: Address, block_number: u64) -> Result<U256, StateError> {
        get_or_fetch(
            &self.cache,
            |cache| &mut cache.balances,
            (block_number, address),
            || self.remote.balance(address, block_number),
        )
    }

    fn code(&self, address: Address, block_number: u64) -> Result<Bytes, StateError> {
        get_or_fetch(
            &self.cache,
            |cache| &mut cache.code,
            (block_number, address),
            || self.remote.code(address, block_number),
        )
    }

    fn storage_at(
        &self,
        address: Address,
        index: U256,
        block_number: u64,
    ) -> Result<U256, StateError> {
        get_or_fetch(
            &self.cache,
            |cache| &mut cache.storage,
            (block_number, address, index),
            || self.remote.storage_at(address, index, block_number),
        )
    }
}
