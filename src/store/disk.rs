use super::{Snapshot, StateBackend};
use crate::core::address::Address;
use crate::core::rating::Rating;
use anyhow::{Context, Result, anyhow};
use crate::store::StoreError;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::fs::{File, TryLockError};
use std::path::Path;
use tracing::debug;

const LOCK_FILE: &str = "oracle.lock";

const OWNER_KEY: &[u8] = b"owner";
const KEEPER_KEY: &[u8] = b"keeper";
const SEQUENCE_KEY: &[u8] = b"sequence";

/// fjall-backed store state.
///
/// Partitions:
/// - `roles`: owner, keeper and the write sequence
/// - `ratings`: symbol -> JSON encoded [`Rating`]
/// - `registry`: big-endian slot -> symbol, so iteration yields first-update order
///
/// The directory is held under an exclusive lock for the lifetime of the
/// backend. A second open fails with [`StoreError::Locked`].
pub struct DiskBackend {
    keyspace: Keyspace,
    roles: PartitionHandle,
    ratings: PartitionHandle,
    registry: PartitionHandle,
    _lock: File,
}

impl DiskBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;
        let lock = lock_directory(path)?;

        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let roles = keyspace.open_partition("roles", PartitionCreateOptions::default())?;
        let ratings = keyspace.open_partition("ratings", PartitionCreateOptions::default())?;
        let registry = keyspace.open_partition("registry", PartitionCreateOptions::default())?;
        debug!("Opened disk store at {}", path.display());

        Ok(Self {
            keyspace,
            roles,
            ratings,
            registry,
            _lock: lock,
        })
    }

    fn read_address(&self, key: &[u8]) -> Result<Option<Address>> {
        self.roles
            .get(key)?
            .map(|value| {
                let text = std::str::from_utf8(&value).context("Stored address is not UTF-8")?;
                text.parse()
            })
            .transpose()
    }

    fn sync(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to sync store")
    }
}

fn lock_directory(path: &Path) -> Result<File> {
    let lock_path = path.join(LOCK_FILE);
    let file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => Err(StoreError::Locked {
            path: path.display().to_string(),
        }
        .into()),
        Err(TryLockError::Error(e)) => {
            Err(e).with_context(|| format!("Failed to lock {}", lock_path.display()))
        }
    }
}

impl StateBackend for DiskBackend {
    fn load(&self) -> Result<Snapshot> {
        let owner = self.read_address(OWNER_KEY)?;
        let keeper = self.read_address(KEEPER_KEY)?;
        let sequence = match self.roles.get(SEQUENCE_KEY)? {
            Some(value) => u64::from_be_bytes(
                <[u8; 8]>::try_from(&*value).map_err(|_| anyhow!("Corrupt write sequence"))?,
            ),
            None => 0,
        };

        let mut ratings = Vec::new();
        for entry in self.registry.iter() {
            let (_, symbol) = entry?;
            let record = self
                .ratings
                .get(&symbol)?
                .ok_or_else(|| anyhow!("Registry entry has no record: {:?}", symbol))?;
            let rating: Rating =
                serde_json::from_slice(&record).context("Failed to decode stored rating")?;
            ratings.push(rating);
        }

        Ok(Snapshot {
            owner,
            keeper,
            ratings,
            sequence,
        })
    }

    fn claim_owner(&self, owner: &Address) -> Result<()> {
        self.roles
            .insert(OWNER_KEY, owner.as_str().as_bytes().to_vec())?;
        self.sync()
    }

    fn write_keeper(&self, keeper: &Address) -> Result<()> {
        self.roles
            .insert(KEEPER_KEY, keeper.as_str().as_bytes().to_vec())?;
        self.sync()
    }

    fn write_rating(&self, rating: &Rating, registry_slot: Option<u64>, sequence: u64) -> Result<()> {
        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.ratings,
            rating.symbol.as_bytes().to_vec(),
            serde_json::to_vec(rating)?,
        );
        if let Some(slot) = registry_slot {
            batch.insert(
                &self.registry,
                slot.to_be_bytes().to_vec(),
                rating.symbol.as_bytes().to_vec(),
            );
        }
        batch.insert(
            &self.roles,
            SEQUENCE_KEY.to_vec(),
            sequence.to_be_bytes().to_vec(),
        );
        batch.commit().context("Failed to commit rating write")?;
        self.sync()
    }
}
