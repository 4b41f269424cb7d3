//! SQLite persistence for characters and knowledge bases.
//!
//! Each record is serialised to JSON and stored as a BLOB:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS characters (
//!     id         TEXT PRIMARY KEY,
//!     name       TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! -- knowledge_bases has the same shape
//! ```
//!
//! JSON blobs keep the schema stable while the state types evolve; missing
//! fields fall back to their serde defaults on load. An optional CRC-32 per
//! row detects corruption.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::character::Character;
use crate::config::PersistenceConfig;
use crate::error::{PersonaError, Result};
use crate::types::{CharacterId, KnowledgeBaseId};
use crate::world_book::KnowledgeBase;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS characters (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        checksum   TEXT
    );
    CREATE TABLE IF NOT EXISTS knowledge_bases (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        data       BLOB NOT NULL,
        updated_at TEXT NOT NULL,
        checksum   TEXT
    );";

/// The two record tables.
#[derive(Debug, Clone, Copy)]
enum Table {
    Characters,
    KnowledgeBases,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Characters => "characters",
            Table::KnowledgeBases => "knowledge_bases",
        }
    }
}

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309), reflected polynomial.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to an open SQLite store.
///
/// ```no_run
/// # use persona_core::persistence::PersonaStore;
/// # use persona_core::config::PersistenceConfig;
/// # use persona_core::Character;
/// let store = PersonaStore::open("companions.db", &PersistenceConfig::default())?;
/// let mina = Character::new("Mina", "A cheerful barista.");
/// store.save_character(&mina)?;
/// let loaded = store.load_character(&mina.id)?;
/// # Ok::<(), persona_core::PersonaError>(())
/// ```
pub struct PersonaStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersonaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersonaStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Persona store opened");

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Upsert a character.
    ///
    /// # Errors
    /// Returns [`PersonaError::Serialization`] or [`PersonaError::Database`].
    pub fn save_character(&self, character: &Character) -> Result<()> {
        self.save(Table::Characters, character.id.0, &character.name, character)
    }

    /// Load a character, `None` if absent.
    ///
    /// # Errors
    /// Returns [`PersonaError::Serialization`] or [`PersonaError::Database`].
    pub fn load_character(&self, id: &CharacterId) -> Result<Option<Character>> {
        self.load(Table::Characters, id.0)
    }

    /// Load a character that must exist.
    ///
    /// # Errors
    /// Returns [`PersonaError::CharacterNotFound`] if no row exists.
    pub fn require_character(&self, id: &CharacterId) -> Result<Character> {
        self.load_character(id)?
            .ok_or(PersonaError::CharacterNotFound(*id))
    }

    /// Delete a character. Returns `true` if a row was removed.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn delete_character(&self, id: &CharacterId) -> Result<bool> {
        self.delete(Table::Characters, id.0)
    }

    /// IDs and names of every stored character.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn list_characters(&self) -> Result<Vec<(CharacterId, String)>> {
        Ok(self
            .list(Table::Characters)?
            .into_iter()
            .map(|(id, name)| (CharacterId(id), name))
            .collect())
    }

    // ------------------------------------------------------------------
    // Knowledge bases
    // ------------------------------------------------------------------

    /// Upsert a knowledge base.
    ///
    /// # Errors
    /// Returns [`PersonaError::EmptyKeywordEntry`] if an entry is invalid,
    /// otherwise serialisation or database errors.
    pub fn save_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()> {
        kb.validate()?;
        self.save(Table::KnowledgeBases, kb.id.0, &kb.name, kb)
    }

    /// Load a knowledge base, `None` if absent.
    ///
    /// # Errors
    /// Returns serialisation, validation or database errors.
    pub fn load_knowledge_base(&self, id: &KnowledgeBaseId) -> Result<Option<KnowledgeBase>> {
        let kb: Option<KnowledgeBase> = self.load(Table::KnowledgeBases, id.0)?;
        if let Some(kb) = &kb {
            kb.validate()?;
        }
        Ok(kb)
    }

    /// Load a knowledge base that must exist.
    ///
    /// # Errors
    /// Returns [`PersonaError::KnowledgeBaseNotFound`] if no row exists.
    pub fn require_knowledge_base(&self, id: &KnowledgeBaseId) -> Result<KnowledgeBase> {
        self.load_knowledge_base(id)?
            .ok_or(PersonaError::KnowledgeBaseNotFound(*id))
    }

    /// Load the knowledge bases a character has enabled, skipping missing ones.
    ///
    /// # Errors
    /// Returns serialisation, validation or database errors.
    pub fn load_enabled(&self, character: &Character) -> Result<Vec<KnowledgeBase>> {
        let mut out = Vec::with_capacity(character.enabled_world_books.len());
        for id in &character.enabled_world_books {
            match self.load_knowledge_base(id)? {
                Some(kb) => out.push(kb),
                None => warn!(character = %character.id, kb = %id, "Enabled knowledge base missing"),
            }
        }
        Ok(out)
    }

    /// Delete a knowledge base. Returns `true` if a row was removed.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn delete_knowledge_base(&self, id: &KnowledgeBaseId) -> Result<bool> {
        self.delete(Table::KnowledgeBases, id.0)
    }

    /// IDs and names of every stored knowledge base.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn list_knowledge_bases(&self) -> Result<Vec<(KnowledgeBaseId, String)>> {
        Ok(self
            .list(Table::KnowledgeBases)?
            .into_iter()
            .map(|(id, name)| (KnowledgeBaseId(id), name))
            .collect())
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Store backup completed"
        );
        Ok(())
    }

    /// `PRAGMA integrity_check`; `true` when healthy.
    ///
    /// # Errors
    /// Returns [`PersonaError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Database file path, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ------------------------------------------------------------------
    // Shared row helpers
    // ------------------------------------------------------------------

    fn save<T: Serialize>(&self, table: Table, id: Uuid, name: &str, record: &T) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(record).map_err(|e| PersonaError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));

        let sql = format!(
            "INSERT INTO {} (id, name, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            table.name()
        );
        self.conn.execute(
            &sql,
            params![id.to_string(), name, json, Utc::now().to_rfc3339(), checksum],
        )?;

        debug!(
            table = table.name(),
            id = %id,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved record"
        );
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, table: Table, id: Uuid) -> Result<Option<T>> {
        let sql = format!("SELECT data, checksum FROM {} WHERE id = ?1", table.name());
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        table = table.name(),
                        id = %id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible corruption"
                    );
                }
            }
        }

        let record =
            serde_json::from_slice(&data).map_err(|e| PersonaError::Serialization(e.to_string()))?;
        debug!(table = table.name(), id = %id, "Loaded record");
        Ok(Some(record))
    }

    fn delete(&self, table: Table, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.name());
        Ok(self.conn.execute(&sql, params![id.to_string()])? > 0)
    }

    fn list(&self, table: Table) -> Result<Vec<(Uuid, String)>> {
        let sql = format!("SELECT id, name FROM {} ORDER BY name", table.name());
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name) = row?;
            match Uuid::parse_str(&id) {
                Ok(uuid) => out.push((uuid, name)),
                Err(_) => warn!(table = table.name(), id = %id, "Skipping row with invalid UUID"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use crate::world_book::WorldBookEntry;
    use chrono::TimeZone;

    fn store() -> PersonaStore {
        PersonaStore::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    fn sample_character() -> Character {
        let mut c = Character::new("Mina", "A cheerful barista.");
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().expect("valid");
        c.push_message(Message::user("hi", t)).expect("push");
        c.mood.energy_level = 42;
        c
    }

    #[test]
    fn character_round_trip() {
        let store = store();
        let c = sample_character();
        store.save_character(&c).expect("save");
        let loaded = store.load_character(&c.id).expect("load").expect("present");
        assert_eq!(loaded, c);
        assert_eq!(store.list_characters().expect("list"), vec![(c.id, "Mina".to_string())]);
    }

    #[test]
    fn missing_character() {
        let store = store();
        let id = CharacterId::new();
        assert!(store.load_character(&id).expect("load").is_none());
        assert!(matches!(
            store.require_character(&id),
            Err(PersonaError::CharacterNotFound(_))
        ));
        assert!(!store.delete_character(&id).expect("delete"));
    }

    #[test]
    fn knowledge_bases_for_character() {
        let store = store();
        let kb = KnowledgeBase::new("Town")
            .with_entry(WorldBookEntry::keyword(["cafe"], "The cafe opens at 8.").expect("keys"));
        store.save_knowledge_base(&kb).expect("save");

        let mut c = sample_character();
        c.enabled_world_books = vec![kb.id, KnowledgeBaseId::new()];
        let enabled = store.load_enabled(&c).expect("load");
        assert_eq!(enabled, vec![kb]);
    }

    #[test]
    fn missing_knowledge_base() {
        let store = store();
        let id = KnowledgeBaseId::new();
        assert!(matches!(
            store.require_knowledge_base(&id),
            Err(PersonaError::KnowledgeBaseNotFound(missing)) if missing == id
        ));

        let kb = KnowledgeBase::new("Town")
            .with_entry(WorldBookEntry::constant("The river floods every spring."));
        store.save_knowledge_base(&kb).expect("save");
        assert_eq!(store.require_knowledge_base(&kb.id).expect("present"), kb);
    }

    #[test]
    fn corrupted_checksum_still_loads() {
        let store = store();
        let c = sample_character();
        store.save_character(&c).expect("save");
        store
            .conn
            .execute(
                "UPDATE characters SET checksum = 'deadbeef' WHERE id = ?1",
                params![c.id.0.to_string()],
            )
            .expect("corrupt");
        assert!(store.load_character(&c.id).expect("load").is_some());
    }

    #[test]
    fn file_store_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PersistenceConfig::default();
        let store = PersonaStore::open(dir.path().join("persona.db"), &config).expect("open");
        let c = sample_character();
        store.save_character(&c).expect("save");
        assert!(store.integrity_check().expect("check"));

        let backup_path = dir.path().join("persona_backup.db");
        store.backup(&backup_path).expect("backup");
        let restored = PersonaStore::open(&backup_path, &config).expect("open backup");
        assert_eq!(restored.require_character(&c.id).expect("present").name, "Mina");
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
