//! Thread-safe in-memory collection preserving insertion order.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Collection, Mutation, Record};
use crate::error::{Result, RouterError};

#[derive(Debug)]
pub struct MemoryCollection<T> {
    inner: RwLock<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    rows: Vec<T>,
    /// id -> position in `rows`
    index: HashMap<String, usize>,
}

impl<T: Record> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }

    /// Build a collection pre-populated with `records` (duplicates rejected).
    pub fn with_records(records: Vec<T>) -> Result<Self> {
        let c = Self::new();
        {
            let mut inner = c.write()?;
            for r in records {
                inner.push(r)?;
            }
        }
        Ok(c)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner<T>>> {
        self.inner
            .read()
            .map_err(|_| RouterError::Storage(format!("{} collection lock poisoned", T::KIND)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner<T>>> {
        self.inner
            .write()
            .map_err(|_| RouterError::Storage(format!("{} collection lock poisoned", T::KIND)))
    }
}

impl<T: Record> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Inner<T> {
    fn push(&mut self, record: T) -> Result<()> {
        if self.index.contains_key(record.id()) {
            return Err(RouterError::conflict(format!(
                "{} '{}' already exists",
                T::KIND,
                record.id()
            )));
        }
        self.index.insert(record.id().to_string(), self.rows.len());
        self.rows.push(record);
        Ok(())
    }
}

#[async_trait]
impl<T: Record> Collection<T> for MemoryCollection<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        let inner = self.read()?;
        Ok(inner.index.get(id).map(|&pos| inner.rows[pos].clone()))
    }

    async fn list(&self) -> Result<Vec<T>> {
        Ok(self.read()?.rows.clone())
    }

    async fn insert(&self, record: T) -> Result<T> {
        let mut inner = self.write()?;
        inner.push(record.clone())?;
        Ok(record)
    }

    async fn update(&self, id: &str, apply: Mutation<T>) -> Result<T> {
        let mut inner = self.write()?;
        let pos = *inner
            .index
            .get(id)
            .ok_or_else(|| RouterError::not_found(T::KIND, id))?;

        // Work on a copy so a rejected mutation leaves the row untouched.
        let mut draft = inner.rows[pos].clone();
        apply(&mut draft)?;
        inner.rows[pos] = draft.clone();
        Ok(draft)
    }
}
