//! Reader registry
//!
//! Owns the set of active readers for one timing installation. The registry
//! is an explicit object created and torn down by the application layer and
//! injected where needed; there are no module-level globals.

use crate::config::ReaderConfig;
use crate::readers::{RfidReader, SerialReader, TcpIpReader, WiegandReader};
use crate::types::{ConnectionState, ReaderError, Result, TagHandler};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Build a reader from its configuration
///
/// This is the single place where `reader_type` is dispatched; invalid
/// configuration fails here, synchronously, before any thread is spawned.
pub fn build_reader(config: &ReaderConfig) -> Result<Arc<dyn RfidReader>> {
    match config {
        ReaderConfig::Serial(c) => Ok(Arc::new(SerialReader::from_config(c.clone())?)),
        ReaderConfig::TcpIp(c) => Ok(Arc::new(TcpIpReader::from_config(c.clone())?)),
        ReaderConfig::Wiegand(c) => Ok(Arc::new(WiegandReader::from_config(c.clone())?)),
    }
}

/// Registry of readers keyed by reader id
#[derive(Default)]
pub struct ReaderRegistry {
    readers: Mutex<HashMap<String, Arc<dyn RfidReader>>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register one reader per configuration entry
    pub fn from_configs(configs: &[ReaderConfig]) -> Result<Self> {
        let registry = Self::new();
        for config in configs {
            registry.register(build_reader(config)?)?;
        }
        Ok(registry)
    }

    /// Register an already-built reader
    ///
    /// Duplicate reader ids are a configuration error.
    pub fn register(&self, reader: Arc<dyn RfidReader>) -> Result<()> {
        let mut readers = self.readers.lock().unwrap();
        let id = reader.reader_id().to_string();
        if readers.contains_key(&id) {
            return Err(ReaderError::Configuration(format!(
                "Duplicate reader id: {}",
                id
            )));
        }
        readers.insert(id, reader);
        Ok(())
    }

    /// Fetch a reader by id
    pub fn get(&self, reader_id: &str) -> Option<Arc<dyn RfidReader>> {
        self.readers.lock().unwrap().get(reader_id).cloned()
    }

    /// Start every registered reader with the same handler
    ///
    /// Readers already running are left alone. The first hard failure stops
    /// the sweep and is returned; readers started before it keep running.
    pub fn start_all(&self, handler: TagHandler) -> Result<()> {
        let readers: Vec<_> = self.readers.lock().unwrap().values().cloned().collect();
        for reader in readers {
            match reader.start_reading(Arc::clone(&handler)) {
                Ok(()) | Err(ReaderError::AlreadyRunning) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Stop every registered reader
    pub fn stop_all(&self) {
        let readers: Vec<_> = self.readers.lock().unwrap().values().cloned().collect();
        for reader in readers {
            reader.stop_reading();
        }
    }

    /// Snapshot of each reader's connection state
    pub fn states(&self) -> Vec<(String, ConnectionState)> {
        let mut states: Vec<_> = self
            .readers
            .lock()
            .unwrap()
            .values()
            .map(|r| (r.reader_id().to_string(), r.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn len(&self) -> usize {
        self.readers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WiegandConfig;

    fn wiegand_config(id: &str) -> ReaderConfig {
        ReaderConfig::Wiegand(WiegandConfig::new(id, 17, 18))
    }

    #[test]
    fn test_registry_from_configs() {
        let registry =
            ReaderRegistry::from_configs(&[wiegand_config("gate_a"), wiegand_config("gate_b")])
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("gate_a").is_some());
        assert!(registry.get("gate_c").is_none());
    }

    #[test]
    fn test_duplicate_reader_id_rejected() {
        let result =
            ReaderRegistry::from_configs(&[wiegand_config("gate"), wiegand_config("gate")]);
        assert!(matches!(
            result,
            Err(ReaderError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let bad = ReaderConfig::Wiegand(WiegandConfig::new("gate", 17, 18).with_format_length(13));
        assert!(build_reader(&bad).is_err());
    }

    #[test]
    fn test_start_and_stop_all() {
        let registry = ReaderRegistry::from_configs(&[wiegand_config("gate")]).unwrap();
        registry.start_all(Arc::new(|_| {})).unwrap();
        assert_eq!(
            registry.states(),
            vec![("gate".to_string(), ConnectionState::Reading)]
        );
        registry.stop_all();
        assert_eq!(
            registry.states(),
            vec![("gate".to_string(), ConnectionState::Disconnected)]
        );
    }
}
