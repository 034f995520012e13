use super::{join_storage_path, read_from_start, ContentReader, Output};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DEFAULT_BASE_URL: &str = "https://mock-output.example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// An operation issued against [`MockOutput`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Put(String),
    Delete(String),
}

/// In-memory output with read-back and fault injection.
#[derive(Clone)]
pub struct MockOutput {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    operations: Arc<Mutex<Vec<Operation>>>,
    fail_on_put: Option<usize>,
    put_attempts: Arc<Mutex<usize>>,
    base_url: String,
    prefix: String,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_on_put: None,
            put_attempts: Arc::new(Mutex::new(0)),
            base_url: DEFAULT_BASE_URL.to_string(),
            prefix: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Fail the `n`th put (1-based) without storing anything.
    pub fn with_failure_on_put(mut self, n: usize) -> Self {
        self.fail_on_put = Some(n);
        self
    }

    /// Stored object at a full storage path (prefix included).
    pub fn get_object(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn get_objects(&self) -> HashMap<String, StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    /// Successful operations, in the order they completed.
    pub fn get_operations(&self) -> Vec<Operation> {
        self.operations.lock().unwrap().clone()
    }

    pub fn get_put_count(&self) -> usize {
        self.operations
            .lock()
            .unwrap()
            .iter()
            .filter(|op| matches!(op, Operation::Put(_)))
            .count()
    }

    fn storage_path(&self, key: &str) -> String {
        join_storage_path(&[&self.prefix, key])
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Output for MockOutput {
    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    async fn put_reader(
        &self,
        key: &str,
        content: &mut dyn ContentReader,
        content_type: &str,
    ) -> Result<()> {
        let attempt = {
            let mut attempts = self.put_attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        let path = self.storage_path(key);
        if self.fail_on_put == Some(attempt) {
            return Err(Error::Mock(format!("simulated failure putting {}", path)));
        }

        let data = read_from_start(content).await?;
        self.objects.lock().unwrap().insert(
            path.clone(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        self.operations.lock().unwrap().push(Operation::Put(path.clone()));
        tracing::info!("output: put {}", path);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.storage_path(key);
        self.objects.lock().unwrap().remove(&path);
        self.operations
            .lock()
            .unwrap()
            .push(Operation::Delete(path.clone()));
        tracing::info!("output: delete {}", path);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}.json", self.base_url, self.storage_path(key))
    }

    fn describe(&self) -> String {
        format!("in-memory output ({})", self.base_url)
    }
}
