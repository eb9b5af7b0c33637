//! DeviceRegistry: one live instance per device model.
//!
//! # Lifecycle (for beginners)
//!
//! A presenter dongle shows up as several device nodes (one hidraw node per
//! HID interface plus evdev nodes).  They all belong to the same logical
//! device, so the registry keeps exactly one [`DeviceInstance`] per
//! [`DeviceModel`], created the first time one of its nodes appears:
//!
//! ```text
//!  Unregistered ──add_path──► Active ──last path removed──► Idle
//!                               ▲                            │
//!                               └──────── add_path ──────────┘
//! ```
//!
//! While active, the instance has one reader thread that services all of its
//! nodes.  The thread runs a [`NodeMonitor`] with the shared [`KnownNodes`]
//! set and a stop flag.  Raising the flag (last path removed, or shutdown)
//! makes the monitor return at its next poll timeout.  A re-added path
//! waits for that return before a new reader starts, so two readers never
//! overlap.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use spotlight_core::{DeviceModel, DeviceNode};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("device node {0} does not exist")]
    NodeMissing(PathBuf),
    #[error("failed to spawn reader thread for {model}: {source}")]
    Spawn {
        model: DeviceModel,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Unregistered,
    Active,
    Idle,
}

/// Insertion-ordered set of node paths shared between an instance and its
/// reader thread.
#[derive(Debug, Clone, Default)]
pub struct KnownNodes {
    inner: Arc<Mutex<Vec<DeviceNode>>>,
}

impl KnownNodes {
    fn lock(&self) -> MutexGuard<'_, Vec<DeviceNode>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `false` if the path was already known.
    pub fn insert(&self, node: DeviceNode) -> bool {
        let mut nodes = self.lock();
        if nodes.iter().any(|n| n.path == node.path) {
            return false;
        }
        nodes.push(node);
        true
    }

    pub fn remove(&self, path: &Path) -> bool {
        let mut nodes = self.lock();
        let before = nodes.len();
        nodes.retain(|n| n.path != path);
        nodes.len() != before
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().iter().any(|n| n.path == path)
    }

    pub fn snapshot(&self) -> Vec<DeviceNode> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// The body of a reader thread.
pub trait NodeMonitor: Send + Sync + 'static {
    /// Called on the registry's thread right before a new reader starts.
    fn prepare(&self) {}

    /// Services `nodes` until `stop` is raised or the set becomes empty.
    fn run(&self, nodes: KnownNodes, stop: Arc<AtomicBool>);
}

struct ReaderSlot {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl ReaderSlot {
    fn is_alive(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// The single live object for one device model.
pub struct DeviceInstance {
    model: DeviceModel,
    nodes: KnownNodes,
    monitor: Arc<dyn NodeMonitor>,
    reader: Mutex<ReaderSlot>,
    starts: AtomicUsize,
}

impl DeviceInstance {
    fn new(model: DeviceModel, monitor: Arc<dyn NodeMonitor>) -> Self {
        Self {
            model,
            nodes: KnownNodes::default(),
            monitor,
            reader: Mutex::new(ReaderSlot {
                handle: None,
                stop: Arc::new(AtomicBool::new(true)),
            }),
            starts: AtomicUsize::new(0),
        }
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn nodes(&self) -> &KnownNodes {
        &self.nodes
    }

    /// Records `node` and makes sure a reader is running.
    ///
    /// Returns `Ok(false)` if the path was already known.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NodeMissing`] if the node is not on disk, and
    /// [`RegistryError::Spawn`] if the reader thread could not be started.
    pub fn add_path(&self, node: DeviceNode) -> Result<bool, RegistryError> {
        if !node.is_present() {
            return Err(RegistryError::NodeMissing(node.path));
        }
        let path = node.path.clone();
        let added = self.nodes.insert(node);
        if added {
            info!(model = %self.model, path = %path.display(), "device node added");
        }
        self.ensure_monitoring()?;
        Ok(added)
    }

    /// Forgets `path`; stops the reader when no paths remain.
    pub fn remove_path(&self, path: &Path) -> bool {
        if !self.nodes.remove(path) {
            return false;
        }
        info!(model = %self.model, path = %path.display(), "device node removed");
        if self.nodes.is_empty() {
            self.stop();
        }
        true
    }

    /// Starts a reader unless one is already alive.  Returns whether a new
    /// thread was started.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Spawn`] if the OS refuses to create the thread.
    pub fn ensure_monitoring(&self) -> Result<bool, RegistryError> {
        let mut slot = self.lock_reader();
        if slot.is_alive() {
            return Ok(false);
        }
        if self.nodes.is_empty() {
            return Ok(false);
        }

        // A stopped reader may still be inside its last poll.  It must drop its
        // grabs and reset the engine before the next one takes over.
        if let Some(previous) = slot.handle.take() {
            if previous.join().is_err() {
                error!(model = %self.model, "previous reader thread panicked");
            }
        }

        self.monitor.prepare();
        let stop = Arc::new(AtomicBool::new(false));
        let monitor = Arc::clone(&self.monitor);
        let nodes = self.nodes.clone();
        let thread_stop = Arc::clone(&stop);
        let model = self.model;
        let handle = std::thread::Builder::new()
            .name(format!("spotlight-{}", model.key()))
            .spawn(move || {
                monitor.run(nodes, thread_stop);
                debug!(%model, "reader thread exited");
            })
            .map_err(|source| {
                error!(%model, "failed to spawn reader thread: {source}");
                RegistryError::Spawn { model, source }
            })?;

        *slot = ReaderSlot {
            handle: Some(handle),
            stop,
        };
        self.starts.fetch_add(1, Ordering::SeqCst);
        info!(model = %self.model, "monitoring started");
        Ok(true)
    }

    /// Raises the reader's stop flag.
    pub fn stop(&self) {
        let slot = self.lock_reader();
        if !slot.stop.swap(true, Ordering::SeqCst) {
            info!(model = %self.model, "monitoring stopped");
        }
    }

    /// Stops the reader and waits for it to exit.
    pub fn shutdown(&self) {
        self.stop();
        let handle = self.lock_reader().handle.take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn state(&self) -> InstanceState {
        if self.nodes.is_empty() || !self.lock_reader().is_alive() {
            InstanceState::Idle
        } else {
            InstanceState::Active
        }
    }

    /// How many reader threads this instance has started.
    pub fn reader_starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn lock_reader(&self) -> MutexGuard<'_, ReaderSlot> {
        self.reader.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Builds the reader body for a model the first time one of its nodes shows up.
pub type MonitorFactory = Box<dyn Fn(DeviceModel) -> Arc<dyn NodeMonitor> + Send + Sync>;

/// Process-wide map from model to its one instance.
pub struct DeviceRegistry {
    factory: MonitorFactory,
    instances: Mutex<HashMap<DeviceModel, Arc<DeviceInstance>>>,
}

impl DeviceRegistry {
    pub fn new(factory: MonitorFactory) -> Self {
        Self {
            factory,
            instances: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceModel, Arc<DeviceInstance>>> {
        self.instances.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the instance for `model`, creating it on first use.
    pub fn instance(&self, model: DeviceModel) -> Arc<DeviceInstance> {
        let mut instances = self.lock();
        let instance = instances
            .entry(model)
            .or_insert_with(|| Arc::new(DeviceInstance::new(model, (self.factory)(model))));
        Arc::clone(instance)
    }

    pub fn get(&self, model: DeviceModel) -> Option<Arc<DeviceInstance>> {
        self.lock().get(&model).cloned()
    }

    /// # Errors
    ///
    /// See [`DeviceInstance::add_path`].
    pub fn add_path(&self, model: DeviceModel, node: DeviceNode) -> Result<bool, RegistryError> {
        self.instance(model).add_path(node)
    }

    /// Removes `path` from whichever instance knows it.
    pub fn remove_path(&self, path: &Path) -> bool {
        let instances: Vec<Arc<DeviceInstance>> = self.lock().values().cloned().collect();
        instances.iter().any(|i| i.remove_path(path))
    }

    pub fn state(&self, model: DeviceModel) -> InstanceState {
        self.get(model)
            .map_or(InstanceState::Unregistered, |i| i.state())
    }

    /// Stops every reader and waits for them.
    pub fn shutdown(&self) {
        let instances: Vec<Arc<DeviceInstance>> = self.lock().values().cloned().collect();
        for instance in instances {
            instance.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_core::NodeKind;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    /// Blocks until stopped, counting how many times it ran.
    #[derive(Default)]
    struct ParkedMonitor {
        runs: AtomicUsize,
        prepared: AtomicUsize,
    }

    impl NodeMonitor for ParkedMonitor {
        fn prepare(&self) {
            self.prepared.fetch_add(1, Ordering::SeqCst);
        }

        fn run(&self, _nodes: KnownNodes, stop: Arc<AtomicBool>) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    fn temp_node() -> DeviceNode {
        let path = std::env::temp_dir().join(format!("hidraw_test_{}", Uuid::new_v4()));
        std::fs::write(&path, b"").unwrap();
        DeviceNode::new(path, NodeKind::Raw)
    }

    fn registry() -> (DeviceRegistry, Arc<ParkedMonitor>) {
        let monitor = Arc::new(ParkedMonitor::default());
        let shared = Arc::clone(&monitor);
        let registry = DeviceRegistry::new(Box::new(move |_| shared.clone() as Arc<dyn NodeMonitor>));
        (registry, monitor)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    const MODEL: DeviceModel = DeviceModel::BaseusOrangeDotAi;

    #[test]
    fn test_unknown_model_is_unregistered() {
        let (registry, _) = registry();
        assert_eq!(registry.state(MODEL), InstanceState::Unregistered);
    }

    #[test]
    fn test_instance_is_created_once_per_model() {
        // Arrange
        let (registry, _) = registry();

        // Act
        let a = registry.instance(MODEL);
        let b = registry.instance(MODEL);

        // Assert
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_add_path_rejects_missing_node() {
        // Arrange
        let (registry, monitor) = registry();
        let node = DeviceNode::new("/dev/hidraw-does-not-exist", NodeKind::Raw);

        // Act
        let result = registry.add_path(MODEL, node);

        // Assert
        assert!(matches!(result, Err(RegistryError::NodeMissing(_))));
        assert_eq!(monitor.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ensure_monitoring_twice_starts_one_thread() {
        // Arrange
        let (registry, monitor) = registry();
        let node = temp_node();
        registry.add_path(MODEL, node.clone()).unwrap();
        let instance = registry.instance(MODEL);

        // Act
        let again = instance.ensure_monitoring().unwrap();
        let duplicate = registry.add_path(MODEL, node.clone()).unwrap();

        // Assert
        assert!(!again);
        assert!(!duplicate);
        assert_eq!(instance.reader_starts(), 1);
        wait_for(|| monitor.runs.load(Ordering::SeqCst) == 1);
        assert_eq!(monitor.runs.load(Ordering::SeqCst), 1);
        assert_eq!(registry.state(MODEL), InstanceState::Active);

        registry.shutdown();
        let _ = std::fs::remove_file(&node.path);
    }

    #[test]
    fn test_remove_last_path_then_re_add_restarts_exactly_one_reader() {
        // Arrange
        let (registry, monitor) = registry();
        let node = temp_node();
        registry.add_path(MODEL, node.clone()).unwrap();
        let instance = registry.instance(MODEL);

        // Act
        assert!(registry.remove_path(&node.path));
        let idle = registry.state(MODEL);
        registry.add_path(MODEL, node.clone()).unwrap();
        instance.ensure_monitoring().unwrap();

        // Assert
        assert_eq!(idle, InstanceState::Idle);
        assert_eq!(instance.reader_starts(), 2);
        assert_eq!(monitor.prepared.load(Ordering::SeqCst), 2);
        assert_eq!(registry.state(MODEL), InstanceState::Active);

        registry.shutdown();
        wait_for(|| monitor.runs.load(Ordering::SeqCst) == 2);
        assert_eq!(monitor.runs.load(Ordering::SeqCst), 2);
        let _ = std::fs::remove_file(&node.path);
    }

    /// Takes a while to wind down after its stop flag is raised.
    #[derive(Default)]
    struct SlowExitMonitor {
        trace: Mutex<Vec<&'static str>>,
    }

    impl NodeMonitor for SlowExitMonitor {
        fn run(&self, _nodes: KnownNodes, stop: Arc<AtomicBool>) {
            self.trace.lock().unwrap().push("start");
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
            std::thread::sleep(Duration::from_millis(100));
            self.trace.lock().unwrap().push("exit");
        }
    }

    #[test]
    fn test_quick_re_add_waits_for_previous_reader_to_exit() {
        // Arrange
        let monitor = Arc::new(SlowExitMonitor::default());
        let shared = Arc::clone(&monitor);
        let registry =
            DeviceRegistry::new(Box::new(move |_| shared.clone() as Arc<dyn NodeMonitor>));
        let node = temp_node();
        registry.add_path(MODEL, node.clone()).unwrap();
        wait_for(|| monitor.trace.lock().unwrap().len() == 1);

        // Act
        registry.remove_path(&node.path);
        registry.add_path(MODEL, node.clone()).unwrap();
        let after_re_add = monitor.trace.lock().unwrap().clone();

        // Assert
        assert_eq!(after_re_add[..2], ["start", "exit"]);
        wait_for(|| monitor.trace.lock().unwrap().len() == 3);
        assert_eq!(*monitor.trace.lock().unwrap(), vec!["start", "exit", "start"]);
        assert_eq!(registry.instance(MODEL).reader_starts(), 2);

        registry.shutdown();
        let _ = std::fs::remove_file(&node.path);
    }

    #[test]
    fn test_removing_one_of_two_paths_keeps_reader_running() {
        // Arrange
        let (registry, _) = registry();
        let first = temp_node();
        let second = temp_node();
        registry.add_path(MODEL, first.clone()).unwrap();
        registry.add_path(MODEL, second.clone()).unwrap();

        // Act
        registry.remove_path(&first.path);

        // Assert
        let instance = registry.instance(MODEL);
        assert_eq!(instance.reader_starts(), 1);
        assert_eq!(registry.state(MODEL), InstanceState::Active);
        assert_eq!(instance.nodes().snapshot(), vec![second.clone()]);

        registry.shutdown();
        let _ = std::fs::remove_file(&first.path);
        let _ = std::fs::remove_file(&second.path);
    }

    #[test]
    fn test_remove_unknown_path_is_noop() {
        let (registry, _) = registry();
        registry.instance(MODEL);
        assert!(!registry.remove_path(Path::new("/dev/hidraw99")));
    }
}
