// ─── Isolated Loader Injector ───
// Builds an isolated class/resource lookup scope over the resolved jars.
// Lookups hit the injected jars first; only allow-listed shared packages
// fall back to the host's own scope, so a plugin-local copy of a library
// can never shadow the proxy's copy and vice versa.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{ResolverError, ResolverResult};
use crate::resolve::ResolvedArtifact;

/// The host side of the scope boundary. Lookups that miss the injected
/// jars are delegated here, but only for allow-listed packages.
pub trait SharedScope: Send + Sync {
    /// Bytecode for a dotted class name, if the host shares it.
    fn class_bytes(&self, name: &str) -> Option<Vec<u8>>;
    /// Bytes for a slash-separated resource path, if the host shares it.
    fn resource_bytes(&self, path: &str) -> Option<Vec<u8>>;
}

/// A shared scope that exposes nothing. Useful for fully sealed plugins.
pub struct EmptyScope;

impl SharedScope for EmptyScope {
    fn class_bytes(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }

    fn resource_bytes(&self, _path: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Isolated loading scope for one plugin.
///
/// `inject` wires in the resolved jars; afterwards `load_class` and
/// `resource` serve lookups. Entry precedence follows jar order, first
/// occurrence wins. Injection is idempotent for the identical artifact
/// set and rejects a different set while one is active.
pub struct PluginScope {
    shared: Box<dyn SharedScope>,
    /// Dotted package prefixes the host intentionally shares.
    allow_list: Vec<String>,
    /// Entry name (slash form) -> index into `archives`.
    index: HashMap<String, usize>,
    archives: Vec<Mutex<ZipArchive<File>>>,
    /// Checksums of the currently injected set, in order.
    injected: Option<Vec<String>>,
}

impl PluginScope {
    pub fn new<I, S>(shared: Box<dyn SharedScope>, allow_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shared,
            allow_list: allow_list.into_iter().map(Into::into).collect(),
            index: HashMap::new(),
            archives: Vec::new(),
            injected: None,
        }
    }

    /// Index the resolved jars into this scope.
    ///
    /// Re-injecting the identical set is a no-op; a different set while
    /// one is active is an `InjectionConflict` (plugin reload must tear
    /// down the old scope first). A jar that carries a class inside an
    /// allow-listed shared package is rejected outright, it would shadow
    /// a host type.
    pub fn inject(&mut self, artifacts: &[ResolvedArtifact]) -> ResolverResult<()> {
        let fingerprint: Vec<String> = artifacts
            .iter()
            .map(|a| a.checksum.value.clone())
            .collect();

        if let Some(active) = &self.injected {
            if *active == fingerprint {
                debug!("Scope already holds this artifact set, skipping");
                return Ok(());
            }
            return Err(ResolverError::InjectionConflict(
                "scope already holds a different artifact set".to_string(),
            ));
        }

        let mut index = HashMap::new();
        let mut archives = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let archive_idx = archives.len();
            let mut archive = open_jar(&artifact.local_path)?;
            for i in 0..archive.len() {
                let entry = archive.by_index(i)?;
                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_string();
                if let Some(class_name) = class_name_of(&name) {
                    if let Some(prefix) = self.shared_prefix_of(&class_name) {
                        return Err(ResolverError::InjectionConflict(format!(
                            "{} from {} shadows shared package {}",
                            class_name, artifact.coordinate, prefix
                        )));
                    }
                }
                // First jar in resolution order wins duplicate entries.
                if let Some(previous) = index.get(&name) {
                    if *previous != archive_idx {
                        warn!("Duplicate entry {} also in earlier jar, keeping first", name);
                    }
                    continue;
                }
                index.insert(name, archive_idx);
            }
            archives.push(Mutex::new(archive));
        }

        info!(
            "Injected {} jar(s), {} entries indexed",
            archives.len(),
            index.len()
        );
        self.index = index;
        self.archives = archives;
        self.injected = Some(fingerprint);
        Ok(())
    }

    /// Bytecode lookup by dotted class name.
    ///
    /// Injected jars are consulted first. On a miss, allow-listed
    /// packages fall back to the shared scope; anything else is a
    /// `ScopeMiss` even if the host happens to have the class.
    pub fn load_class(&self, name: &str) -> ResolverResult<Vec<u8>> {
        let entry = format!("{}.class", name.replace('.', "/"));
        if let Some(bytes) = self.read_entry(&entry)? {
            return Ok(bytes);
        }
        if self.shared_prefix_of(name).is_some() {
            return self
                .shared
                .class_bytes(name)
                .ok_or_else(|| ResolverError::NotFound(name.to_string()));
        }
        Err(ResolverError::ScopeMiss(name.to_string()))
    }

    /// Resource lookup by slash-separated path.
    pub fn resource(&self, path: &str) -> ResolverResult<Vec<u8>> {
        let path = path.trim_start_matches('/');
        if let Some(bytes) = self.read_entry(path)? {
            return Ok(bytes);
        }
        if self.shared_prefix_of(&path.replace('/', ".")).is_some() {
            return self
                .shared
                .resource_bytes(path)
                .ok_or_else(|| ResolverError::NotFound(path.to_string()));
        }
        Err(ResolverError::ScopeMiss(path.to_string()))
    }

    pub fn is_injected(&self) -> bool {
        self.injected.is_some()
    }

    fn read_entry(&self, name: &str) -> ResolverResult<Option<Vec<u8>>> {
        let Some(&archive_idx) = self.index.get(name) else {
            return Ok(None);
        };
        let mut archive = self.archives[archive_idx]
            .lock()
            .map_err(|_| ResolverError::Other("jar archive lock poisoned".to_string()))?;
        let mut entry = archive.by_name(name)?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ResolverError::io(name, e))?;
        Ok(Some(bytes))
    }

    fn shared_prefix_of(&self, dotted: &str) -> Option<&str> {
        self.allow_list
            .iter()
            .map(String::as_str)
            .find(|prefix| {
                dotted
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
            })
    }
}

fn open_jar(path: &Path) -> ResolverResult<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| ResolverError::io(path, e))?;
    Ok(ZipArchive::new(file)?)
}

/// Dotted class name for a `.class` jar entry, `None` for resources.
fn class_name_of(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(".class")?;
    Some(stem.replace('/', "."))
}
