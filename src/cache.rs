use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::compiler::Compiler;
use crate::minify::Minifier;
use crate::options::CompileOptions;

/// In-memory cache of compiled templates, keyed by a content hash of the
/// source and the options it was compiled with.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: RwLock<HashMap<String, String>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(source: &str, options: &CompileOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        // Options serialize deterministically (struct fields, BTreeMap extras).
        if let Ok(encoded) = serde_json::to_vec(options) {
            hasher.update(&encoded);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, source: &str, options: &CompileOptions) -> Option<String> {
        let hash = Self::compute_hash(source, options);
        let entries = self.entries.read().ok()?;
        entries.get(&hash).cloned()
    }

    pub fn set(&self, source: &str, options: &CompileOptions, code: String) {
        let hash = Self::compute_hash(source, options);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(hash, code);
        }
    }

    pub fn get_or_compile<M: Minifier>(&self, compiler: &Compiler<M>, source: &str) -> String {
        let options = compiler.options();
        if let Some(code) = self.get(source, options) {
            log::debug!("template cache hit");
            return code;
        }

        let code = compiler.compile(source);
        self.set(source, options, code.clone());
        code
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MinifyError;
    use crate::options::MinifyOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hash_depends_on_source_and_options() {
        let defaults = CompileOptions::default();
        let strict = CompileOptions {
            strict_scopes: true,
            ..CompileOptions::default()
        };
        let a = CompileCache::compute_hash("<p>{{a}}</p>", &defaults);
        assert_eq!(a, CompileCache::compute_hash("<p>{{a}}</p>", &defaults));
        assert_ne!(a, CompileCache::compute_hash("<p>{{b}}</p>", &defaults));
        assert_ne!(a, CompileCache::compute_hash("<p>{{a}}</p>", &strict));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_get_or_compile_reuses_entries() {
        let calls = AtomicUsize::new(0);
        let counting = |source: &str, _: &MinifyOptions| -> Result<String, MinifyError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(source.to_string())
        };
        let options = CompileOptions {
            htmlmin_enable: true,
            ..CompileOptions::default()
        };
        let compiler = Compiler::with_minifier(options, counting);
        let cache = CompileCache::new();

        let first = cache.get_or_compile(&compiler, "Hi {{name}}");
        let second = cache.get_or_compile(&compiler, "Hi {{name}}");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
