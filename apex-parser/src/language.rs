// Grammar loading. The Apex grammar ships as a shared library exposing the
// usual tree-sitter constructor symbol; it is located through the
// `TS_SFAPEX_LIB` environment variable, falling back to a library file
// sitting next to the server executable.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;
use tree_sitter::Language;

use crate::ParserError;

/// Constructor symbol exported by the grammar library.
pub const GRAMMAR_SYMBOL: &[u8] = b"tree_sitter_apex";

/// Environment variable overriding the grammar library location.
pub const GRAMMAR_ENV_VAR: &str = "TS_SFAPEX_LIB";

static LOADED: OnceLock<Language> = OnceLock::new();

/// Where the grammar library is expected to live.
pub fn grammar_library_path() -> PathBuf {
    if let Some(path) = env::var_os(GRAMMAR_ENV_VAR) {
        return PathBuf::from(path);
    }
    let file_name = format!(
        "{}tree-sitter-sfapex{}",
        env::consts::DLL_PREFIX,
        env::consts::DLL_SUFFIX
    );
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

/// Load (or reuse) the Apex grammar. The first successful load is cached
/// for the process lifetime; failures are not cached so a later call can
/// succeed once the library is installed.
pub fn load_language() -> Result<Language, ParserError> {
    if let Some(language) = LOADED.get() {
        return Ok(language.clone());
    }
    let path = grammar_library_path();
    let language = load_from(&path)?;
    tracing::info!(path = %path.display(), "loaded Apex grammar");
    Ok(LOADED.get_or_init(|| language).clone())
}

fn load_from(path: &Path) -> Result<Language, ParserError> {
    let grammar_load = |source| ParserError::GrammarLoad {
        path: path.display().to_string(),
        source,
    };
    // SAFETY: the grammar library is a plain tree-sitter grammar object
    // with no initializers beyond the exported constructor. The library is
    // intentionally leaked so the returned Language stays valid.
    unsafe {
        let library = Library::new(path).map_err(grammar_load)?;
        let constructor: libloading::Symbol<unsafe extern "C" fn() -> *const ()> =
            library.get(GRAMMAR_SYMBOL).map_err(grammar_load)?;
        let language = Language::from_raw(constructor() as *const tree_sitter::ffi::TSLanguage);
        std::mem::forget(library);
        Ok(language)
    }
}
