//! Process-wide jail rooted at `/`
//!
//! The default jail is built on first use, shared by every caller for the
//! rest of the process, and never closed. Code that can take a `&Jail`
//! should prefer that; this is meant for integration boundaries that have
//! no jail to thread through.

use crate::error::Result;
use crate::jail::Jail;
use std::sync::OnceLock;

static DEFAULT_JAIL: OnceLock<Jail> = OnceLock::new();

/// The process-wide jail rooted at the host filesystem root
///
/// Concurrent first callers block until a single construction finishes;
/// every caller gets the same instance.
///
/// # Panics
///
/// Panics if `/` cannot be opened as a directory. The process cannot do
/// any confined file access without it.
#[must_use]
pub fn default_jail() -> &'static Jail {
    get_or_open(&DEFAULT_JAIL, || Jail::new("/"))
}

#[allow(clippy::panic)]
fn get_or_open(cell: &OnceLock<Jail>, open: impl FnOnce() -> Result<Jail>) -> &Jail {
    cell.get_or_init(|| match open() {
        Ok(jail) => jail,
        Err(e) => panic!("failed to open default jail: {e}"),
    })
}
