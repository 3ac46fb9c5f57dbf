//! Registration of the sqlite-vec extension.
//!
//! The only unsafe code in the crate lives here.

use std::ffi::{c_char, c_int};
use std::sync::Once;

use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};
use sqlite_vec::sqlite3_vec_init;

type SqliteExtensionFn =
    unsafe extern "C" fn(*mut sqlite3, *mut *mut c_char, *const sqlite3_api_routines) -> c_int;

static REGISTER: Once = Once::new();

/// Make `vec_f32`, `vec_distance_cosine` and friends available on every
/// connection opened afterwards.
///
/// Registration happens once per process; later calls return immediately.
pub fn init_sqlite_vec_extension() {
    REGISTER.call_once(register_auto_extension);
}

#[allow(unsafe_code)]
fn register_auto_extension() {
    // SAFETY: sqlite3_auto_extension only stores the entry point, and
    // sqlite3_vec_init has the extension init signature SQLite calls it with.
    unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), SqliteExtensionFn>(
            sqlite3_vec_init as *const (),
        )));
    }
}
