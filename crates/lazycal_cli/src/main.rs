//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lazycal_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("lazycal_core version={}", lazycal_core::core_version());
    match lazycal_core::db::open_db_in_memory() {
        Ok(_) => println!("lazycal_core storage=ok"),
        Err(err) => println!("lazycal_core storage=error {err}"),
    }
}
