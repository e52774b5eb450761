pub mod atomic_toml;
pub mod kv_store;

pub use atomic_toml::AtomicTomlFile;
pub use kv_store::FileKeyValueStore;
