//! Ferry Services Layer
//!
//! Host classes scripts can import, and the settings file:
//! - `ferry.lang`: the root object, `System`, `Integer`
//! - `ferry.util`: `ArrayList`
//! - `ferry.io`: `File`, `FileReader`, `FileWriter`
//! - `ferry.demo`: `Interaction`

pub mod demo;
pub mod io;
pub mod lang;
pub mod settings;
pub mod util;

pub use settings::{RuntimeSettings, Settings, SettingsError, SETTINGS_FILE};

use ferry_host::{ClassRegistry, HostClass, HostResult};
use std::sync::Arc;

fn classes() -> Vec<HostClass> {
    vec![
        lang::object_class(),
        lang::system_class(),
        lang::integer_class(),
        util::array_list_class(),
        io::file_class(),
        io::file_reader_class(),
        io::file_writer_class(),
        demo::interaction_class(),
    ]
}

/// Registers every service class. Fails if one of the names is taken.
pub fn register_services(registry: &ClassRegistry) -> HostResult<()> {
    for class in classes() {
        registry.register(class)?;
    }
    tracing::debug!(classes = registry.len(), "services registered");
    Ok(())
}

/// A fresh registry holding only the service classes.
pub fn service_registry() -> HostResult<Arc<ClassRegistry>> {
    let registry = ClassRegistry::new();
    register_services(&registry)?;
    Ok(Arc::new(registry))
}


#[cfg(test)]
mod tests {
    use super::*;
    use ferry_host::HostRuntime;

    #[test]
    fn registers_every_package() {
        let registry = service_registry().unwrap();
        let names = registry.class_names();
        for expected in [
            ferry_host::ROOT_CLASS,
            lang::SYSTEM,
            lang::INTEGER,
            util::ARRAY_LIST,
            io::FILE,
            io::FILE_READER,
            io::FILE_WRITER,
            demo::INTERACTION,
        ] {
            assert!(names.iter().any(|name| name == expected), "{expected} missing");
        }
    }

    #[test]
    fn registering_twice_fails() {
        let registry = service_registry().unwrap();
        assert!(register_services(&registry).is_err());
    }
}
