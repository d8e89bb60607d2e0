//! Typed, write-once configuration values held by the `Context`.
//!
//! A global property is declared with `define_global_property!`, which
//! creates a zero-sized key type naming the value's type and an optional
//! validator. Values are either set in code or read from a JSON file whose
//! top-level keys are property names of the form `<crate>.<Property>`:
//!
//! ```json
//! { "wardsim.Parameters": { "seed": 7, "tick_period": 1.0 } }
//! ```
//!
//! Properties are set at most once; a run that tries to change one after it
//! was set has a configuration bug and gets an error back.
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use log::trace;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::SimError;
use crate::{HashMap, HashMapExt};

pub trait GlobalProperty: Any {
    type Value: Any + DeserializeOwned;

    /// The key used for this property in configuration files.
    fn name() -> String;

    /// Checks a value before it is stored.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` describing the problem.
    fn validate(value: &Self::Value) -> Result<(), SimError>;
}

/// Defines a global property with the following parameters:
/// * `$global_property`: name of the key type
/// * `$value`: type of the property's value
/// * `$validate`: a function (or closure) that checks a value (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate:expr) => {
        #[derive(Copy, Clone, Debug)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> String {
                let crate_name = module_path!().split("::").next().unwrap_or_default();
                format!("{}.{}", crate_name, stringify!($global_property))
            }

            fn validate(value: &$value) -> Result<(), $crate::error::SimError> {
                $validate(value)
            }
        }
    };

    ($global_property:ident, $value:ty) => {
        $crate::define_global_property!($global_property, $value, |_| Ok(()));
    };
}
pub use define_global_property;

define_data_plugin!(
    GlobalPropertiesPlugin,
    HashMap<TypeId, Box<dyn Any>>,
    HashMap::new()
);

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores the value of a property.
    ///
    /// # Errors
    ///
    /// Fails if the value does not validate or the property is already set.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), SimError>;

    /// Returns the value of a property, or `None` if it was never set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Reads the property named `T::name()` from the JSON object in `file_path`
    /// and stores it.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, the key is missing, or the
    /// value is rejected by `set_global_property_value`.
    fn load_global_property_from_file<T: GlobalProperty>(
        &mut self,
        property: T,
        file_path: &Path,
    ) -> Result<(), SimError>;
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), SimError> {
        T::validate(&value)?;
        let properties = self.get_data_mut(GlobalPropertiesPlugin);
        if properties.contains_key(&TypeId::of::<T>()) {
            return Err(SimError::ConfigError(format!(
                "global property {} is already set",
                T::name()
            )));
        }
        trace!("setting global property {}", T::name());
        properties.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data(GlobalPropertiesPlugin)?
            .get(&TypeId::of::<T>())?
            .downcast_ref::<T::Value>()
    }

    fn load_global_property_from_file<T: GlobalProperty>(
        &mut self,
        property: T,
        file_path: &Path,
    ) -> Result<(), SimError> {
        trace!(
            "loading global property {} from {}",
            T::name(),
            file_path.display()
        );
        let contents = fs::read_to_string(file_path)?;
        let mut document: HashMap<String, serde_json::Value> = serde_json::from_str(&contents)?;
        let raw = document.remove(&T::name()).ok_or_else(|| {
            SimError::ConfigError(format!(
                "{} does not define {}",
                file_path.display(),
                T::name()
            ))
        })?;
        let value: T::Value = serde_json::from_value(raw)?;
        self.set_global_property_value(property, value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde::Deserialize;
    use tempfile::NamedTempFile;

    use super::*;

    #[derive(Deserialize, Debug, PartialEq)]
    pub struct StaffingValues {
        pub doctors: u32,
        pub nurses: u32,
    }

    define_global_property!(Staffing, StaffingValues);
    define_global_property!(
        ClosureLevel,
        f64,
        |value: &f64| -> Result<(), SimError> {
            if (0.0..=100.0).contains(value) {
                Ok(())
            } else {
                Err(SimError::InvalidParameter(format!(
                    "closure level {value} is not a percentage"
                )))
            }
        }
    );

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn names_are_prefixed_with_the_crate() {
        assert_eq!(Staffing::name(), "wardsim.Staffing");
    }

    #[test]
    fn set_and_get() {
        let mut context = Context::new();
        assert!(context.get_global_property_value(ClosureLevel).is_none());
        context.set_global_property_value(ClosureLevel, 50.0).unwrap();
        assert_eq!(context.get_global_property_value(ClosureLevel), Some(&50.0));
    }

    #[test]
    fn set_twice_is_an_error() {
        let mut context = Context::new();
        context.set_global_property_value(ClosureLevel, 50.0).unwrap();
        let result = context.set_global_property_value(ClosureLevel, 60.0);
        assert!(matches!(result, Err(SimError::ConfigError(_))));
        assert_eq!(context.get_global_property_value(ClosureLevel), Some(&50.0));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut context = Context::new();
        let result = context.set_global_property_value(ClosureLevel, 150.0);
        assert!(matches!(result, Err(SimError::InvalidParameter(_))));
        assert!(context.get_global_property_value(ClosureLevel).is_none());
    }

    #[test]
    fn load_from_file() {
        let file = write_config(r#"{ "wardsim.Staffing": { "doctors": 4, "nurses": 9 } }"#);
        let mut context = Context::new();
        context
            .load_global_property_from_file(Staffing, file.path())
            .unwrap();
        assert_eq!(
            context.get_global_property_value(Staffing),
            Some(&StaffingValues {
                doctors: 4,
                nurses: 9
            })
        );
    }

    #[test]
    fn load_missing_key() {
        let file = write_config(r#"{ "wardsim.Other": 1 }"#);
        let mut context = Context::new();
        let result = context.load_global_property_from_file(Staffing, file.path());
        assert!(matches!(result, Err(SimError::ConfigError(_))));
    }

    #[test]
    fn load_malformed_json() {
        let file = write_config("{ not json");
        let mut context = Context::new();
        let result = context.load_global_property_from_file(Staffing, file.path());
        assert!(matches!(result, Err(SimError::JsonError(_))));
    }
}
