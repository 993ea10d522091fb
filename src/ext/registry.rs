//! Table of known extension types, keyed by type id.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::{read_payload, ExtValue, Extension, Timestamp};
use crate::error::PackError;
use crate::stream::MsgpackReader;

/// What the registry knows about one extension type.
#[derive(Clone, Copy)]
pub struct ExtensionDescriptor {
    type_id: i8,
    name: &'static str,
    rust_type: TypeId,
    validate: for<'p> fn(MsgpackReader<'p>) -> Result<(), PackError>,
}

impl ExtensionDescriptor {
    fn of<T: Extension>() -> Self {
        Self {
            type_id: T::TYPE_ID,
            name: type_name::<T>(),
            rust_type: TypeId::of::<T>(),
            validate: validate_payload::<T>,
        }
    }

    pub fn type_id(&self) -> i8 {
        self.type_id
    }

    /// Rust type name of the registered extension.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the registered decoder over `payload` with default limits,
    /// discarding the result.
    pub fn validate(&self, payload: &[u8]) -> Result<(), PackError> {
        (self.validate)(MsgpackReader::new(payload))
    }
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .finish()
    }
}

fn validate_payload<T: Extension>(payload: MsgpackReader<'_>) -> Result<(), PackError> {
    read_payload::<T>(payload).map(drop)
}

/// Maps extension type ids to the Rust types that own them.
///
/// Build one at startup, then share it immutably with every reader that should
/// enforce it:
///
/// ```
/// use packwire::{ExtensionRegistry, MsgpackReader, Timestamp};
///
/// let registry = ExtensionRegistry::with_builtins();
/// assert_eq!(registry.get(-1).unwrap().name(), std::any::type_name::<Timestamp>());
///
/// let reader = MsgpackReader::new(&[]).with_registry(&registry);
/// assert!(reader.registry().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    by_id: HashMap<i8, ExtensionDescriptor>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the predefined MessagePack extensions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.by_id.insert(Timestamp::TYPE_ID, ExtensionDescriptor::of::<Timestamp>());
        registry
    }

    /// Registers `T` under `T::TYPE_ID`.
    ///
    /// Registering the same type twice is a no-op; a different type on an
    /// already used id is rejected.
    pub fn register<T: Extension>(&mut self) -> Result<&mut Self, PackError> {
        let descriptor = ExtensionDescriptor::of::<T>();
        if let Some(existing) = self.by_id.get(&T::TYPE_ID) {
            if existing.rust_type != descriptor.rust_type {
                return Err(PackError::DuplicateExtension {
                    type_id: T::TYPE_ID,
                    existing: existing.name,
                });
            }
            return Ok(self);
        }
        tracing::debug!(type_id = T::TYPE_ID, name = descriptor.name, "registered msgpack extension");
        self.by_id.insert(T::TYPE_ID, descriptor);
        Ok(self)
    }

    pub fn get(&self, type_id: i8) -> Option<&ExtensionDescriptor> {
        self.by_id.get(&type_id)
    }

    pub fn contains(&self, type_id: i8) -> bool {
        self.by_id.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Checks that `T::TYPE_ID` is unregistered or registered to `T`.
    pub fn check<T: Extension>(&self) -> Result<(), PackError> {
        match self.by_id.get(&T::TYPE_ID) {
            Some(existing) if existing.rust_type != TypeId::of::<T>() => {
                Err(PackError::ExtensionType {
                    type_id: T::TYPE_ID,
                    registered: existing.name,
                    requested: type_name::<T>(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Validates a raw extension against its registered decoder.
    ///
    /// Unregistered type ids pass through unchecked.
    pub fn validate(&self, ext: &ExtValue) -> Result<(), PackError> {
        match self.by_id.get(&ext.type_id) {
            Some(descriptor) => descriptor.validate(&ext.data),
            None => Ok(()),
        }
    }

    /// Validates a payload taken from `reader`, inheriting its limits and
    /// nesting depth. Unregistered type ids pass through unchecked.
    pub(crate) fn validate_within<'a>(
        &self,
        reader: &MsgpackReader<'a>,
        type_id: i8,
        payload: &'a [u8],
    ) -> Result<(), PackError> {
        match self.by_id.get(&type_id) {
            Some(descriptor) => (descriptor.validate)(reader.payload_reader(payload)),
            None => Ok(()),
        }
    }

    /// Validates a raw extension, rejecting unregistered type ids.
    pub fn validate_known(&self, ext: &ExtValue) -> Result<(), PackError> {
        match self.by_id.get(&ext.type_id) {
            Some(descriptor) => descriptor.validate(&ext.data),
            None => Err(PackError::UnknownExtension(ext.type_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::Ext;
    use crate::format::marker;
    use crate::stream::MsgpackWriter;
    use crate::config::ReaderConfig;
    use crate::types::Value;

    #[derive(Debug, PartialEq)]
    struct Celsius(i8);

    impl Extension for Celsius {
        const TYPE_ID: i8 = 20;

        fn payload_len(&self) -> usize {
            1
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_raw(&[self.0 as u8]);
        }

        fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            let [b] = payload.read_fixed::<1>()?;
            Ok(Celsius(b as i8))
        }
    }

    /// Shares Celsius's type id.
    #[derive(Debug)]
    struct Fahrenheit;

    impl Extension for Fahrenheit {
        const TYPE_ID: i8 = 20;

        fn payload_len(&self) -> usize {
            1
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_raw(&[0]);
        }

        fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            payload.read_fixed::<1>()?;
            Ok(Fahrenheit)
        }
    }

    #[test]
    fn duplicate_type_id_rejected() {
        let mut registry = ExtensionRegistry::new();
        registry.register::<Celsius>().unwrap();
        registry.register::<Celsius>().unwrap();
        assert_eq!(registry.len(), 1);

        let err = registry.register::<Fahrenheit>().unwrap_err();
        assert!(matches!(err, PackError::DuplicateExtension { type_id: 20, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn reader_with_registry_rejects_other_type_on_same_id() {
        let mut registry = ExtensionRegistry::new();
        registry.register::<Celsius>().unwrap();

        let mut writer = MsgpackWriter::new();
        writer.write_ext(&Celsius(-5));
        let bytes = writer.into_bytes();

        let mut reader = MsgpackReader::new(&bytes).with_registry(&registry);
        assert!(matches!(
            reader.read::<Ext<Fahrenheit>>(),
            Err(PackError::ExtensionType { type_id: 20, .. })
        ));
        assert_eq!(reader.position(), 0);
        reader.recover();
        assert_eq!(reader.read_ext::<Celsius>().unwrap(), Celsius(-5));

        // Without a registry only the type id is compared.
        let mut reader = MsgpackReader::new(&bytes);
        assert!(reader.read_ext::<Fahrenheit>().is_ok());
    }

    #[test]
    fn dynamic_reads_validate_registered_payloads() {
        let registry = ExtensionRegistry::with_builtins();

        // Timestamp with a 3-byte payload is malformed.
        let data = [marker::EXT_8, 0x03, 0xFF, 0x00, 0x00, 0x00];
        let mut reader = MsgpackReader::new(&data).with_registry(&registry);
        assert!(matches!(
            reader.read_value(),
            Err(PackError::ExtensionPayload { type_id: -1, .. })
        ));

        // Unregistered ids pass through as raw values.
        let data = [marker::FIXEXT_1, 0x33, 0xAA];
        let mut reader = MsgpackReader::new(&data).with_registry(&registry);
        assert_eq!(
            reader.read_value().unwrap(),
            Value::Extension(ExtValue::new(0x33, vec![0xAA]))
        );
    }

    /// Payload holding one nested msgpack value.
    #[derive(Debug)]
    struct Nested(Value);

    impl Extension for Nested {
        const TYPE_ID: i8 = 21;

        fn payload_len(&self) -> usize {
            let mut writer = MsgpackWriter::new();
            writer.write_value(&self.0);
            writer.len()
        }

        fn write_payload(&self, writer: &mut MsgpackWriter) {
            writer.write_value(&self.0);
        }

        fn read_payload(payload: &mut MsgpackReader<'_>) -> Result<Self, PackError> {
            payload.read_value().map(Nested)
        }
    }

    #[test]
    fn dynamic_validation_inherits_reader_limits() {
        let mut registry = ExtensionRegistry::new();
        registry.register::<Nested>().unwrap();

        // Payload [[1]] sits one level below the extension itself.
        let nested = Value::Array(vec![Value::Array(vec![Value::Integer(1)])]);
        let mut writer = MsgpackWriter::new();
        writer.write_ext(&Nested(nested));
        let bytes = writer.into_bytes();

        let config = ReaderConfig::new().max_depth(2);
        let mut reader = MsgpackReader::new(&bytes)
            .with_config(config)
            .with_registry(&registry);
        assert!(matches!(
            reader.read_value(),
            Err(PackError::DepthExceeded(2))
        ));
        assert_eq!(reader.position(), 0);

        let mut reader = MsgpackReader::new(&bytes)
            .with_config(ReaderConfig::new().max_depth(3))
            .with_registry(&registry);
        assert!(matches!(reader.read_value(), Ok(Value::Extension(_))));

        let config = ReaderConfig::new().max_collection_len(0);
        let mut reader = MsgpackReader::new(&bytes)
            .with_config(config)
            .with_registry(&registry);
        assert!(matches!(
            reader.read_value(),
            Err(PackError::LimitExceeded { what: "array", .. })
        ));
    }

    #[test]
    fn validate_known_requires_registration() {
        let registry = ExtensionRegistry::with_builtins();
        let ext = ExtValue::new(99, vec![1]);
        assert!(registry.validate(&ext).is_ok());
        assert!(matches!(
            registry.validate_known(&ext),
            Err(PackError::UnknownExtension(99))
        ));
        assert!(registry.contains(-1));
        assert!(!registry.is_empty());
    }
}
