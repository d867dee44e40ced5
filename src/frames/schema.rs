// Frame schema loading and verification
//
// The frame types are generated from `proto/frames.proto` at build time.
// The .proto file shared with the backend can still be pointed at with
// `schema.path`; it is compiled at startup and every message, field, type
// and tag of the generated types must be present in it unchanged.

use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor};
use std::path::Path;
use tracing::{debug, info};

use super::wire::{FILE_DESCRIPTOR_SET, PACKAGE};
use crate::error::SchemaLoadError;

/// The .proto definition the frame types were generated from
pub const EMBEDDED_SCHEMA: &str = include_str!("../../proto/frames.proto");

/// A single field declaration in a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub ty: String,
    pub tag: u32,
}

/// A compiled and verified frame schema
#[derive(Debug, Clone)]
pub struct Schema {
    origin: String,
    pool: DescriptorPool,
}

impl Schema {
    /// The schema compiled into the binary
    pub fn embedded() -> Result<Self, SchemaLoadError> {
        let pool = compiled_pool()?;
        Ok(Self {
            origin: "embedded".to_string(),
            pool,
        })
    }

    /// Compile a .proto definition from disk and verify it
    ///
    /// Imports resolve relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        info!("Loading frame schema from {}", path.display());

        std::fs::metadata(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .ok_or_else(|| SchemaLoadError::Parse(format!("{} is not a file", path.display())))?;
        let include = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut compiler = protox::Compiler::new([include])
            .map_err(|e| SchemaLoadError::Parse(e.to_string()))?;
        compiler
            .open_file(file_name)
            .map_err(|e| SchemaLoadError::Parse(e.to_string()))?;

        let schema = Self {
            origin: path.display().to_string(),
            pool: compiler.descriptor_pool(),
        };
        schema.verify(&compiled_pool()?)?;

        debug!(
            "Frame schema verified ({} messages from {})",
            schema.pool.all_messages().count(),
            schema.origin
        );

        Ok(schema)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Package of the `Frame` message
    pub fn package(&self) -> String {
        self.message("Frame")
            .map(|m| m.package_name().to_string())
            .unwrap_or_default()
    }

    /// Look up a field of a message in the frame package
    pub fn field(&self, message: &str, field: &str) -> Option<FieldDef> {
        let message = self.message(message)?;
        let field = message.get_field_by_name(field)?;
        Some(FieldDef {
            ty: kind_name(&field.kind()),
            tag: field.number(),
        })
    }

    fn message(&self, name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(&format!("{}.{}", PACKAGE, name))
    }

    fn verify(&self, compiled: &DescriptorPool) -> Result<(), SchemaLoadError> {
        let expected = compiled
            .all_messages()
            .filter(|m| m.package_name() == PACKAGE);

        for message in expected {
            let loaded = self
                .pool
                .get_message_by_name(message.full_name())
                .ok_or_else(|| {
                    SchemaLoadError::Mismatch(format!(
                        "message '{}' is not defined",
                        message.full_name()
                    ))
                })?;

            for field in message.fields() {
                let found = loaded.get_field_by_name(field.name()).ok_or_else(|| {
                    SchemaLoadError::Mismatch(format!(
                        "field '{}' is not defined",
                        field.full_name()
                    ))
                })?;

                if describe(&found) != describe(&field) {
                    return Err(SchemaLoadError::Mismatch(format!(
                        "field '{}' is '{}', expected '{}'",
                        field.full_name(),
                        describe(&found),
                        describe(&field)
                    )));
                }
            }
        }

        Ok(())
    }
}

fn compiled_pool() -> Result<DescriptorPool, SchemaLoadError> {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET).map_err(|e| SchemaLoadError::Parse(e.to_string()))
}

/// Scalar type name, or the full name of a message/enum type
fn kind_name(kind: &Kind) -> String {
    match kind {
        Kind::Message(m) => m.full_name().to_string(),
        Kind::Enum(e) => e.full_name().to_string(),
        scalar => format!("{:?}", scalar).to_lowercase(),
    }
}

/// Everything about a field that changes how it is encoded
fn describe(field: &FieldDescriptor) -> String {
    let label = if field.is_map() {
        "map "
    } else if field.is_list() {
        "repeated "
    } else {
        ""
    };
    let oneof = field
        .containing_oneof()
        .map(|o| format!(" (oneof {})", o.name()))
        .unwrap_or_default();

    format!(
        "{}{} = {}{}",
        label,
        kind_name(&field.kind()),
        field.number(),
        oneof
    )
}
