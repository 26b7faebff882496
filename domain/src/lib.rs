mod error;
mod inject;
mod path;
mod tree;
mod vmi;

pub use error::{DecodingError, InjectionError, ParseError, PathError};
pub use inject::{
    define_domain, derive_arguments, inject, Injection, ANNOTATION_PREFIX, ARGUMENTS_PATH,
    QEMU_NAMESPACE,
};
pub use path::Path;
pub use tree::{Attribute, Declaration, Document, Element, Node};
pub use vmi::{ObjectMeta, VirtualMachineInstance};
