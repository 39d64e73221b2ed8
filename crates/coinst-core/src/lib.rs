mod control;
mod dependency;
mod error;
mod package;
mod source;
mod version;

pub use control::{parse_paragraphs, write_paragraphs, Paragraph};
pub use dependency::{
    parse_alternatives, parse_conjunction, parse_flat_list, parse_provides, AlternativeGroup,
    ConjunctiveSet, Dependency, Provision, Relation,
};
pub use error::LookupError;
pub use package::{BinaryFields, DepField, Package, Priority};
pub use source::Source;
pub use version::{DebianVersions, VersionComparator};
