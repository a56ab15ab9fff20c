mod descriptor;
pub mod manifest;
mod resolver;

pub use descriptor::{
    flatten_arguments, merge, ArgumentEntry, ArgumentValue, Arguments, AssetIndexRef,
    DownloadArtifact, JavaVersionInfo, LibraryArtifact, LibraryDownloads, LibraryEntry,
    ResolvedArtifact, VersionDescriptor, VersionDownloads,
};
pub use manifest::{VersionEntry, VersionManifest};
pub use resolver::{Resolution, VersionResolver};
