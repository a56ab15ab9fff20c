mod coordinate;
mod metadata;

pub use coordinate::MavenCoordinate;
pub use metadata::MavenMetadata;

/// Maven repositories the engine resolves against.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
pub const NEOFORGE_MAVEN: &str = "https://maven.neoforged.net/releases";
pub const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
pub const QUILT_MAVEN: &str = "https://maven.quiltmc.org/repository/release";
pub const LEGACY_FABRIC_MAVEN: &str = "https://maven.legacyfabric.net";
