mod classpath;
mod command;
mod natives;
mod pipeline;
mod process;

pub use classpath::{build_classpath, classpath_separator, display_path, join_classpath};
pub use command::{assemble, dedupe_game_args, sanitize_jvm_args, substitute, LaunchCommand, LaunchContext};
pub use natives::{uses_legacy_lwjgl, NativeExtractor, NativesReport};
pub use pipeline::{LaunchOutcome, Launcher, PreparedLaunch};
pub use process::{classify_line, spawn_game, GameProcess, LineClass, LineProgress};
