// ─── Command Assembler ───
// Renders descriptor argument templates into the final JVM and game
// argument vectors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::classpath::display_path;
use crate::core::auth::Credentials;
use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::Instance;
use crate::core::rules::Platform;
use crate::core::version::{flatten_arguments, VersionDescriptor};

const LEGACY_JVM_ARGS: [&str; 3] = ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"];

const COMPAT_PROPERTIES: [&str; 4] = [
    "-Dfile.encoding=UTF-8",
    "-Duser.language=en",
    "-Duser.country=US",
    "-Dcom.sun.net.ssl.checkRevocation=false",
];

const DEFAULT_GAME_ARGS: [&str; 18] = [
    "--username",
    "${auth_player_name}",
    "--version",
    "${version_name}",
    "--gameDir",
    "${game_directory}",
    "--assetsDir",
    "${assets_root}",
    "--assetIndex",
    "${assets_index_name}",
    "--uuid",
    "${auth_uuid}",
    "--accessToken",
    "${auth_access_token}",
    "--userType",
    "${user_type}",
    "--versionType",
    "${version_type}",
];

/// Replace every known `${name}`. Unknown placeholders are left in place.
pub fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = match PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_.]+)\}").ok())
        .as_ref()
    {
        Some(re) => re,
        None => return template.to_string(),
    };
    re.replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
        Some(v) => v.clone(),
        None => caps[0].to_string(),
    })
    .into_owned()
}

fn is_unresolved(token: &str) -> bool {
    token.contains("${")
}

/// Game argument cleanup: drops `--demo`, any flag whose value is still a
/// template, any flag without a value, and repeats of a flag already seen.
pub fn dedupe_game_args(args: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut seen: Vec<String> = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let token = &args[i];
        if token == "--demo" {
            i += 1;
            continue;
        }
        if !token.starts_with("--") {
            if !is_unresolved(token) {
                out.push(token.clone());
            }
            i += 1;
            continue;
        }

        let value = match args.get(i + 1) {
            Some(v) if !v.starts_with("--") => v,
            _ => {
                i += 1;
                continue;
            }
        };
        if !is_unresolved(value) && !seen.contains(token) {
            seen.push(token.clone());
            out.push(token.clone());
            out.push(value.clone());
        }
        i += 2;
    }
    out
}

/// JVM cleanup: unresolved tokens go, along with an option left dangling by them.
/// A `-cp`/`-classpath` with no value is dropped.
pub fn sanitize_jvm_args(args: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(args.len());
    for token in args {
        if is_unresolved(&token) {
            if out.last().map(|l| l == "-cp" || l == "-classpath").unwrap_or(false) {
                out.pop();
            }
            continue;
        }
        out.push(token);
    }
    if out.last().map(|l| l == "-cp" || l == "-classpath").unwrap_or(false) {
        out.pop();
    }
    out
}

/// Everything the assembler needs beyond the descriptor.
pub struct LaunchContext<'a> {
    pub config: &'a LauncherConfig,
    pub descriptor: &'a VersionDescriptor,
    pub instance: &'a Instance,
    pub credentials: &'a Credentials,
    pub java: &'a Path,
    pub natives_dir: &'a Path,
    pub classpath: &'a str,
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub java: PathBuf,
    pub jvm_args: Vec<String>,
    pub main_class: String,
    pub game_args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchCommand {
    /// `jvm_args ++ [main_class] ++ game_args`
    pub fn args(&self) -> Vec<String> {
        let mut args = self.jvm_args.clone();
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }
}

fn placeholder_values<'a>(ctx: &LaunchContext<'a>) -> HashMap<&'static str, String> {
    let config = ctx.config;
    let descriptor = ctx.descriptor;
    let assets_root = display_path(&config.assets_dir());

    HashMap::from([
        ("natives_directory", display_path(ctx.natives_dir)),
        ("classpath", ctx.classpath.to_string()),
        ("library_directory", display_path(&config.libraries_dir())),
        ("classpath_separator", super::classpath::classpath_separator().to_string()),
        ("version_name", descriptor.id.clone()),
        ("launcher_name", config.launcher_name().to_string()),
        ("launcher_version", config.launcher_version().to_string()),
        ("auth_player_name", ctx.credentials.player_name.clone()),
        ("auth_uuid", ctx.credentials.uuid_without_hyphens()),
        ("auth_access_token", ctx.credentials.access_token.clone()),
        ("auth_session", ctx.credentials.access_token.clone()),
        ("user_type", "msa".to_string()),
        (
            "version_type",
            descriptor.version_type.clone().unwrap_or_else(|| "release".to_string()),
        ),
        ("game_directory", display_path(&ctx.instance.path)),
        ("assets_root", assets_root.clone()),
        ("game_assets", assets_root),
        ("assets_index_name", descriptor.assets_index_name()),
        ("user_properties", "{}".to_string()),
    ])
}

pub fn assemble(ctx: &LaunchContext<'_>) -> LauncherResult<LaunchCommand> {
    let descriptor = ctx.descriptor;
    let main_class = descriptor
        .main_class
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| LauncherError::NotFound {
            kind: "main class",
            id: descriptor.id.clone(),
        })?;
    let values = placeholder_values(ctx);

    let memory = ctx.instance.memory;
    let mut jvm = vec![
        format!("-Xmx{}M", memory.max_mb),
        format!("-Xms{}M", memory.min_mb.min(memory.max_mb)),
    ];
    let structured_jvm = descriptor
        .arguments
        .as_ref()
        .map(|a| flatten_arguments(&a.jvm, &ctx.platform))
        .filter(|a| !a.is_empty());
    match structured_jvm {
        Some(args) => jvm.extend(args),
        None => jvm.extend(LEGACY_JVM_ARGS.iter().map(|s| s.to_string())),
    }
    jvm.extend(COMPAT_PROPERTIES.iter().map(|s| s.to_string()));

    let mut jvm_args = sanitize_jvm_args(jvm.iter().map(|t| substitute(t, &values)).collect());
    if !jvm_args.iter().any(|a| a == "-cp" || a == "-classpath") {
        jvm_args.push("-cp".into());
        jvm_args.push(ctx.classpath.to_string());
    }

    let structured_game = descriptor
        .arguments
        .as_ref()
        .map(|a| flatten_arguments(&a.game, &ctx.platform))
        .filter(|a| !a.is_empty());
    let game = match (structured_game, descriptor.minecraft_arguments.as_deref()) {
        (Some(args), _) => args,
        (None, Some(legacy)) => legacy.split_whitespace().map(str::to_string).collect(),
        (None, None) => DEFAULT_GAME_ARGS.iter().map(|s| s.to_string()).collect(),
    };
    let game_args = dedupe_game_args(game.iter().map(|t| substitute(t, &values)).collect());

    Ok(LaunchCommand {
        java: ctx.java.to_path_buf(),
        jvm_args,
        main_class,
        game_args,
        working_dir: ctx.instance.path.clone(),
    })
}
