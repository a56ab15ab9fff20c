// ─── blocklaunch core ───
// Resolve → fetch → launch engine for Minecraft instances.
//
// Architecture:
//   core/
//     rules/       — OS rule evaluation for libraries and arguments
//     version/     — Manifest, descriptors, inheritsFrom merge, resolver
//     loaders/     — Forge/NeoForge installers, Fabric/Quilt profiles
//     maven/       — Coordinates and maven-metadata.xml
//     downloader/  — Fetcher seam, idempotent download tasks
//     assets/      — Asset index and object layout
//     materialize/ — Library and asset passes with bounded pools
//     java/        — Temurin runtime provisioning
//     launch/      — Natives, classpath, command assembly, supervisor
//     content/     — Registry, installs, modpacks, detection, toggle
//     instance/    — Instance model and the JSON catalog

pub mod assets;
pub mod auth;
pub mod config;
pub mod content;
pub mod downloader;
pub mod error;
pub mod events;
pub mod hash;
pub mod http;
pub mod instance;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod materialize;
pub mod maven;
pub mod rules;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;
