use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;

use crate::core::auth::Credentials;
use crate::core::config::LauncherConfig;
use crate::core::content::{ContentPipeline, ModpackSource, ModrinthRegistry, SearchQuery};
use crate::core::downloader::{Fetcher, HttpFetcher};
use crate::core::error::{LauncherResult, OperationResult};
use crate::core::events::{EventSink, TracingSink};
use crate::core::http::build_http_client;
use crate::core::instance::{ContentCategory, InstanceCatalog, JsonInstanceCatalog};
use crate::core::launch::Launcher;
use crate::core::loaders::{versions::list_loader_versions, LoaderKind};
use crate::core::version::VersionManifest;

/// Resolve, fetch and launch Minecraft instances.
#[derive(Parser)]
#[command(name = "blocklaunch", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Release versions, or loader versions when --loader and --game are given
    Versions {
        #[arg(long, requires = "game")]
        loader: Option<String>,
        #[arg(long)]
        game: Option<String>,
    },
    /// Prepare and start an instance
    Launch {
        instance: String,
        #[arg(long, default_value = "Player")]
        player: String,
        #[arg(long)]
        uuid: Option<String>,
        #[arg(long, default_value = "")]
        token: String,
        /// Return as soon as the game is running
        #[arg(long)]
        detach: bool,
    },
    /// Search the content registry
    Search {
        query: String,
        #[arg(long)]
        facets: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Install a registry project into an instance
    Install { instance: String, project: String },
    /// Create an instance from a .mrpack file or URL
    ImportModpack {
        source: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Rebuild an instance's content records from its folders
    Detect { instance: String },
    /// Enable or disable one content file
    Toggle {
        instance: String,
        category: Category,
        file: String,
        #[arg(long)]
        disable: bool,
    },
    /// Delete one content file and its record
    Remove {
        instance: String,
        category: Category,
        file: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Category {
    Mods,
    Resourcepacks,
    Shaderpacks,
    Datapacks,
}

impl From<Category> for ContentCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Mods => ContentCategory::Mods,
            Category::Resourcepacks => ContentCategory::ResourcePacks,
            Category::Shaderpacks => ContentCategory::ShaderPacks,
            Category::Datapacks => ContentCategory::DataPacks,
        }
    }
}

/// Long-lived collaborators shared by every command.
struct Engine {
    config: Arc<LauncherConfig>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn EventSink>,
    catalog: Arc<dyn InstanceCatalog>,
    registry: ModrinthRegistry,
}

impl Engine {
    fn new() -> LauncherResult<Self> {
        let config = Arc::new(LauncherConfig::load());
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(build_http_client(&config)?));
        let catalog: Arc<dyn InstanceCatalog> =
            Arc::new(JsonInstanceCatalog::new(config.instances_file()));
        Ok(Self {
            registry: ModrinthRegistry::new(fetcher.clone()),
            sink: Arc::new(TracingSink),
            config,
            fetcher,
            catalog,
        })
    }

    fn content(&self) -> ContentPipeline<'_> {
        ContentPipeline::new(
            &self.config,
            &*self.fetcher,
            &self.registry,
            &*self.catalog,
            &*self.sink,
        )
    }

    fn launcher(&self) -> Launcher {
        Launcher::new(
            self.config.clone(),
            self.fetcher.clone(),
            self.sink.clone(),
            self.catalog.clone(),
        )
    }

    async fn versions(
        &self,
        loader: Option<String>,
        game: Option<String>,
    ) -> LauncherResult<Vec<String>> {
        match (loader, game) {
            (Some(loader), Some(game)) => {
                list_loader_versions(&*self.fetcher, &LoaderKind::from(loader), &game).await
            }
            _ => {
                let manifest = VersionManifest::fetch(&*self.fetcher).await?;
                Ok(manifest.releases().into_iter().map(|v| v.id.clone()).collect())
            }
        }
    }
}

fn print<T: Serialize>(result: OperationResult<T>) -> ExitCode {
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Could not serialize result: {}", e),
    }
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub async fn execute(cli: Cli) -> ExitCode {
    let engine = match Engine::new() {
        Ok(engine) => engine,
        Err(e) => return print(OperationResult::<()>::failed(&e)),
    };

    match cli.command {
        Commands::Versions { loader, game } => {
            let result: OperationResult<Vec<String>> = engine.versions(loader, game).await.into();
            print(result)
        }
        Commands::Launch {
            instance,
            player,
            uuid,
            token,
            detach,
        } => {
            let credentials = match uuid {
                Some(uuid) => Credentials::new(uuid, player, token),
                None => Credentials::offline(&player),
            };
            let launcher = engine.launcher();
            let result = if detach {
                launcher.launch(&instance, &credentials).await
            } else {
                launcher.launch_attached(&instance, &credentials).await
            };
            print(result)
        }
        Commands::Search {
            query,
            facets,
            offset,
            limit,
        } => {
            let query = SearchQuery {
                query,
                facets,
                index: None,
                offset,
                limit,
            };
            print(engine.content().search(&query).await)
        }
        Commands::Install { instance, project } => {
            print(engine.content().install(&instance, &project).await)
        }
        Commands::ImportModpack { source, name } => {
            let source = if source.starts_with("http://") || source.starts_with("https://") {
                ModpackSource::Url(source)
            } else {
                ModpackSource::File(PathBuf::from(source))
            };
            print(engine.content().import_modpack(&source, name.as_deref()).await)
        }
        Commands::Detect { instance } => print(engine.content().detect(&instance).await),
        Commands::Toggle {
            instance,
            category,
            file,
            disable,
        } => print(
            engine
                .content()
                .toggle(&instance, category.into(), &file, !disable)
                .await,
        ),
        Commands::Remove {
            instance,
            category,
            file,
        } => print(
            engine
                .content()
                .remove_content(&instance, category.into(), &file)
                .await,
        ),
    }
}
