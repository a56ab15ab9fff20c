use std::path::Path;

use super::LoaderSpec;
use crate::core::config::LauncherConfig;
use crate::core::downloader::Fetcher;
use crate::core::events::{EventSink, ProgressCategory, ProgressEvent};

/// Everything a loader strategy needs for one preparation.
pub struct LoaderContext<'a> {
    pub config: &'a LauncherConfig,
    pub fetcher: &'a dyn Fetcher,
    pub sink: &'a dyn EventSink,
    pub java_bin: &'a Path,
    pub game_version: &'a str,
    pub spec: &'a LoaderSpec,
    pub instance_id: Option<&'a str>,
}

impl LoaderContext<'_> {
    pub fn synthetic_id(&self) -> String {
        self.spec.synthetic_id(self.game_version)
    }

    pub fn report(&self, percent: u8, label: &str) {
        let mut event = ProgressEvent::percent(ProgressCategory::Loader, percent).with_label(label);
        if let Some(id) = self.instance_id {
            event = event.for_instance(id);
        }
        self.sink.progress(event);
    }
}
