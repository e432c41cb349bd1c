#![allow(dead_code)]

use async_trait::async_trait;
use modloader::module::registry::Declaration;
use modloader::module::ResourceLoader;
use modloader::LoaderConfig;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const CWD: &str = "http://h/app/";

/// Config rooted at [`CWD`]
pub fn test_config() -> LoaderConfig {
    LoaderConfig::default().with_cwd(CWD)
}

/// Absolute locator of `name` under [`CWD`]
pub fn at(name: &str) -> String {
    format!("{}{}", CWD, name)
}

#[derive(Clone, Default)]
struct Script {
    declarations: Vec<Declaration>,
    delay: Option<Duration>,
    failure: Option<String>,
}

/// In-memory resource loader with per-locator delays and failures
#[derive(Default)]
pub struct ScriptedLoader {
    scripts: HashMap<String, Script>,
    fetches: Mutex<Vec<String>>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource at `locator` declares `declarations`
    pub fn serve(mut self, locator: &str, declarations: Vec<Declaration>) -> Self {
        self.scripts.entry(locator.to_string()).or_default().declarations = declarations;
        self
    }

    /// Resource at `locator` completes only after `delay`
    pub fn delay(mut self, locator: &str, delay: Duration) -> Self {
        self.scripts.entry(locator.to_string()).or_default().delay = Some(delay);
        self
    }

    /// Resource at `locator` fails to load
    pub fn fail(mut self, locator: &str, reason: &str) -> Self {
        self.scripts.entry(locator.to_string()).or_default().failure = Some(reason.to_string());
        self
    }

    /// Every locator fetched so far, in request order
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, locator: &str) -> usize {
        self.fetches().iter().filter(|l| *l == locator).count()
    }
}

#[async_trait]
impl ResourceLoader for ScriptedLoader {
    async fn fetch(&self, locator: &str) -> anyhow::Result<Vec<Declaration>> {
        self.fetches.lock().unwrap().push(locator.to_string());
        let script = self.scripts.get(locator).cloned();

        match script.as_ref().and_then(|s| s.delay) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        match script {
            None => anyhow::bail!("404 {}", locator),
            Some(Script {
                failure: Some(reason),
                ..
            }) => anyhow::bail!("{}", reason),
            Some(script) => Ok(script.declarations),
        }
    }
}
