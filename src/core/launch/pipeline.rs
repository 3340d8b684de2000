// ─── Launch Pipeline ───
// Drives a launch from runtime resolution to process exit. Each stage emits
// its status before blocking; stage changes are validated by `LaunchStage`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::core::assets::{AssetManager, RESOURCES_URL};
use crate::core::auth::LaunchAccountProfile;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, SharedSink};
use crate::core::java::resolve_java;
use crate::core::loaders::{
    resolve_loader_meta, FabricInstaller, InstallContext, LoaderInstaller, LEGACY_FABRIC_META_URL,
};
use crate::core::maven::{FABRIC_MAVEN, LEGACY_FABRIC_MAVEN};
use crate::core::version::{resolve_version, VERSION_MANIFEST_URL};

use super::classpath::{
    assemble_classpath, fetch_client_jar, fetch_libraries, libraries_dir, natives_dir,
};
use super::patches::current_patch;
use super::task::{build_game_args, pump_output, spawn, ArgumentContext, LaunchPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStage {
    ResolvingRuntime,
    ResolvingPackage,
    FetchingContent,
    AssemblingClasspath,
    PatchingNatives,
    BuildingArguments,
    Starting,
    Running,
    Exited,
    Crashed,
}

impl LaunchStage {
    pub fn successors(self) -> &'static [LaunchStage] {
        use LaunchStage::*;
        match self {
            ResolvingRuntime => &[ResolvingPackage],
            ResolvingPackage => &[FetchingContent],
            FetchingContent => &[AssemblingClasspath],
            AssemblingClasspath => &[PatchingNatives],
            PatchingNatives => &[BuildingArguments],
            BuildingArguments => &[Starting],
            Starting => &[Running],
            Running => &[Exited, Crashed],
            Exited | Crashed => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_transition(self, next: LaunchStage) -> bool {
        self.successors().contains(&next)
    }

    pub fn advance(self, next: LaunchStage) -> LauncherResult<LaunchStage> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(LauncherError::Other(format!(
                "invalid launch stage transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub username: String,
    pub ram_mb: u64,
    pub use_fabric: bool,
    pub version_id: String,
}

pub struct LaunchPipeline<'a> {
    game_dir: &'a Path,
    downloader: &'a Downloader,
    events: &'a dyn EventSink,
    stage: LaunchStage,
    java_override: Option<PathBuf>,
    catalog_url: String,
    loader_meta_url: String,
    resources_url: String,
    loader_repo: String,
    intermediary_repo: String,
}

impl<'a> LaunchPipeline<'a> {
    pub fn new(game_dir: &'a Path, downloader: &'a Downloader, events: &'a dyn EventSink) -> Self {
        Self {
            game_dir,
            downloader,
            events,
            stage: LaunchStage::ResolvingRuntime,
            java_override: None,
            catalog_url: VERSION_MANIFEST_URL.to_string(),
            loader_meta_url: LEGACY_FABRIC_META_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
            loader_repo: FABRIC_MAVEN.to_string(),
            intermediary_repo: LEGACY_FABRIC_MAVEN.to_string(),
        }
    }

    /// Use this executable instead of the bundled runtime.
    pub fn with_java(mut self, java: Option<PathBuf>) -> Self {
        self.java_override = java;
        self
    }

    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    pub fn with_loader_meta_url(mut self, url: impl Into<String>) -> Self {
        self.loader_meta_url = url.into();
        self
    }

    pub fn with_resources_url(mut self, url: impl Into<String>) -> Self {
        self.resources_url = url.into();
        self
    }

    pub fn with_loader_repos(mut self, loader: &str, intermediary: &str) -> Self {
        self.loader_repo = loader.to_string();
        self.intermediary_repo = intermediary.to_string();
        self
    }

    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    fn enter(&mut self, next: LaunchStage) -> LauncherResult<()> {
        self.stage = self.stage.advance(next)?;
        debug!("Launch stage: {:?}", self.stage);
        Ok(())
    }

    /// Resolve, download and assemble everything up to a ready command line.
    pub async fn prepare(&mut self, request: &LaunchRequest) -> LauncherResult<LaunchPlan> {
        let downloader = self.downloader;
        let client = downloader.client();

        self.events.status("Checking Java...");
        let java = match &self.java_override {
            Some(path) => path.clone(),
            None => resolve_java(self.game_dir, self.downloader, self.events).await,
        };

        self.enter(LaunchStage::ResolvingPackage)?;
        let descriptor =
            resolve_version(client, &self.catalog_url, &request.version_id, self.events).await?;

        self.enter(LaunchStage::FetchingContent)?;
        self.events.status("Downloading Assets...");
        AssetManager::new(self.downloader)
            .with_resources_url(self.resources_url.as_str())
            .download_assets(&descriptor.asset_index, &self.game_dir.join("assets"))
            .await?;

        self.events.status("Downloading Libraries...");
        let libraries = fetch_libraries(&descriptor, self.game_dir, self.downloader).await?;

        self.events.status("Downloading Client Jar...");
        let client_jar = fetch_client_jar(&descriptor, self.game_dir, self.downloader)
            .await
            .map_err(|e| LauncherError::Other(format!("client jar download failed: {}", e)))?;

        self.enter(LaunchStage::AssemblingClasspath)?;
        let (loader_libs, main_class) = if request.use_fabric {
            self.events.status("Installing Fabric Loader...");
            let meta = resolve_loader_meta(client, &self.loader_meta_url).await?;
            let libs_dir = libraries_dir(self.game_dir);
            let installed = FabricInstaller::new(meta)
                .with_repos(&self.loader_repo, &self.intermediary_repo)
                .install(InstallContext {
                    libs_dir: &libs_dir,
                    downloader: self.downloader,
                })
                .await?;
            (installed.libraries, installed.main_class)
        } else {
            (Vec::new(), descriptor.main_class.clone())
        };
        let mut classpath = assemble_classpath(&loader_libs, &libraries, &client_jar);

        self.enter(LaunchStage::PatchingNatives)?;
        self.events.status("Checking for Native Patches...");
        let natives = natives_dir(self.game_dir);
        if let Some(patch) = current_patch() {
            patch
                .apply(self.game_dir, &natives, &mut classpath, self.downloader, self.events)
                .await;
        }

        self.enter(LaunchStage::BuildingArguments)?;
        let profile = LaunchAccountProfile::offline(&request.username);
        let game_args = build_game_args(
            descriptor.argument_template(),
            &ArgumentContext {
                profile: &profile,
                version_name: &descriptor.id,
                game_dir: self.game_dir,
                assets_index_name: &descriptor.asset_index.id,
            },
        );

        info!(
            "Prepared {} for {} ({} classpath entries, fabric: {})",
            descriptor.id,
            profile.username,
            classpath.len(),
            request.use_fabric
        );

        Ok(LaunchPlan {
            java,
            main_class,
            classpath,
            natives_dir: natives,
            game_dir: self.game_dir.to_path_buf(),
            ram_mb: request.ram_mb,
            game_args,
        })
    }

    /// Spawn the prepared command. On success the pipeline is `Running`.
    pub fn start(&mut self, plan: &LaunchPlan) -> LauncherResult<Child> {
        self.enter(LaunchStage::Starting)?;
        self.events.status("Launching...");
        let child = spawn(plan, self.events)?;
        self.enter(LaunchStage::Running)?;
        Ok(child)
    }
}

/// How long output readers may keep running once the game has exited.
/// A leftover child process can hold the pipes open indefinitely.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A kill request carries the channel its outcome is reported on.
pub type KillRequest = oneshot::Sender<std::io::Result<()>>;

/// Cloneable handle that asks the supervising task to kill the game.
#[derive(Debug, Clone)]
pub struct KillHandle {
    tx: mpsc::Sender<KillRequest>,
}

impl KillHandle {
    pub fn channel() -> (Self, mpsc::Receiver<KillRequest>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// `None` when the process is no longer supervised.
    pub async fn kill(&self) -> Option<std::io::Result<()>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(reply_tx).await.ok()?;
        reply_rx.await.ok()
    }
}

/// Forward output until the process exits, serving kill requests meanwhile.
/// Returns `Exited` for a zero exit code and `Crashed` otherwise.
pub async fn supervise(
    mut child: Child,
    events: SharedSink,
    mut kill_rx: mpsc::Receiver<KillRequest>,
) -> LaunchStage {
    let mut pumps = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let events = events.clone();
        pumps.push(tokio::spawn(async move { pump_output(stdout, events.as_ref()).await }));
    }
    if let Some(stderr) = child.stderr.take() {
        let events = events.clone();
        pumps.push(tokio::spawn(async move { pump_output(stderr, events.as_ref()).await }));
    }

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(reply) = kill_rx.recv() => {
                info!("Force stop requested");
                let _ = reply.send(child.start_kill());
            }
        }
    };

    let drain_deadline = tokio::time::Instant::now() + OUTPUT_DRAIN_TIMEOUT;
    for mut pump in pumps {
        if tokio::time::timeout_at(drain_deadline, &mut pump).await.is_err() {
            warn!("Game output still open after exit; detaching reader");
            pump.abort();
        }
    }

    match status {
        Ok(code) if code.success() => {
            info!("Game process exited normally");
            LaunchStage::Exited
        }
        Ok(code) => {
            warn!("Game process exited with {}", code);
            LaunchStage::Crashed
        }
        Err(e) => {
            warn!("Failed to wait on game process: {}", e);
            LaunchStage::Crashed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Client;
    use sha1::{Digest, Sha1};

    use super::*;
    use crate::core::events::testing::RecordingSink;
    use crate::core::test_support::{ok, serve};

    #[test]
    fn stages_only_move_forward() {
        use LaunchStage::*;
        assert!(ResolvingRuntime.can_transition(ResolvingPackage));
        assert!(!ResolvingRuntime.can_transition(FetchingContent));
        assert!(!PatchingNatives.can_transition(AssemblingClasspath));
        assert!(Running.can_transition(Crashed));
        assert!(Running.can_transition(Exited));
        assert!(Exited.is_terminal() && Crashed.is_terminal());
        assert!(Exited.advance(Running).is_err());
        assert_eq!(Starting.advance(Running).unwrap(), Running);
    }

    fn catalog(base: &str) -> String {
        serde_json::json!({
            "latest": {"release": "1.8.9", "snapshot": "1.8.9"},
            "versions": [{"id": "1.8.9", "type": "release", "url": format!("{base}/1.8.9.json")}]
        })
        .to_string()
    }

    fn descriptor(base: &str) -> String {
        let client_sha1 = hex::encode(Sha1::digest(b"client-jar"));
        serde_json::json!({
            "id": "1.8.9",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --accessToken ${auth_access_token}",
            "assetIndex": {"id": "1.8", "url": format!("{base}/indexes/1.8.json")},
            "downloads": {"client": {"sha1": client_sha1, "size": 10, "url": format!("{base}/client.jar")}},
            "libraries": [
                {"name": "com.google.guava:guava:17.0",
                 "downloads": {"artifact": {"path": "com/google/guava/guava/17.0/guava-17.0.jar",
                                            "url": format!("{base}/guava.jar")}}}
            ]
        })
        .to_string()
    }

    fn request(use_fabric: bool) -> LaunchRequest {
        LaunchRequest {
            username: "Steve".into(),
            ram_mb: 2048,
            use_fabric,
            version_id: "1.8.9".into(),
        }
    }

    /// Content, descriptor and catalog each live on their own server so
    /// every document can link to the one before it.
    async fn fixture_catalog() -> String {
        let content = serve(vec![
            ok("/indexes/1.8.json", r#"{"objects": {}}"#),
            ok("/guava.jar", "guava"),
            ok("/client.jar", "client-jar"),
        ])
        .await;
        let package = serve(vec![ok("/1.8.9.json", descriptor(&content))]).await;
        let front = serve(vec![ok("/catalog.json", catalog(&package))]).await;
        format!("{front}/catalog.json")
    }

    #[tokio::test]
    async fn prepares_vanilla_plan_with_statuses_in_order() {
        let catalog_url = fixture_catalog().await;
        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(Client::new());
        let sink = RecordingSink::default();

        let mut pipeline = LaunchPipeline::new(dir.path(), &dl, &sink)
            .with_java(Some(PathBuf::from("java")))
            .with_catalog_url(catalog_url);
        let plan = pipeline.prepare(&request(false)).await.unwrap();

        assert_eq!(pipeline.stage(), LaunchStage::BuildingArguments);
        assert_eq!(
            &sink.statuses()[..7],
            &[
                "Checking Java...",
                "Fetching Version Manifest...",
                "Fetching Package Info...",
                "Downloading Assets...",
                "Downloading Libraries...",
                "Downloading Client Jar...",
                "Checking for Native Patches...",
            ]
        );
        assert_eq!(plan.main_class, "net.minecraft.client.main.Main");
        assert_eq!(
            plan.classpath.first().unwrap(),
            &libraries_dir(dir.path()).join("com/google/guava/guava/17.0/guava-17.0.jar")
        );
        if current_patch().is_none() {
            assert_eq!(
                plan.classpath.last().unwrap(),
                &dir.path().join("versions/1.8.9/1.8.9.jar")
            );
        }
        assert_eq!(
            &plan.game_args[..6],
            &["--username", "Steve", "--version", "1.8.9", "--accessToken", "null"]
        );
        assert!(dir.path().join("assets/indexes/1.8.json").exists());
    }

    #[tokio::test]
    async fn unknown_version_stops_before_downloads() {
        let catalog_url = fixture_catalog().await;
        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(Client::new());
        let sink = RecordingSink::default();

        let mut pipeline = LaunchPipeline::new(dir.path(), &dl, &sink)
            .with_java(Some(PathBuf::from("java")))
            .with_catalog_url(catalog_url);
        let mut req = request(false);
        req.version_id = "1.7.10".into();

        let err = pipeline.prepare(&req).await.unwrap_err();
        assert!(matches!(err, LauncherError::VersionNotFound(ref v) if v == "1.7.10"));
        assert_eq!(pipeline.stage(), LaunchStage::ResolvingPackage);
        assert!(!sink.statuses().iter().any(|s| s == "Downloading Assets..."));
    }

    #[tokio::test]
    async fn fabric_libraries_lead_the_classpath() {
        let loader_meta = r#"[{
            "loader": {"version": "0.15.0", "maven": "net.fabricmc:fabric-loader:0.15.0"},
            "intermediary": {"version": "1.8.9", "maven": "net.legacyfabric:intermediary:1.8.9"},
            "launcherMeta": {"libraries": {"common": [], "client": []},
                             "mainClass": {"client": "net.fabricmc.loader.launch.knot.KnotClient"}}
        }]"#;
        let maven = serve(vec![
            ok("/net/fabricmc/fabric-loader/0.15.0/fabric-loader-0.15.0.jar", "loader"),
            ok("/net/legacyfabric/intermediary/1.8.9/intermediary-1.8.9.jar", "inter"),
            ok("/loader.json", loader_meta),
        ])
        .await;
        let catalog_url = fixture_catalog().await;
        let dir = tempfile::tempdir().unwrap();
        let dl = Downloader::new(Client::new());
        let sink = RecordingSink::default();

        let mut pipeline = LaunchPipeline::new(dir.path(), &dl, &sink)
            .with_java(Some(PathBuf::from("java")))
            .with_catalog_url(catalog_url)
            .with_loader_meta_url(format!("{maven}/loader.json"))
            .with_loader_repos(&format!("{maven}/"), &format!("{maven}/"));
        let plan = pipeline.prepare(&request(true)).await.unwrap();

        assert_eq!(plan.main_class, "net.fabricmc.loader.launch.knot.KnotClient");
        let names: Vec<_> = plan
            .classpath
            .iter()
            .take(3)
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["intermediary-1.8.9.jar", "fabric-loader-0.15.0.jar", "guava-17.0.jar"]
        );
        assert!(sink.statuses().iter().any(|s| s == "Installing Fabric Loader..."));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn supervise_reports_exit_codes() {
        let sink = Arc::new(RecordingSink::default());

        let ok_child = tokio::process::Command::new("sh")
            .args(["-c", "echo hello"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let (_handle, rx) = KillHandle::channel();
        assert_eq!(supervise(ok_child, sink.clone(), rx).await, LaunchStage::Exited);
        assert_eq!(sink.logs().concat(), "hello\n");

        let bad_child = tokio::process::Command::new("sh")
            .args(["-c", "exit 3"])
            .spawn()
            .unwrap();
        let (_handle, rx) = KillHandle::channel();
        assert_eq!(supervise(bad_child, sink.clone(), rx).await, LaunchStage::Crashed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kill_request_ends_as_crash() {
        let sink: SharedSink = Arc::new(RecordingSink::default());
        let child = tokio::process::Command::new("sleep").arg("30").spawn().unwrap();
        let (handle, rx) = KillHandle::channel();

        let supervisor = tokio::spawn(supervise(child, sink, rx));
        assert!(handle.kill().await.unwrap().is_ok());
        assert_eq!(supervisor.await.unwrap(), LaunchStage::Crashed);
        assert!(handle.kill().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lingering_grandchild_does_not_block_supervision() {
        let sink = Arc::new(RecordingSink::default());
        // The background sleep inherits stdout and keeps the pipe open.
        let child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 5 & echo started"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let (_handle, rx) = KillHandle::channel();

        let outcome = tokio::time::timeout(
            Duration::from_secs(4),
            supervise(child, sink.clone(), rx),
        )
        .await
        .expect("supervise waited on the leftover pipe");

        assert_eq!(outcome, LaunchStage::Exited);
        assert_eq!(sink.logs().concat(), "started\n");
    }
}
