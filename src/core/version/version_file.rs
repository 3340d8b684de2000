// ─── Package Descriptor ───
// Parses a per-version package JSON and evaluates OS rules for libraries.

use std::collections::HashMap;

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

/// A fully parsed package descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    pub id: String,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LibrarySpec>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    pub asset_index: AssetIndexInfo,
    #[serde(default)]
    pub assets: Option<String>,
    /// Legacy space-separated argument template.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

// ─── Library Spec with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Platform key ("windows", "osx", "linux") to classifier name.
    #[serde(default)]
    pub natives: HashMap<String, String>,
    #[serde(default)]
    pub rules: Vec<LibraryRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: HashMap<String, LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

// ─── OS Rule Evaluation ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

impl LibrarySpec {
    pub fn is_allowed_for_current_os(&self) -> bool {
        self.is_allowed_for(current_os_name())
    }

    /// Rules are evaluated top-to-bottom and the last matching rule wins.
    /// No rules means allowed; rules with no match mean disallowed.
    pub fn is_allowed_for(&self, os_name: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }

        let mut allowed = false;
        for rule in &self.rules {
            let os_matches = match rule.os.as_ref().and_then(|os| os.name.as_deref()) {
                None | Some("") => true,
                Some(name) => name == os_name,
            };
            if os_matches {
                allowed = rule.action == RuleAction::Allow;
            }
        }
        allowed
    }

    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let bits = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        self.native_classifier_for(current_os_name(), bits)
    }

    /// Classifier name for `os_name` with `${arch}` replaced by `arch_bits`.
    pub fn native_classifier_for(&self, os_name: &str, arch_bits: &str) -> Option<String> {
        self.natives
            .get(os_name)
            .map(|c| c.replace("${arch}", arch_bits))
    }

    pub fn main_artifact(&self) -> Option<&LibDownloadArtifact> {
        self.downloads.as_ref()?.artifact.as_ref()
    }

    pub fn classifier_artifact(&self, classifier: &str) -> Option<&LibDownloadArtifact> {
        self.downloads.as_ref()?.classifiers.get(classifier)
    }
}

/// Platform key used by library rules and natives maps.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl PackageDescriptor {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let raw = response.text().await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn client_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref()?.client.as_ref()
    }

    pub fn argument_template(&self) -> &str {
        self.minecraft_arguments.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib_with_rules(rules: Vec<LibraryRule>) -> LibrarySpec {
        LibrarySpec {
            name: "test:lib:1.0".into(),
            downloads: None,
            natives: HashMap::new(),
            rules,
        }
    }

    fn rule(action: RuleAction, os: Option<&str>) -> LibraryRule {
        LibraryRule {
            action,
            os: os.map(|n| OsRule {
                name: Some(n.into()),
            }),
        }
    }

    #[test]
    fn no_rules_means_allowed() {
        assert!(lib_with_rules(vec![]).is_allowed_for("linux"));
    }

    #[test]
    fn allow_all_then_disallow_osx() {
        let lib = lib_with_rules(vec![
            rule(RuleAction::Allow, None),
            rule(RuleAction::Disallow, Some("osx")),
        ]);
        assert!(lib.is_allowed_for("linux"));
        assert!(lib.is_allowed_for("windows"));
        assert!(!lib.is_allowed_for("osx"));
    }

    #[test]
    fn empty_os_name_matches_every_platform() {
        let json = r#"{
            "name": "org.lwjgl.lwjgl:lwjgl:2.9.4",
            "rules": [
                {"action": "allow", "os": {"name": ""}},
                {"action": "disallow", "os": {"name": "osx"}}
            ]
        }"#;
        let lib: LibrarySpec = serde_json::from_str(json).unwrap();
        assert!(lib.is_allowed_for("linux"));
        assert!(lib.is_allowed_for("windows"));
        assert!(!lib.is_allowed_for("osx"));
    }

    #[test]
    fn unmatched_rules_mean_disallowed() {
        let lib = lib_with_rules(vec![rule(RuleAction::Allow, Some("osx"))]);
        assert!(lib.is_allowed_for("osx"));
        assert!(!lib.is_allowed_for("linux"));
    }

    #[test]
    fn native_classifier_substitutes_arch() {
        let json = r#"{
            "name": "tv.twitch:twitch-platform:6.5",
            "natives": {"windows": "natives-windows-${arch}", "osx": "natives-osx"},
            "downloads": {
                "classifiers": {
                    "natives-windows-64": {"path": "tv/x-64.jar", "sha1": "aa", "size": 1, "url": "https://x/64"}
                }
            }
        }"#;
        let lib: LibrarySpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            lib.native_classifier_for("windows", "64").as_deref(),
            Some("natives-windows-64")
        );
        assert_eq!(lib.native_classifier_for("linux", "64"), None);
        assert!(lib.classifier_artifact("natives-windows-64").is_some());
        assert!(lib.main_artifact().is_none());
    }

    #[test]
    fn parses_legacy_descriptor() {
        let json = r#"{
            "id": "1.8.9",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name}",
            "assets": "1.8",
            "assetIndex": {"id": "1.8", "url": "https://x/1.8.json", "sha1": "ab", "size": 1, "totalSize": 2},
            "downloads": {"client": {"sha1": "cc", "size": 3, "url": "https://x/client.jar"}},
            "libraries": [
                {"name": "a:b:1", "downloads": {"artifact": {"path": "a/b/1/b-1.jar", "sha1": "dd", "size": 4, "url": "https://x/b.jar"}}}
            ]
        }"#;
        let desc: PackageDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc.asset_index.id, "1.8");
        assert_eq!(desc.client_download().unwrap().url, "https://x/client.jar");
        assert_eq!(desc.libraries[0].main_artifact().unwrap().path, "a/b/1/b-1.jar");
        assert!(desc.argument_template().starts_with("--username"));
    }
}
