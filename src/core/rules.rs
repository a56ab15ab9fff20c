// ─── Rule Evaluator ───
// Decides whether a manifest-declared library or argument applies to the
// running platform. Pure, no I/O.
//
// Policy:
// - Rules are scanned in order. A rule fires only when it carries an OS
//   constraint that matches; the first such rule decides via its action.
// - OS rules for another platform are skipped, never short-circuit.
// - When nothing fires the list is allowed iff it is empty or holds an
//   unconditioned `allow`.
// - Feature-gated rules (`features: {...}`) never fire and never count as
//   unconditioned: the engine enables no optional features.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Rule {
    fn is_unconditioned(&self) -> bool {
        self.os.is_none() && self.features.is_none()
    }
}

/// The platform as manifests spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: current_os_name(),
            arch: current_arch(),
        }
    }

    fn matches(&self, constraint: &OsConstraint) -> bool {
        let name_ok = match constraint.name.as_deref() {
            Some(name) => os_name_matches(self.os, name),
            None => true,
        };
        let arch_ok = match constraint.arch.as_deref() {
            Some(arch) => arch_matches(self.arch, arch),
            None => true,
        };
        name_ok && arch_ok
    }
}

pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

pub fn current_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else {
        std::env::consts::ARCH
    }
}

fn os_name_matches(platform: &str, declared: &str) -> bool {
    match declared {
        "osx" | "macos" => platform == "osx",
        other => platform == other,
    }
}

fn arch_matches(platform: &str, declared: &str) -> bool {
    match declared {
        "x86" => platform == "x86",
        "x86_64" | "amd64" => platform == "x86_64",
        "arm64" | "aarch64" => platform == "arm64",
        other => platform == other,
    }
}

/// Evaluate `rules` for the running platform.
pub fn is_allowed(rules: Option<&[Rule]>) -> bool {
    evaluate(rules, &Platform::current())
}

pub fn evaluate(rules: Option<&[Rule]>, platform: &Platform) -> bool {
    let rules = match rules {
        Some(r) if !r.is_empty() => r,
        _ => return true,
    };

    for rule in rules {
        if rule.features.is_some() {
            continue;
        }
        if let Some(os) = &rule.os {
            if platform.matches(os) {
                return rule.action == RuleAction::Allow;
            }
        }
    }

    rules
        .iter()
        .any(|r| r.is_unconditioned() && r.action == RuleAction::Allow)
}
