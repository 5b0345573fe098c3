//! Command registry: the command tree plus its flattened name index.
//!
//! The registry is assembled once through [`RegistryBuilder`]. Groups are
//! declared first and commands attached afterwards; the build validates the
//! whole declaration in one pass and reports every problem at once instead of
//! stopping at the first dangling registration.
//!
//! Flattened names join every path segment, the root group included, with
//! [`SEPARATOR`]: the `list` command under `storage account` in a root named
//! `azops` is addressed as `azops-storage-account-list`.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::{debug, info};

use crate::{Command, CommandGroup, GroupError};

/// Separator used between path segments in flattened names.
pub const SEPARATOR: &str = "-";

/// A single problem found while building the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BuildIssue {
    #[error("group `{path}` is declared under missing group `{missing}`")]
    DanglingGroup { path: String, missing: String },

    #[error("command `{path}` is registered under missing group `{missing}`")]
    DanglingCommand { path: String, missing: String },

    #[error("command `{path}` is registered more than once")]
    DuplicateCommand { path: String },

    #[error("`{path}` is registered as both a group and a command")]
    NameConflict { path: String },

    #[error("`{first}` and `{second}` both flatten to `{name}`")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("empty path")]
    EmptyPath,
}

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("registry build failed: {}", list_issues(.0))]
    Build(Vec<BuildIssue>),

    #[error("command not found: {0}")]
    NotFound(String),
}

fn list_issues(issues: &[BuildIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects group and command declarations for a [`CommandRegistry`].
pub struct RegistryBuilder {
    root: CommandGroup,
    groups: Vec<(String, String)>,
    commands: Vec<(String, Arc<dyn Command>)>,
}

impl RegistryBuilder {
    pub fn new(root_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            root: CommandGroup::new(root_name, description),
            groups: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Declares a group at a space separated `path` below the root.
    #[must_use]
    pub fn group(mut self, path: impl Into<String>, description: impl Into<String>) -> Self {
        self.groups.push((path.into(), description.into()));
        self
    }

    /// Registers `command` at `path`; the last segment is the command's name
    /// in its group.
    #[must_use]
    pub fn command(mut self, path: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.commands.push((path.into(), command));
        self
    }

    /// Builds the tree and the flattened index.
    ///
    /// Groups are attached shallowest first, so declaration order between
    /// siblings and parents does not matter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Build`] listing every dangling group or
    /// command, every repeated command path, every path used by both a group
    /// and a command, and every flattened-name collision.
    pub fn build(self) -> Result<CommandRegistry, RegistryError> {
        let Self {
            mut root,
            mut groups,
            commands,
        } = self;
        let mut issues = Vec::new();

        groups.sort_by_key(|(path, _)| path.split_whitespace().count());
        for (path, description) in groups {
            let segments: Vec<&str> = path.split_whitespace().collect();
            let Some((name, parents)) = segments.split_last() else {
                issues.push(BuildIssue::EmptyPath);
                continue;
            };
            let parent_path = parents.join(" ");
            match root.subgroup_mut(&parent_path) {
                Some(parent) => {
                    if parent
                        .add_subgroup(CommandGroup::new(*name, description))
                        .is_err()
                    {
                        issues.push(BuildIssue::NameConflict {
                            path: segments.join(" "),
                        });
                    }
                }
                None => issues.push(BuildIssue::DanglingGroup {
                    path: segments.join(" "),
                    missing: missing_prefix(&root, parents),
                }),
            }
        }

        for (path, command) in commands {
            let segments: Vec<&str> = path.split_whitespace().collect();
            let normalized = segments.join(" ");
            match root.add_command(&normalized, command) {
                Ok(()) => {}
                Err(GroupError::SubgroupNotFound { .. }) => {
                    let parents = &segments[..segments.len().saturating_sub(1)];
                    issues.push(BuildIssue::DanglingCommand {
                        missing: missing_prefix(&root, parents),
                        path: normalized,
                    });
                }
                Err(GroupError::DuplicateCommand { .. }) => {
                    issues.push(BuildIssue::DuplicateCommand { path: normalized });
                }
                Err(GroupError::NameConflict { .. }) => {
                    issues.push(BuildIssue::NameConflict { path: normalized });
                }
                Err(_) => issues.push(BuildIssue::EmptyPath),
            }
        }

        let mut commands = BTreeMap::new();
        let mut origins = BTreeMap::new();
        flatten(&root, "", "", &mut commands, &mut origins, &mut issues);

        if !issues.is_empty() {
            return Err(RegistryError::Build(issues));
        }

        info!(root = root.name(), commands = commands.len(), "Built command registry");
        Ok(CommandRegistry { root, commands })
    }
}

/// First prefix of `segments` that does not resolve to a group.
fn missing_prefix(root: &CommandGroup, segments: &[&str]) -> String {
    (1..=segments.len())
        .map(|len| segments[..len].join(" "))
        .find(|prefix| root.subgroup(prefix).is_none())
        .unwrap_or_else(|| segments.join(" "))
}

/// Depth-first walk emitting `prefix-command` for every command.
fn flatten(
    group: &CommandGroup,
    prefix: &str,
    path: &str,
    commands: &mut BTreeMap<String, Arc<dyn Command>>,
    origins: &mut BTreeMap<String, String>,
    issues: &mut Vec<BuildIssue>,
) {
    let prefix = join(prefix, group.name(), SEPARATOR);
    let path = join(path, group.name(), " ");

    for (name, command) in group.commands() {
        let flattened = join(&prefix, name, SEPARATOR);
        let command_path = join(&path, name, " ");
        if let Some(first) = origins.get(&flattened) {
            issues.push(BuildIssue::NameCollision {
                name: flattened,
                first: first.clone(),
                second: command_path,
            });
            continue;
        }
        debug!(name = %flattened, "Registered command");
        origins.insert(flattened.clone(), command_path);
        commands.insert(flattened, command.clone());
    }

    for subgroup in group.subgroups() {
        flatten(subgroup, &prefix, &path, commands, origins, issues);
    }
}

fn join(prefix: &str, name: &str, separator: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{separator}{name}")
    }
}

/// The command tree and its flattened `name -> command` index.
///
/// Immutable once built; share it behind an `Arc`.
pub struct CommandRegistry {
    root: CommandGroup,
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn find(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown flattened name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Command>, RegistryError> {
        self.find(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn commands(&self) -> &BTreeMap<String, Arc<dyn Command>> {
        &self.commands
    }

    pub fn root(&self) -> &CommandGroup {
        &self.root
    }

    /// Flattened name for a root-relative sequence of path segments.
    pub fn flattened_name<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> String {
        segments
            .into_iter()
            .fold(self.root.name().to_string(), |name, segment| {
                join(&name, segment, SEPARATOR)
            })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("root", &self.root.name())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::tests::stub;

    fn sample() -> RegistryBuilder {
        RegistryBuilder::new("azops", "Cloud operations")
            .group("storage", "Storage")
            .group("storage account", "Storage accounts")
            .group("storage blob", "Blob storage")
            .group("storage blob container", "Blob containers")
            .group("subscription", "Subscriptions")
            .command("subscription list", stub("list"))
            .command("storage account list", stub("list"))
            .command("storage blob container list", stub("list"))
    }

    #[test]
    fn test_flattened_names_include_root() {
        let registry = sample().build().unwrap();
        let names: Vec<&str> = registry.commands().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "azops-storage-account-list",
                "azops-storage-blob-container-list",
                "azops-subscription-list",
            ]
        );
        assert!(registry.find("azops-storage-account-list").is_some());
        assert_eq!(
            registry.flattened_name(["storage", "blob", "container", "list"]),
            "azops-storage-blob-container-list"
        );
    }

    #[test]
    fn test_tree_lookup_matches_flattened_lookup() {
        let registry = sample().build().unwrap();
        let by_path = registry.root().get_command("storage account list").unwrap();
        let by_name = registry.get("azops-storage-account-list").unwrap();
        assert!(Arc::ptr_eq(&by_path, &by_name));
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry = sample().build().unwrap();
        assert_eq!(
            registry.get("azops-storage-queue-list").err(),
            Some(RegistryError::NotFound("azops-storage-queue-list".to_string()))
        );
    }

    #[test]
    fn test_group_declaration_order_does_not_matter() {
        let registry = RegistryBuilder::new("azops", "root")
            .group("storage blob", "Blob storage")
            .group("storage", "Storage")
            .command("storage blob list", stub("list"))
            .build()
            .unwrap();
        assert!(registry.find("azops-storage-blob-list").is_some());
    }

    #[test]
    fn test_build_lists_every_dangling_registration() {
        let err = RegistryBuilder::new("azops", "root")
            .group("storage", "Storage")
            .group("monitor workspace", "Workspaces")
            .command("storage account list", stub("list"))
            .command("appconfig account list", stub("list"))
            .command("storage list", stub("list"))
            .build()
            .unwrap_err();

        let RegistryError::Build(issues) = err else {
            panic!("expected build error");
        };
        assert_eq!(
            issues,
            vec![
                BuildIssue::DanglingGroup {
                    path: "monitor workspace".to_string(),
                    missing: "monitor".to_string(),
                },
                BuildIssue::DanglingCommand {
                    path: "storage account list".to_string(),
                    missing: "storage account".to_string(),
                },
                BuildIssue::DanglingCommand {
                    path: "appconfig account list".to_string(),
                    missing: "appconfig".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_command_path_fails_build() {
        let err = RegistryBuilder::new("azops", "root")
            .group("group", "Groups")
            .command("group list", stub("list"))
            .command("group list", stub("list"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Build(vec![BuildIssue::DuplicateCommand {
                path: "group list".to_string()
            }])
        );
    }

    #[test]
    fn test_command_shadowing_group_fails_build() {
        let err = RegistryBuilder::new("azops", "root")
            .group("storage", "Storage")
            .group("storage account", "Accounts")
            .command("storage account", stub("account"))
            .command("storage account list", stub("list"))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::Build(vec![BuildIssue::NameConflict {
                path: "storage account".to_string()
            }])
        );
    }

    #[test]
    fn test_adversarial_tree_flattens_without_collisions() {
        // Distinct paths whose segments share prefixes and names at every depth.
        let registry = RegistryBuilder::new("r", "root")
            .group("a", "")
            .group("a b", "")
            .group("a b a", "")
            .group("b", "")
            .group("b a", "")
            .group("ab", "")
            .command("a x", stub("x"))
            .command("a b x", stub("x"))
            .command("a b a x", stub("x"))
            .command("a b a b", stub("b"))
            .command("b x", stub("x"))
            .command("b a x", stub("x"))
            .command("ab x", stub("x"))
            .command("x", stub("x"))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 8);
        for name in [
            "r-x", "r-a-x", "r-a-b-x", "r-a-b-a-x", "r-a-b-a-b", "r-b-x", "r-b-a-x", "r-ab-x",
        ] {
            assert!(registry.find(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_separator_collision_fails_build() {
        let err = RegistryBuilder::new("azops", "root")
            .group("storage", "Storage")
            .group("storage account", "Accounts")
            .group("storage-account", "Ambiguous")
            .command("storage account list", stub("list"))
            .command("storage-account list", stub("list"))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            RegistryError::Build(vec![BuildIssue::NameCollision {
                name: "azops-storage-account-list".to_string(),
                first: "azops storage account list".to_string(),
                second: "azops storage-account list".to_string(),
            }])
        );
    }
}
