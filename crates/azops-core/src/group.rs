use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::debug;

use crate::Command;

/// Errors raised while attaching commands to a [`CommandGroup`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GroupError {
    #[error("subgroup `{subgroup}` not found in group `{group}`")]
    SubgroupNotFound { group: String, subgroup: String },

    #[error("command `{command}` already registered in group `{group}`")]
    DuplicateCommand { group: String, command: String },

    #[error("command `{command}` not found in group `{group}`")]
    CommandNotFound { group: String, command: String },

    #[error("`{name}` is both a command and a subgroup of group `{group}`")]
    NameConflict { group: String, name: String },

    #[error("command path is empty")]
    EmptyPath,
}

/// Internal node of the command tree.
///
/// Paths are space separated: `"storage account list"` walks the `storage`
/// and `account` subgroups and ends at the `list` command. Groups must exist
/// before commands are attached below them.
pub struct CommandGroup {
    name: String,
    description: String,
    subgroups: Vec<CommandGroup>,
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            subgroups: Vec::new(),
            commands: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn subgroups(&self) -> &[CommandGroup] {
        &self.subgroups
    }

    /// Commands attached directly to this group, keyed by their path segment.
    pub fn commands(&self) -> &BTreeMap<String, Arc<dyn Command>> {
        &self.commands
    }

    /// Appends `group` unless a subgroup with the same name already exists,
    /// in which case the existing one is kept.
    ///
    /// # Errors
    ///
    /// Fails when a command of this group already uses the name.
    pub fn add_subgroup(&mut self, group: CommandGroup) -> Result<(), GroupError> {
        if self.commands.contains_key(&group.name) {
            return Err(GroupError::NameConflict {
                group: self.name.clone(),
                name: group.name,
            });
        }
        if self.subgroups.iter().any(|existing| existing.name == group.name) {
            debug!(group = %self.name, subgroup = %group.name, "Subgroup already registered");
            return Ok(());
        }
        self.subgroups.push(group);
        Ok(())
    }

    /// Attaches `command` at `path`, relative to this group.
    ///
    /// # Errors
    ///
    /// Fails when an intermediate subgroup is missing or when the last
    /// segment is already taken by a command or a subgroup. Missing groups
    /// are never created.
    pub fn add_command(&mut self, path: &str, command: Arc<dyn Command>) -> Result<(), GroupError> {
        let path = path.trim();
        match path.split_once(' ') {
            Some((head, rest)) => {
                let group = self.name.clone();
                self.subgroup_named_mut(head)
                    .ok_or_else(|| GroupError::SubgroupNotFound {
                        group,
                        subgroup: head.to_string(),
                    })?
                    .add_command(rest, command)
            }
            None if path.is_empty() => Err(GroupError::EmptyPath),
            None if self.commands.contains_key(path) => Err(GroupError::DuplicateCommand {
                group: self.name.clone(),
                command: path.to_string(),
            }),
            None if self.subgroups.iter().any(|group| group.name == path) => {
                Err(GroupError::NameConflict {
                    group: self.name.clone(),
                    name: path.to_string(),
                })
            }
            None => {
                self.commands.insert(path.to_string(), command);
                Ok(())
            }
        }
    }

    /// Looks up the command at `path`, walking subgroups like
    /// [`CommandGroup::add_command`].
    ///
    /// # Errors
    ///
    /// Fails when any segment of the path is missing.
    pub fn get_command(&self, path: &str) -> Result<Arc<dyn Command>, GroupError> {
        let path = path.trim();
        match path.split_once(' ') {
            Some((head, rest)) => self
                .subgroups
                .iter()
                .find(|group| group.name == head)
                .ok_or_else(|| GroupError::SubgroupNotFound {
                    group: self.name.clone(),
                    subgroup: head.to_string(),
                })?
                .get_command(rest),
            None if path.is_empty() => Err(GroupError::EmptyPath),
            None => self
                .commands
                .get(path)
                .cloned()
                .ok_or_else(|| GroupError::CommandNotFound {
                    group: self.name.clone(),
                    command: path.to_string(),
                }),
        }
    }

    /// Resolves a space separated subgroup path; an empty path is `self`.
    pub fn subgroup(&self, path: &str) -> Option<&CommandGroup> {
        path.split_whitespace().try_fold(self, |group, segment| {
            group.subgroups.iter().find(|child| child.name == segment)
        })
    }

    pub(crate) fn subgroup_mut(&mut self, path: &str) -> Option<&mut CommandGroup> {
        path.split_whitespace()
            .try_fold(self, |group, segment| group.subgroup_named_mut(segment))
    }

    fn subgroup_named_mut(&mut self, name: &str) -> Option<&mut CommandGroup> {
        self.subgroups.iter_mut().find(|group| group.name == name)
    }
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("name", &self.name)
            .field("subgroups", &self.subgroups)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
